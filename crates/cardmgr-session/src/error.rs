//! Aggregate error type for the session façade: every layer below bottoms
//! out here (spec.md §7's taxonomy, realized as `From` conversions).

/// Result alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// Errors the session façade can raise, aggregating every layer beneath it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport, secure channel or pipeline layer failed.
    #[error(transparent)]
    Apdu(#[from] cardmgr_apdu_core::Error),

    /// A GlobalPlatform command layer call failed.
    #[error(transparent)]
    GlobalPlatform(#[from] cardmgr_globalplatform::Error),

    /// The secure channel handshake or per-APDU wrap/unwrap failed.
    #[error(transparent)]
    SecureChannel(#[from] cardmgr_secure_channel::Error),

    /// A cryptographic primitive failed (e.g. building static keys from a
    /// stored keyset of the wrong length).
    #[error(transparent)]
    Crypto(#[from] cardmgr_crypto::Error),

    /// The persistent store failed or rejected an operation.
    #[error(transparent)]
    Store(#[from] cardmgr_store::Error),

    /// OTA envelope construction failed.
    #[error(transparent)]
    Ota(#[from] cardmgr_ota::Error),

    /// The PC/SC reader layer failed.
    #[error(transparent)]
    Pcsc(#[from] cardmgr_transport_pcsc::Error),

    /// Reading the configuration file failed.
    #[error("reading configuration file: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// The configuration file was not valid TOML.
    #[error("parsing configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// An operation requiring a connected card was issued before `connect`.
    #[error("not connected to a card")]
    NotConnected,

    /// An operation requiring an established secure channel was issued
    /// before `establish_secure_channel`.
    #[error("no secure channel established")]
    NotAuthenticated,

    /// A hex string in a command argument or config value did not decode.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// An environment-variable-sourced configuration value was not the
    /// expected type.
    #[error("invalid configuration value for {field}: {value}")]
    InvalidConfigValue {
        /// Name of the offending field.
        field: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },
}
