//! Error type for the OTA envelope builder.

/// Result alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised while rendering a command template or assembling a
/// secured OTA envelope.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `{placeholder}` in a template was not one of the recognized
    /// identifiers, or no value was supplied for it.
    #[error("unresolvable template placeholder: {0}")]
    UnknownPlaceholder(String),

    /// A `{` in a template had no matching `}`.
    #[error("unterminated template placeholder")]
    UnterminatedPlaceholder,

    /// The rendered template was not valid hex.
    #[error("invalid hex in rendered template: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// A target AID was outside the 5-16 byte range GlobalPlatform allows.
    #[error("invalid AID length: {0} bytes (expected 5-16)")]
    InvalidAidLength(usize),

    /// A cryptographic primitive failed (bad key length, non-block-aligned
    /// input).
    #[error(transparent)]
    Crypto(#[from] cardmgr_crypto::Error),

    /// The persistent store failed to read a template/keyset or to record
    /// the generated message.
    #[error(transparent)]
    Store(#[from] cardmgr_store::Error),
}
