//! Secure channel error type.

use cardmgr_apdu_core::{Error as CoreError, StatusWord};

/// Result alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// Errors from the handshake, per-APDU wrap/unwrap, and channel lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying transport or processor pipeline failed.
    #[error(transparent)]
    Apdu(#[from] CoreError),

    /// A cryptographic primitive (key derivation, MAC, cipher) failed.
    #[error(transparent)]
    Crypto(#[from] cardmgr_crypto::Error),

    /// `INITIALIZE UPDATE` or `EXTERNAL AUTHENTICATE` returned an unexpected
    /// status word.
    #[error("handshake failed with status {0}")]
    HandshakeFailed(StatusWord),

    /// `INITIALIZE UPDATE`'s response was too short or malformed.
    #[error("malformed INITIALIZE UPDATE response ({0} bytes)")]
    MalformedChallengeResponse(usize),

    /// The card's authentication cryptogram did not verify.
    #[error("card cryptogram verification failed")]
    CryptogramMismatch,

    /// A response R-MAC did not verify.
    #[error("response R-MAC verification failed")]
    ResponseMacMismatch,

    /// An operation was attempted while the channel was not established.
    #[error("secure channel not established")]
    NotEstablished,

    /// The KVN in a response did not indicate a supported SCP version.
    #[error("unsupported secure channel protocol id {0:#04x}")]
    UnsupportedProtocol(u8),
}
