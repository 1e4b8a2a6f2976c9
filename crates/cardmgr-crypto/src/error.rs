//! Crypto-layer error type.

/// Result alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// Errors from key derivation, cryptogram verification and MAC/encryption.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A key of the wrong length was supplied.
    #[error("invalid key length: {0} bytes (expected 16, or 16/24 for SCP02 static keys)")]
    InvalidKeyLength(usize),

    /// Input to a block cipher was not block-aligned.
    #[error("data length {0} is not a multiple of the block size")]
    NotBlockAligned(usize),

    /// ISO 7816-4 padding was malformed or absent.
    #[error("invalid ISO 7816-4 padding")]
    InvalidPadding,

    /// Card cryptogram did not match the host-computed value.
    #[error("cryptogram verification failed")]
    CryptogramMismatch,
}
