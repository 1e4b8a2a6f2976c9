//! Error type for the GlobalPlatform command layer.

use cardmgr_apdu_core::{Error as CoreError, StatusWord};

/// Result alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised while building, sending or parsing GlobalPlatform commands.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The transport, secure channel or pipeline layer failed.
    #[error(transparent)]
    Apdu(#[from] CoreError),

    /// The card returned a status word the caller did not ask for.
    #[error("unexpected status word: {0}")]
    UnexpectedStatus(StatusWord),

    /// A response entry was shorter than its own length prefixes claimed.
    #[error("truncated GET STATUS entry")]
    TruncatedEntry,

    /// An AID was outside the 5-16 byte range GlobalPlatform allows.
    #[error("invalid AID length: {0}")]
    InvalidAidLength(usize),
}
