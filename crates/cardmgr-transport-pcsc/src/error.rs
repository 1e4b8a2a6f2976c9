//! PC/SC-specific error type, convertible into [`cardmgr_apdu_core::Error`].

use cardmgr_apdu_core::Error as CoreError;

/// Result alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced by the PC/SC transport.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying `pcsc` call failed.
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// No readers are attached to the host.
    #[error("no card readers available")]
    NoReadersAvailable,

    /// The named reader does not exist.
    #[error("reader not found: {0}")]
    ReaderNotFound(String),

    /// No card answered within the requested timeout.
    #[error("timed out waiting for a card in {reader} after {timeout_ms}ms")]
    Timeout {
        /// Reader that was polled.
        reader: String,
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// The reader reported no card present.
    #[error("no card in reader: {0}")]
    NoCard(String),
}

impl From<Error> for CoreError {
    fn from(error: Error) -> Self {
        match error {
            Error::Timeout { .. } => CoreError::Transport(error.to_string()),
            other => CoreError::Transport(other.to_string()),
        }
    }
}
