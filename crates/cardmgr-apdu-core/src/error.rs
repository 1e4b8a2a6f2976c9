//! Aggregate error type shared by command, transport and processor layers.

use crate::response::StatusWord;

/// Result alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// Core error type for all APDU operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Failed to connect to, or communicate with, the transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// The card returned a non-success status word.
    #[error("card status error: {0}")]
    Status(StatusWord),

    /// Malformed command or response bytes.
    #[error("parse error: {0}")]
    Parse(&'static str),

    /// A command processor (secure channel, response chaining, ...) failed.
    #[error("processor error: {0}")]
    Processor(String),

    /// No secure channel is open but one is required for this command.
    #[error("secure channel not established")]
    NoSecureChannel,

    /// Response chaining exceeded its configured limit.
    #[error("response chain limit exceeded")]
    ChainLimitExceeded,

    /// Anything else, with a free-form message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a [`Error::Status`] from raw status bytes.
    pub const fn status(sw1: u8, sw2: u8) -> Self {
        Self::Status(StatusWord::new(sw1, sw2))
    }
}
