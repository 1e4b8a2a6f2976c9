//! Core traits and types for APDU (Application Protocol Data Unit) operations.
//!
//! Provides the ISO/IEC 7816-4 command/response types, the [`CardTransport`]
//! abstraction for talking to a reader, and the [`processor::CommandProcessor`]
//! pipeline that secure channels and response-chaining hook into.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod card;
pub mod command;
pub mod error;
pub mod processor;
pub mod response;
pub mod transport;

pub use bytes::{Bytes, BytesMut};
pub use card::{CardExecutor, Executor};
pub use command::{ApduCommand, Command, ExpectedLength};
pub use error::{Error, Result};
pub use processor::CommandProcessor;
pub use response::{ApduResponse, Response, StatusWord};
pub use transport::CardTransport;

/// Commonly used traits and types.
pub mod prelude {
    pub use crate::{
        ApduCommand, ApduResponse, Bytes, CardExecutor, CardTransport, Command, CommandProcessor,
        Error, Executor, Response, Result, StatusWord,
    };
}
