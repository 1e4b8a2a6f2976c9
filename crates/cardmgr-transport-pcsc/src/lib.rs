//! PC/SC reader facade satisfying spec.md §6's `CardChannel` capability:
//! `list_readers`, `connect(reader, timeout_ms)`, `transmit`, `atr`,
//! `disconnect`. Grounded on `crates/pcsc/src/{manager.rs,transport.rs}`.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod transport;

pub use error::{Error, Result};
pub use transport::{PcscCardManager, PcscTransport};
