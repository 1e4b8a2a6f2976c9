//! The session façade (spec.md §4.8): a single object a caller holds that
//! coordinates the card channel, GlobalPlatform commands, the secure
//! channel engine, the persistent store and the OTA builder into the
//! high-level operations spec.md §6's command surface is built on.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
mod facade;

pub use config::Config;
pub use error::{Error, Result};
pub use facade::{CardInfo, Session};
