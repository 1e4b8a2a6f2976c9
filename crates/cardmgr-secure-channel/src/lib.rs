//! SCP02/SCP03 secure channel engine: handshake, per-APDU command
//! wrapping/response unwrapping, and channel lifecycle, layered on top of
//! [`cardmgr_apdu_core::processor`] and keyed by [`cardmgr_crypto`]'s
//! primitives.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod channel;
mod constants;
pub mod error;
mod handshake;
mod level;
mod provider;
mod scp02_channel;
mod scp03_channel;
#[cfg(test)]
mod test_support;

pub use channel::SecureChannelSession;
pub use error::{Error, Result};
pub use level::SecurityLevel;
pub use provider::{GpSecureChannelProvider, StaticKeys};
pub use scp02_channel::Scp02Channel;
pub use scp03_channel::Scp03Channel;
