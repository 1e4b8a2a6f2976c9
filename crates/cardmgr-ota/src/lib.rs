//! ETSI TS 102.225/102.226 OTA SMS-PP envelope builder: renders a
//! [`cardmgr_store::OtaTemplate`] against an operation and target AID,
//! assembles the secured command packet and SMS-DELIVER TPDU, and
//! persists the result via [`cardmgr_store::Store`].
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
pub mod error;
mod operation;
mod security_packet;
mod template;
mod tpdu;
mod udh;

pub use builder::OtaBuilder;
pub use error::{Error, Result};
pub use operation::OtaClfdbOperation;
