//! Persistent keyset/OTA-template/OTA-message store: idempotent schema
//! creation, default-row seeding, CRUD with soft-delete semantics, and
//! YAML import/export for keysets, all behind a pooled SQLite connection.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
mod keyset;
mod ota_message;
mod ota_template;
mod protocol;
mod schema;
mod store;
mod yaml;

pub use error::{Error, Result};
pub use keyset::{Keyset, KeysetFilter, KeysetUpdate, NewKeyset};
pub use ota_message::{NewOtaMessage, OtaMessage, OtaMessageFilter, OtaMessageStatus};
pub use ota_template::{NewOtaTemplate, OtaTemplate, OtaTemplateUpdate};
pub use protocol::Protocol;
pub use store::{parameters_from_pairs, Store};
