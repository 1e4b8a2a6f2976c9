//! The `Store`: a pooled SQLite handle plus the public API other crates
//! depend on (spec.md §4.6, §9's pooled-single-connection resolution).

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde_json::Value as Json;
use tracing::info;

use crate::error::Result;
use crate::keyset::{Keyset, KeysetFilter, KeysetUpdate, NewKeyset};
use crate::ota_message::{NewOtaMessage, OtaMessage, OtaMessageFilter, OtaMessageStatus};
use crate::ota_template::{NewOtaTemplate, OtaTemplate, OtaTemplateUpdate};
use crate::schema::{ensure_schema, seed_defaults};
use crate::{keyset, ota_message, ota_template, yaml};

/// A handle to the persistent keyset/template/message store.
///
/// Internally backed by an `r2d2` pool capped at a single connection: all
/// callers serialize through that one SQLite connection, which keeps
/// `:memory:` databases coherent across checkouts and avoids SQLite's
/// multi-writer contention without reaching for a heavier embedded engine
/// (spec.md §4.6's concurrency note).
#[derive(Clone)]
pub struct Store {
    pool: Pool<SqliteConnectionManager>,
}

impl Store {
    /// Open (or create) the store at `path`, running idempotent schema
    /// creation and default-row seeding.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path.as_ref());
        Self::from_manager(manager)
    }

    /// Open an in-memory store, primarily for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();
        Self::from_manager(manager)
    }

    fn from_manager(manager: SqliteConnectionManager) -> Result<Self> {
        let pool = Pool::builder().max_size(1).build(manager)?;
        {
            let conn = pool.get()?;
            ensure_schema(&conn)?;
            seed_defaults(&conn)?;
        }
        info!("store opened");
        Ok(Self { pool })
    }

    // -- keysets ---------------------------------------------------------

    /// Add a new keyset.
    pub fn add_keyset(&self, new: NewKeyset) -> Result<Keyset> {
        keyset::add_keyset(&self.pool.get()?, new)
    }

    /// Fetch an active keyset by name and value set.
    pub fn get_keyset(&self, name: &str, value_set: &str) -> Result<Keyset> {
        keyset::get_keyset(&self.pool.get()?, name, value_set)
    }

    /// List keysets matching `filter`.
    pub fn list_keysets(&self, filter: &KeysetFilter) -> Result<Vec<Keyset>> {
        keyset::list_keysets(&self.pool.get()?, filter)
    }

    /// Update a keyset in place.
    pub fn update_keyset(&self, name: &str, value_set: &str, update: KeysetUpdate) -> Result<Keyset> {
        keyset::update_keyset(&self.pool.get()?, name, value_set, update)
    }

    /// Soft-delete a keyset.
    pub fn delete_keyset(&self, name: &str, value_set: &str) -> Result<()> {
        keyset::delete_keyset(&self.pool.get()?, name, value_set)
    }

    /// List distinct value sets carrying at least one active keyset.
    pub fn list_value_sets(&self) -> Result<Vec<String>> {
        keyset::list_value_sets(&self.pool.get()?)
    }

    // -- OTA templates -----------------------------------------------------

    /// Add a new OTA template.
    pub fn add_template(&self, new: NewOtaTemplate) -> Result<OtaTemplate> {
        ota_template::add_template(&self.pool.get()?, new)
    }

    /// Fetch a template by name.
    pub fn get_template(&self, name: &str) -> Result<OtaTemplate> {
        ota_template::get_template(&self.pool.get()?, name)
    }

    /// List templates, optionally restricted to one type.
    pub fn list_templates(&self, template_type: Option<&str>) -> Result<Vec<OtaTemplate>> {
        ota_template::list_templates(&self.pool.get()?, template_type)
    }

    /// Update a template in place.
    pub fn update_template(&self, name: &str, update: OtaTemplateUpdate) -> Result<OtaTemplate> {
        ota_template::update_template(&self.pool.get()?, name, update)
    }

    /// Delete a template.
    pub fn delete_template(&self, name: &str) -> Result<()> {
        ota_template::delete_template(&self.pool.get()?, name)
    }

    /// Read and advance a template's counter atomically, returning the
    /// pre-increment value to embed in the generated message.
    pub fn increment_template_counter(&self, name: &str) -> Result<u32> {
        ota_template::increment_counter(&self.pool.get()?, name)
    }

    // -- OTA messages --------------------------------------------------------

    /// Record a newly generated OTA message (always inserted as `Pending`).
    pub fn add_message(&self, new: NewOtaMessage) -> Result<OtaMessage> {
        ota_message::add_message(&self.pool.get()?, new)
    }

    /// Fetch a message by id.
    pub fn get_message(&self, id: i64) -> Result<OtaMessage> {
        ota_message::get_message(&self.pool.get()?, id)
    }

    /// List messages matching `filter`, most recent first.
    pub fn list_messages(&self, filter: &OtaMessageFilter) -> Result<Vec<OtaMessage>> {
        ota_message::list_messages(&self.pool.get()?, filter)
    }

    /// Update a message's delivery status.
    pub fn update_message_status(&self, id: i64, status: OtaMessageStatus) -> Result<OtaMessage> {
        ota_message::update_message_status(&self.pool.get()?, id, status)
    }

    // -- YAML import/export ------------------------------------------------

    /// Import keysets from a YAML file into `target_value_set`.
    pub fn import_keysets_yaml(&self, path: &Path, target_value_set: &str) -> Result<(usize, usize)> {
        yaml::import_yaml(&self.pool.get()?, path, target_value_set)
    }

    /// Export every active keyset in `value_set` to a YAML file.
    pub fn export_keysets_yaml(&self, value_set: &str, path: &Path) -> Result<usize> {
        yaml::export_yaml(&self.pool.get()?, value_set, path)
    }
}

/// Build the opaque parameter map an `add_message` call carries alongside
/// the encoded envelope, from whatever key/value pairs the caller supplies.
pub fn parameters_from_pairs(pairs: impl IntoIterator<Item = (&'static str, Json)>) -> Json {
    Json::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;

    #[test]
    fn open_in_memory_seeds_defaults() {
        let store = Store::open_in_memory().unwrap();
        let value_sets = store.list_value_sets().unwrap();
        assert!(value_sets.contains(&"production".to_string()));
        assert!(value_sets.contains(&"test".to_string()));
    }

    #[test]
    fn open_on_disk_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");

        {
            let store = Store::open(&path).unwrap();
            store
                .add_keyset(NewKeyset {
                    name: "alpha".to_string(),
                    value_set: "staging".to_string(),
                    protocol: Protocol::Scp02,
                    enc: vec![0x11; 16],
                    mac: vec![0x22; 16],
                    dek: vec![0x33; 16],
                    key_version: 1,
                    security_level: 1,
                    description: None,
                })
                .unwrap();
        }

        let reopened = Store::open(&path).unwrap();
        let fetched = reopened.get_keyset("alpha", "staging").unwrap();
        assert_eq!(fetched.enc, vec![0x11; 16]);
    }

    #[test]
    fn reopening_does_not_duplicate_seed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        Store::open(&path).unwrap();
        let reopened = Store::open(&path).unwrap();
        let production = reopened
            .list_keysets(&KeysetFilter {
                value_set: Some("production".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(production.len(), 2);
    }
}
