//! Keyset YAML import/export transport (spec.md §6, §9: "Collapse to one
//! source of truth: the store, with YAML purely as an import/export
//! transport").

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::keyset::{add_keyset, list_keysets, KeysetFilter, NewKeyset};
use crate::protocol::Protocol;

/// One `keysets:` entry, matching spec.md §6's grammar (hex-encoded 32 or
/// 48 character key strings).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct YamlKeyset {
    protocol: String,
    enc_key: String,
    mac_key: String,
    dek_key: String,
    key_version: u8,
    #[serde(default = "default_security_level")]
    security_level: Option<u8>,
    #[serde(default)]
    description: Option<String>,
}

const fn default_security_level() -> Option<u8> {
    Some(1)
}

/// Top-level document: a `keysets:` mapping name -> entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct YamlDocument {
    #[serde(default)]
    keysets: BTreeMap<String, YamlKeyset>,
}

/// Import keysets from a YAML file into `target_value_set`. Returns
/// `(imported, skipped)` counts; an entry is skipped (not an overall error)
/// when its hex is malformed, its protocol is unrecognized, or an active
/// keyset with the same name already exists in `target_value_set`.
pub fn import_yaml(conn: &Connection, path: &Path, target_value_set: &str) -> Result<(usize, usize)> {
    let contents = std::fs::read_to_string(path)?;
    let doc: YamlDocument = serde_yaml::from_str(&contents)?;

    let mut imported = 0;
    let mut skipped = 0;

    for (name, entry) in doc.keysets {
        let result = (|| -> Result<()> {
            let protocol: Protocol = entry.protocol.parse()?;
            let enc = hex::decode(&entry.enc_key)?;
            let mac = hex::decode(&entry.mac_key)?;
            let dek = hex::decode(&entry.dek_key)?;
            add_keyset(
                conn,
                NewKeyset {
                    name: name.clone(),
                    value_set: target_value_set.to_string(),
                    protocol,
                    enc,
                    mac,
                    dek,
                    key_version: entry.key_version,
                    security_level: entry.security_level.unwrap_or(1),
                    description: entry.description.clone(),
                },
            )?;
            Ok(())
        })();

        match result {
            Ok(()) => imported += 1,
            Err(err) => {
                warn!(name = %name, error = %err, "skipping keyset on import");
                skipped += 1;
            }
        }
    }

    debug!(imported, skipped, value_set = target_value_set, "yaml import complete");
    Ok((imported, skipped))
}

/// Export every active keyset in `value_set` to a YAML file. Soft-deleted
/// keysets are never re-exported (spec.md §6).
pub fn export_yaml(conn: &Connection, value_set: &str, path: &Path) -> Result<usize> {
    let keysets = list_keysets(
        conn,
        &KeysetFilter {
            value_set: Some(value_set.to_string()),
            protocol: None,
            include_inactive: false,
        },
    )?;

    let mut doc = YamlDocument::default();
    for keyset in &keysets {
        doc.keysets.insert(
            keyset.name.clone(),
            YamlKeyset {
                protocol: keyset.protocol.as_str().to_string(),
                enc_key: hex::encode_upper(&keyset.enc),
                mac_key: hex::encode_upper(&keyset.mac),
                dek_key: hex::encode_upper(&keyset.dek),
                key_version: keyset.key_version,
                security_level: Some(keyset.security_level),
                description: keyset.description.clone(),
            },
        );
    }

    let yaml = serde_yaml::to_string(&doc)?;
    std::fs::write(path, yaml)?;
    debug!(value_set, count = keysets.len(), "yaml export complete");
    Ok(keysets.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ensure_schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn import_then_export_round_trips() {
        let conn = conn();
        let dir = tempfile::tempdir().unwrap();
        let import_path = dir.path().join("keysets.yaml");
        std::fs::write(
            &import_path,
            r#"
keysets:
  alpha:
    protocol: SCP03
    enc_key: "000102030405060708090A0B0C0D0E0F"
    mac_key: "101112131415161718191A1B1C1D1E1F"
    dek_key: "202122232425262728292A2B2C2D2E2F"
    key_version: 48
    security_level: 1
"#,
        )
        .unwrap();

        let (imported, skipped) = import_yaml(&conn, &import_path, "staging").unwrap();
        assert_eq!(imported, 1);
        assert_eq!(skipped, 0);

        let export_path = dir.path().join("export.yaml");
        let count = export_yaml(&conn, "staging", &export_path).unwrap();
        assert_eq!(count, 1);

        let reimported_dir = tempfile::tempdir().unwrap();
        let _ = reimported_dir; // kept alive; export content checked below
        let exported = std::fs::read_to_string(&export_path).unwrap();
        assert!(exported.contains("alpha"));
        assert!(exported.contains("000102030405060708090A0B0C0D0E0F"));
    }

    #[test]
    fn duplicate_entries_are_skipped_not_fatal() {
        let conn = conn();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keysets.yaml");
        std::fs::write(
            &path,
            r#"
keysets:
  alpha:
    protocol: SCP03
    enc_key: "00000000000000000000000000000000"
    mac_key: "10101010101010101010101010101010"
    dek_key: "20202020202020202020202020202020"
    key_version: 1
"#,
        )
        .unwrap();

        // Malformed hex (odd extra digit) is skipped rather than aborting
        // the whole import.
        let (imported, skipped) = import_yaml(&conn, &path, "staging").unwrap();
        assert_eq!(imported, 0);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn inactive_keysets_are_not_exported() {
        let conn = conn();
        add_keyset(
            &conn,
            NewKeyset {
                name: "gone".to_string(),
                value_set: "staging".to_string(),
                protocol: Protocol::Scp03,
                enc: vec![0u8; 16],
                mac: vec![0u8; 16],
                dek: vec![0u8; 16],
                key_version: 1,
                security_level: 1,
                description: None,
            },
        )
        .unwrap();
        crate::keyset::delete_keyset(&conn, "gone", "staging").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.yaml");
        let count = export_yaml(&conn, "staging", &path).unwrap();
        assert_eq!(count, 0);
    }
}
