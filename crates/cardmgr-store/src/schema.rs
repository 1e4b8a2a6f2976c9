//! Idempotent schema creation and default-row seeding (spec.md §4.6:
//! "On first open, the store runs idempotent schema creation and seeds
//! default rows... Seeding uses insert-or-ignore so it is safe on an
//! existing store.").

use rusqlite::{params, Connection};
use tracing::debug;

use crate::error::Result;

const CREATE_KEYSETS: &str = "
CREATE TABLE IF NOT EXISTS keysets (
    id              INTEGER PRIMARY KEY,
    name            TEXT NOT NULL,
    value_set       TEXT NOT NULL,
    protocol        TEXT NOT NULL,
    enc             BLOB NOT NULL,
    mac             BLOB NOT NULL,
    dek             BLOB NOT NULL,
    key_version     INTEGER NOT NULL,
    security_level  INTEGER NOT NULL,
    description     TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    active          INTEGER NOT NULL DEFAULT 1
)";

// Only one active row may use a given (name, value_set) pair; soft-deleted
// rows are excluded from the uniqueness check so a name can be reused after
// deletion (spec.md §8 property P7).
const CREATE_KEYSETS_UNIQUE_INDEX: &str = "
CREATE UNIQUE INDEX IF NOT EXISTS idx_keysets_active_unique
    ON keysets(name, value_set)
    WHERE active = 1";

const CREATE_OTA_TEMPLATES: &str = "
CREATE TABLE IF NOT EXISTS ota_templates (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    type        TEXT NOT NULL,
    spi         BLOB NOT NULL,
    kic         INTEGER NOT NULL,
    kid         INTEGER NOT NULL,
    tar         BLOB NOT NULL,
    counter     INTEGER NOT NULL,
    pcounter    INTEGER NOT NULL,
    template    TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
)";

const CREATE_OTA_MESSAGES: &str = "
CREATE TABLE IF NOT EXISTS ota_messages (
    id              INTEGER PRIMARY KEY,
    template_id     INTEGER NOT NULL REFERENCES ota_templates(id),
    target_aid      BLOB NOT NULL,
    operation       TEXT NOT NULL,
    parameters_json TEXT NOT NULL,
    sms_tpdu        BLOB NOT NULL,
    udh             BLOB NOT NULL,
    user_data       BLOB NOT NULL,
    created_at      TEXT NOT NULL,
    status          TEXT NOT NULL
)";

/// Create every table/index if absent. Safe to call on every open.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_KEYSETS)?;
    conn.execute_batch(CREATE_KEYSETS_UNIQUE_INDEX)?;
    conn.execute_batch(CREATE_OTA_TEMPLATES)?;
    conn.execute_batch(CREATE_OTA_MESSAGES)?;
    debug!("store schema ensured");
    Ok(())
}

/// Default GlobalPlatform test key (0x40..0x4F), the well-known value used
/// throughout the GlobalPlatform Card Specification's own worked examples.
/// Seeded keysets use it as a placeholder; operators are expected to
/// `update-keyset`/`import-keysets` real card-diversified keys before use.
const DEFAULT_TEST_KEY: [u8; 16] = [
    0x40, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E, 0x4F,
];

/// Seed default keysets and CLFDB templates if not already present.
/// `INSERT OR IGNORE` makes this safe to call on a pre-populated store
/// (spec.md §4.6).
pub fn seed_defaults(conn: &Connection) -> Result<()> {
    seed_keysets(conn)?;
    seed_templates(conn)?;
    debug!("store defaults seeded");
    Ok(())
}

fn seed_keysets(conn: &Connection) -> Result<()> {
    let now = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .expect("valid timestamp");

    let defaults: [(&str, &str, &str, u8, u8, &str); 3] = [
        (
            "default-scp02",
            "production",
            "SCP02",
            0x00,
            1,
            "Default production SCP02 keyset (placeholder test key; replace before use)",
        ),
        (
            "default-scp03",
            "production",
            "SCP03",
            0x30,
            1,
            "Default production SCP03 keyset (placeholder test key; replace before use)",
        ),
        (
            "test",
            "test",
            "SCP03",
            0xFF,
            3,
            "All-zero SCP03 test keyset for bench/simulator use only",
        ),
    ];

    for (name, value_set, protocol, key_version, security_level, description) in defaults {
        let key: [u8; 16] = if value_set == "test" {
            [0u8; 16]
        } else {
            DEFAULT_TEST_KEY
        };
        conn.execute(
            "INSERT OR IGNORE INTO keysets
                (name, value_set, protocol, enc, mac, dek, key_version, security_level,
                 description, created_at, updated_at, active)
             VALUES (?1, ?2, ?3, ?4, ?4, ?4, ?5, ?6, ?7, ?8, ?8, 1)",
            params![name, value_set, protocol, key.to_vec(), key_version, security_level, description, now],
        )?;
    }
    Ok(())
}

fn seed_templates(conn: &Connection) -> Result<()> {
    let now = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .expect("valid timestamp");

    // CLFDB templates: SET STATUS targeting an Application/SD
    // (P1 = 0x40), P2/LC = the lifecycle byte the placeholder substitutes.
    let defaults: [(&str, u8); 4] = [
        ("clfdb_lock", 0x87),
        ("clfdb_unlock", 0x07),
        ("clfdb_terminate", 0xFF),
        ("clfdb_make_selectable", 0x07),
    ];

    for (name, _lifecycle_byte) in defaults {
        conn.execute(
            "INSERT OR IGNORE INTO ota_templates
                (name, type, spi, kic, kid, tar, counter, pcounter, template, created_at, updated_at)
             VALUES (?1, 'CLFDB', ?2, 1, 1, ?3, 1, 0, ?4, ?5, ?5)",
            params![
                name,
                vec![0x02u8, 0x00u8],
                vec![0x00u8, 0x00u8, 0x00u8],
                "80F040{lifecycle}{aid_length}{aid}",
                now,
            ],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
    }

    #[test]
    fn seeding_is_safe_to_repeat() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        seed_defaults(&conn).unwrap();
        seed_defaults(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM keysets", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 3);

        let template_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM ota_templates", [], |row| row.get(0))
            .unwrap();
        assert_eq!(template_count, 4);
    }
}
