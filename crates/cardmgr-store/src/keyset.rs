//! Keyset value sets: CRUD over the `keysets` table (spec.md §3, §4.6).

use rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::protocol::Protocol;

/// A named triple of symmetric keys plus the metadata spec.md §3 defines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyset {
    /// Row id.
    pub id: i64,
    /// Name, unique within a value set while active.
    pub name: String,
    /// Value set grouping label (e.g. "production", "test").
    pub value_set: String,
    /// Secure channel protocol the keys are diversified for.
    pub protocol: Protocol,
    /// ENC key bytes (16 or 24 depending on protocol).
    pub enc: Vec<u8>,
    /// MAC key bytes.
    pub mac: Vec<u8>,
    /// DEK key bytes.
    pub dek: Vec<u8>,
    /// Key version number (0-255).
    pub key_version: u8,
    /// Default security level (1, 2 or 3) a session opened with this
    /// keyset should request.
    pub security_level: u8,
    /// Free-form description.
    pub description: Option<String>,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Last-update timestamp (RFC 3339).
    pub updated_at: String,
    /// `false` once soft-deleted; retained for audit.
    pub active: bool,
}

/// Fields required to create a new keyset.
#[derive(Debug, Clone)]
pub struct NewKeyset {
    /// Name, unique within `value_set` while active.
    pub name: String,
    /// Value set grouping label.
    pub value_set: String,
    /// Secure channel protocol.
    pub protocol: Protocol,
    /// ENC key bytes.
    pub enc: Vec<u8>,
    /// MAC key bytes.
    pub mac: Vec<u8>,
    /// DEK key bytes.
    pub dek: Vec<u8>,
    /// Key version number.
    pub key_version: u8,
    /// Default security level.
    pub security_level: u8,
    /// Free-form description.
    pub description: Option<String>,
}

/// Fields that may be changed in place by [`update_keyset`].
#[derive(Debug, Clone, Default)]
pub struct KeysetUpdate {
    /// New ENC key, if changing.
    pub enc: Option<Vec<u8>>,
    /// New MAC key, if changing.
    pub mac: Option<Vec<u8>>,
    /// New DEK key, if changing.
    pub dek: Option<Vec<u8>>,
    /// New key version, if changing.
    pub key_version: Option<u8>,
    /// New default security level, if changing.
    pub security_level: Option<u8>,
    /// New description, if changing (`Some(None)` clears it).
    pub description: Option<Option<String>>,
}

/// Filter applied by [`list_keysets`].
#[derive(Debug, Clone, Default)]
pub struct KeysetFilter {
    /// Restrict to one value set.
    pub value_set: Option<String>,
    /// Restrict to one protocol.
    pub protocol: Option<Protocol>,
    /// Include soft-deleted rows (excluded by default).
    pub include_inactive: bool,
}

fn validate_key_length(bytes: &[u8]) -> Result<()> {
    if bytes.len() == 16 || bytes.len() == 24 {
        Ok(())
    } else {
        Err(Error::InvalidKeyLength(bytes.len()))
    }
}

fn row_to_keyset(row: &rusqlite::Row<'_>) -> rusqlite::Result<Keyset> {
    let protocol_str: String = row.get("protocol")?;
    let protocol = protocol_str
        .parse()
        .map_err(|_| rusqlite::Error::InvalidColumnType(0, "protocol".into(), rusqlite::types::Type::Text))?;
    Ok(Keyset {
        id: row.get("id")?,
        name: row.get("name")?,
        value_set: row.get("value_set")?,
        protocol,
        enc: row.get("enc")?,
        mac: row.get("mac")?,
        dek: row.get("dek")?,
        key_version: row.get("key_version")?,
        security_level: row.get("security_level")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        active: row.get::<_, i64>("active")? != 0,
    })
}

/// Insert a new keyset row. Fails with [`Error::DuplicateKeyset`] if an
/// active row with the same `(name, value_set)` already exists (spec.md §8
/// property P7); a soft-deleted row with the same name does not conflict.
pub fn add_keyset(conn: &Connection, new: NewKeyset) -> Result<Keyset> {
    validate_key_length(&new.enc)?;
    validate_key_length(&new.mac)?;
    validate_key_length(&new.dek)?;

    let exists: Option<i64> = conn
        .query_row(
            "SELECT id FROM keysets WHERE name = ?1 AND value_set = ?2 AND active = 1",
            params![new.name, new.value_set],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_some() {
        return Err(Error::DuplicateKeyset {
            name: new.name,
            value_set: new.value_set,
        });
    }

    let now = OffsetDateTime::now_utc().format(&Rfc3339).expect("valid timestamp");
    conn.execute(
        "INSERT INTO keysets
            (name, value_set, protocol, enc, mac, dek, key_version, security_level,
             description, created_at, updated_at, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10, 1)",
        params![
            new.name,
            new.value_set,
            new.protocol.as_str(),
            new.enc,
            new.mac,
            new.dek,
            new.key_version,
            new.security_level,
            new.description,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(id, name = %new.name, value_set = %new.value_set, "keyset added");
    get_keyset_by_id(conn, id)
}

fn get_keyset_by_id(conn: &Connection, id: i64) -> Result<Keyset> {
    conn.query_row("SELECT * FROM keysets WHERE id = ?1", params![id], row_to_keyset)
        .map_err(Error::from)
}

/// Fetch the active keyset named `name` in `value_set`.
pub fn get_keyset(conn: &Connection, name: &str, value_set: &str) -> Result<Keyset> {
    conn.query_row(
        "SELECT * FROM keysets WHERE name = ?1 AND value_set = ?2 AND active = 1",
        params![name, value_set],
        row_to_keyset,
    )
    .optional()?
    .ok_or_else(|| Error::KeysetNotFound {
        name: name.to_string(),
        value_set: value_set.to_string(),
    })
}

/// List keysets matching `filter`, excluding soft-deleted rows unless
/// [`KeysetFilter::include_inactive`] is set.
pub fn list_keysets(conn: &Connection, filter: &KeysetFilter) -> Result<Vec<Keyset>> {
    let mut sql = String::from("SELECT * FROM keysets WHERE 1 = 1");
    if !filter.include_inactive {
        sql.push_str(" AND active = 1");
    }
    if filter.value_set.is_some() {
        sql.push_str(" AND value_set = ?1");
    }
    if filter.protocol.is_some() {
        sql.push_str(if filter.value_set.is_some() {
            " AND protocol = ?2"
        } else {
            " AND protocol = ?1"
        });
    }
    sql.push_str(" ORDER BY value_set, name");

    let mut stmt = conn.prepare(&sql)?;
    let rows = match (&filter.value_set, &filter.protocol) {
        (Some(vs), Some(p)) => stmt.query_map(params![vs, p.as_str()], row_to_keyset)?,
        (Some(vs), None) => stmt.query_map(params![vs], row_to_keyset)?,
        (None, Some(p)) => stmt.query_map(params![p.as_str()], row_to_keyset)?,
        (None, None) => stmt.query_map([], row_to_keyset)?,
    };
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
}

/// Update fields of an existing active keyset in place.
pub fn update_keyset(
    conn: &Connection,
    name: &str,
    value_set: &str,
    update: KeysetUpdate,
) -> Result<Keyset> {
    let existing = get_keyset(conn, name, value_set)?;

    if let Some(enc) = &update.enc {
        validate_key_length(enc)?;
    }
    if let Some(mac) = &update.mac {
        validate_key_length(mac)?;
    }
    if let Some(dek) = &update.dek {
        validate_key_length(dek)?;
    }

    let enc = update.enc.unwrap_or(existing.enc);
    let mac = update.mac.unwrap_or(existing.mac);
    let dek = update.dek.unwrap_or(existing.dek);
    let key_version = update.key_version.unwrap_or(existing.key_version);
    let security_level = update.security_level.unwrap_or(existing.security_level);
    let description = update.description.unwrap_or(existing.description);
    let now = OffsetDateTime::now_utc().format(&Rfc3339).expect("valid timestamp");

    conn.execute(
        "UPDATE keysets
         SET enc = ?1, mac = ?2, dek = ?3, key_version = ?4, security_level = ?5,
             description = ?6, updated_at = ?7
         WHERE id = ?8",
        params![enc, mac, dek, key_version, security_level, description, now, existing.id],
    )?;
    debug!(id = existing.id, name, value_set, "keyset updated");
    get_keyset_by_id(conn, existing.id)
}

/// Soft-delete the active keyset named `name` in `value_set` (flips
/// `active` to false; the row is retained for audit per spec.md §3).
pub fn delete_keyset(conn: &Connection, name: &str, value_set: &str) -> Result<()> {
    let existing = get_keyset(conn, name, value_set)?;
    let now = OffsetDateTime::now_utc().format(&Rfc3339).expect("valid timestamp");
    conn.execute(
        "UPDATE keysets SET active = 0, updated_at = ?1 WHERE id = ?2",
        params![now, existing.id],
    )?;
    warn!(name, value_set, "keyset soft-deleted");
    Ok(())
}

/// Distinct value set names carrying at least one active keyset.
pub fn list_value_sets(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT value_set FROM keysets WHERE active = 1 ORDER BY value_set")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
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

    fn sample(name: &str, value_set: &str) -> NewKeyset {
        NewKeyset {
            name: name.to_string(),
            value_set: value_set.to_string(),
            protocol: Protocol::Scp03,
            enc: vec![0x11; 16],
            mac: vec![0x22; 16],
            dek: vec![0x33; 16],
            key_version: 0x30,
            security_level: 1,
            description: None,
        }
    }

    #[test]
    fn add_and_get_round_trips() {
        let conn = conn();
        let created = add_keyset(&conn, sample("alpha", "test")).unwrap();
        let fetched = get_keyset(&conn, "alpha", "test").unwrap();
        assert_eq!(created, fetched);
    }

    #[test]
    fn duplicate_active_name_rejected() {
        let conn = conn();
        add_keyset(&conn, sample("alpha", "test")).unwrap();
        let err = add_keyset(&conn, sample("alpha", "test")).unwrap_err();
        assert!(matches!(err, Error::DuplicateKeyset { .. }));
    }

    #[test]
    fn soft_deleted_name_can_be_reused() {
        let conn = conn();
        add_keyset(&conn, sample("alpha", "test")).unwrap();
        delete_keyset(&conn, "alpha", "test").unwrap();
        let recreated = add_keyset(&conn, sample("alpha", "test"));
        assert!(recreated.is_ok());
    }

    #[test]
    fn list_excludes_inactive_by_default() {
        let conn = conn();
        add_keyset(&conn, sample("alpha", "test")).unwrap();
        add_keyset(&conn, sample("beta", "test")).unwrap();
        delete_keyset(&conn, "beta", "test").unwrap();

        let active = list_keysets(&conn, &KeysetFilter::default()).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "alpha");

        let all = list_keysets(
            &conn,
            &KeysetFilter {
                include_inactive: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn rejects_bad_key_length() {
        let conn = conn();
        let mut bad = sample("alpha", "test");
        bad.enc = vec![0u8; 10];
        assert!(matches!(
            add_keyset(&conn, bad),
            Err(Error::InvalidKeyLength(10))
        ));
    }

    #[test]
    fn update_replaces_only_given_fields() {
        let conn = conn();
        add_keyset(&conn, sample("alpha", "test")).unwrap();
        let updated = update_keyset(
            &conn,
            "alpha",
            "test",
            KeysetUpdate {
                security_level: Some(3),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.security_level, 3);
        assert_eq!(updated.enc, vec![0x11; 16]);
    }
}
