//! OTA command templates: CRUD over the `ota_templates` table (spec.md §3,
//! §4.6) plus the monotonic counter advance §4.7's builder depends on.

use rusqlite::{params, Connection, OptionalExtension};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

use crate::error::{Error, Result};

/// Immutable OTA header values and a command template, named by type (e.g.
/// `clfdb_lock`, `clfdb_unlock`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtaTemplate {
    /// Row id.
    pub id: i64,
    /// Unique template name.
    pub name: String,
    /// Template type/kind (e.g. "CLFDB", "INSTALL").
    pub template_type: String,
    /// SPI (2 bytes, security parameter indicators).
    pub spi: [u8; 2],
    /// Key indicator for ciphering.
    pub kic: u8,
    /// Key indicator for integrity.
    pub kid: u8,
    /// Toolkit Application Reference (3 bytes).
    pub tar: [u8; 3],
    /// Current counter value; advanced by [`increment_counter`] on every use.
    pub counter: u32,
    /// Padding counter.
    pub pcounter: u8,
    /// Command pattern with `{placeholder}` substitutions (spec.md §6).
    pub template: String,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Last-update timestamp (RFC 3339).
    pub updated_at: String,
}

/// Fields required to create a new template.
#[derive(Debug, Clone)]
pub struct NewOtaTemplate {
    /// Unique template name.
    pub name: String,
    /// Template type/kind.
    pub template_type: String,
    /// SPI.
    pub spi: [u8; 2],
    /// KIc.
    pub kic: u8,
    /// KID.
    pub kid: u8,
    /// TAR.
    pub tar: [u8; 3],
    /// Starting counter value.
    pub counter: u32,
    /// Padding counter.
    pub pcounter: u8,
    /// Command pattern.
    pub template: String,
}

/// Fields that may be changed in place by [`update_template`].
#[derive(Debug, Clone, Default)]
pub struct OtaTemplateUpdate {
    /// New SPI, if changing.
    pub spi: Option<[u8; 2]>,
    /// New KIc, if changing.
    pub kic: Option<u8>,
    /// New KID, if changing.
    pub kid: Option<u8>,
    /// New TAR, if changing.
    pub tar: Option<[u8; 3]>,
    /// New padding counter, if changing.
    pub pcounter: Option<u8>,
    /// New command pattern, if changing.
    pub template: Option<String>,
}

fn row_to_template(row: &rusqlite::Row<'_>) -> rusqlite::Result<OtaTemplate> {
    let spi: Vec<u8> = row.get("spi")?;
    let tar: Vec<u8> = row.get("tar")?;
    Ok(OtaTemplate {
        id: row.get("id")?,
        name: row.get("name")?,
        template_type: row.get("type")?,
        spi: spi.try_into().unwrap_or([0, 0]),
        kic: row.get("kic")?,
        kid: row.get("kid")?,
        tar: tar.try_into().unwrap_or([0, 0, 0]),
        counter: row.get::<_, i64>("counter")? as u32,
        pcounter: row.get("pcounter")?,
        template: row.get("template")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Insert a new OTA template. Fails with [`Error::DuplicateTemplate`] if
/// `name` is already taken (templates have no soft-delete flag, spec.md §4.6
/// only requires `UNIQUE name`).
pub fn add_template(conn: &Connection, new: NewOtaTemplate) -> Result<OtaTemplate> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT id FROM ota_templates WHERE name = ?1",
            params![new.name],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_some() {
        return Err(Error::DuplicateTemplate(new.name));
    }

    let now = OffsetDateTime::now_utc().format(&Rfc3339).expect("valid timestamp");
    conn.execute(
        "INSERT INTO ota_templates
            (name, type, spi, kic, kid, tar, counter, pcounter, template, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            new.name,
            new.template_type,
            new.spi.to_vec(),
            new.kic,
            new.kid,
            new.tar.to_vec(),
            new.counter,
            new.pcounter,
            new.template,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(id, name = %new.name, "ota template added");
    get_template_by_id(conn, id)
}

fn get_template_by_id(conn: &Connection, id: i64) -> Result<OtaTemplate> {
    conn.query_row(
        "SELECT * FROM ota_templates WHERE id = ?1",
        params![id],
        row_to_template,
    )
    .map_err(Error::from)
}

/// Fetch the template named `name`.
pub fn get_template(conn: &Connection, name: &str) -> Result<OtaTemplate> {
    conn.query_row(
        "SELECT * FROM ota_templates WHERE name = ?1",
        params![name],
        row_to_template,
    )
    .optional()?
    .ok_or_else(|| Error::TemplateNotFound(name.to_string()))
}

/// List templates, optionally restricted to one `template_type`.
pub fn list_templates(conn: &Connection, template_type: Option<&str>) -> Result<Vec<OtaTemplate>> {
    let mut stmt = if template_type.is_some() {
        conn.prepare("SELECT * FROM ota_templates WHERE type = ?1 ORDER BY name")?
    } else {
        conn.prepare("SELECT * FROM ota_templates ORDER BY name")?
    };
    let rows = if let Some(t) = template_type {
        stmt.query_map(params![t], row_to_template)?
    } else {
        stmt.query_map([], row_to_template)?
    };
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
}

/// Update fields of an existing template in place.
pub fn update_template(conn: &Connection, name: &str, update: OtaTemplateUpdate) -> Result<OtaTemplate> {
    let existing = get_template(conn, name)?;
    let spi = update.spi.unwrap_or(existing.spi);
    let kic = update.kic.unwrap_or(existing.kic);
    let kid = update.kid.unwrap_or(existing.kid);
    let tar = update.tar.unwrap_or(existing.tar);
    let pcounter = update.pcounter.unwrap_or(existing.pcounter);
    let template = update.template.unwrap_or(existing.template);
    let now = OffsetDateTime::now_utc().format(&Rfc3339).expect("valid timestamp");

    conn.execute(
        "UPDATE ota_templates
         SET spi = ?1, kic = ?2, kid = ?3, tar = ?4, pcounter = ?5, template = ?6, updated_at = ?7
         WHERE id = ?8",
        params![spi.to_vec(), kic, kid, tar.to_vec(), pcounter, template, now, existing.id],
    )?;
    debug!(id = existing.id, name, "ota template updated");
    get_template_by_id(conn, existing.id)
}

/// Delete a template outright (no soft-delete column for templates).
pub fn delete_template(conn: &Connection, name: &str) -> Result<()> {
    let existing = get_template(conn, name)?;
    conn.execute("DELETE FROM ota_templates WHERE id = ?1", params![existing.id])?;
    debug!(name, "ota template deleted");
    Ok(())
}

/// Read the current counter and advance it by one, in a single statement,
/// enforcing spec.md §8 property P8 (successive builds differ by exactly 1).
pub fn increment_counter(conn: &Connection, name: &str) -> Result<u32> {
    let existing = get_template(conn, name)?;
    let next = existing.counter.checked_add(1).unwrap_or(0);
    conn.execute(
        "UPDATE ota_templates SET counter = ?1 WHERE id = ?2",
        params![next, existing.id],
    )?;
    Ok(existing.counter)
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

    fn sample(name: &str) -> NewOtaTemplate {
        NewOtaTemplate {
            name: name.to_string(),
            template_type: "CLFDB".to_string(),
            spi: [0x02, 0x00],
            kic: 0x01,
            kid: 0x01,
            tar: [0x00, 0x00, 0x00],
            counter: 1,
            pcounter: 0x00,
            template: "80F040{lifecycle}{aid_length}{aid}".to_string(),
        }
    }

    #[test]
    fn add_and_get_round_trips() {
        let conn = conn();
        let created = add_template(&conn, sample("clfdb_lock")).unwrap();
        assert_eq!(get_template(&conn, "clfdb_lock").unwrap(), created);
    }

    #[test]
    fn duplicate_name_rejected() {
        let conn = conn();
        add_template(&conn, sample("clfdb_lock")).unwrap();
        assert!(matches!(
            add_template(&conn, sample("clfdb_lock")),
            Err(Error::DuplicateTemplate(_))
        ));
    }

    #[test]
    fn counter_advances_monotonically() {
        let conn = conn();
        add_template(&conn, sample("clfdb_lock")).unwrap();
        let first = increment_counter(&conn, "clfdb_lock").unwrap();
        let second = increment_counter(&conn, "clfdb_lock").unwrap();
        assert_eq!(second, first + 1);
    }

    #[test]
    fn list_filters_by_type() {
        let conn = conn();
        add_template(&conn, sample("clfdb_lock")).unwrap();
        let mut other = sample("install_app");
        other.template_type = "INSTALL".to_string();
        add_template(&conn, other).unwrap();

        assert_eq!(list_templates(&conn, Some("CLFDB")).unwrap().len(), 1);
        assert_eq!(list_templates(&conn, None).unwrap().len(), 2);
    }
}
