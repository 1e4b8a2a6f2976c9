//! Generated OTA message history: CRUD over the `ota_messages` table
//! (spec.md §3, §4.6).

use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value as Json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

use crate::error::{Error, Result};

/// Delivery status of a generated OTA message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaMessageStatus {
    /// Generated but not yet handed to a transport.
    Pending,
    /// Handed to a transport.
    Sent,
    /// Acknowledged delivered by the bearer.
    Delivered,
    /// Delivery failed.
    Failed,
}

impl OtaMessageStatus {
    /// Canonical string form stored in the database.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Sent => "SENT",
            Self::Delivered => "DELIVERED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for OtaMessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OtaMessageStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "SENT" => Ok(Self::Sent),
            "DELIVERED" => Ok(Self::Delivered),
            "FAILED" => Ok(Self::Failed),
            other => Err(Error::InvalidProtocol(other.to_string())),
        }
    }
}

/// A generated OTA message: target, parameters, encoded bytes and status.
#[derive(Debug, Clone, PartialEq)]
pub struct OtaMessage {
    /// Row id.
    pub id: i64,
    /// Template this message was built from.
    pub template_id: i64,
    /// Target application/security-domain AID.
    pub target_aid: Vec<u8>,
    /// Operation tag (e.g. "LOCK", "UNLOCK", "TERMINATE", "MAKE_SELECTABLE").
    pub operation: String,
    /// Opaque parameter map used to build the command.
    pub parameters: Json,
    /// Full SMS-DELIVER TPDU bytes.
    pub sms_tpdu: Vec<u8>,
    /// User Data Header bytes.
    pub udh: Vec<u8>,
    /// User data (secured OTA packet) bytes.
    pub user_data: Vec<u8>,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Delivery status.
    pub status: OtaMessageStatus,
}

/// Fields required to create a new message.
#[derive(Debug, Clone)]
pub struct NewOtaMessage {
    /// Template this message was built from.
    pub template_id: i64,
    /// Target AID.
    pub target_aid: Vec<u8>,
    /// Operation tag.
    pub operation: String,
    /// Opaque parameter map.
    pub parameters: Json,
    /// Full SMS-DELIVER TPDU bytes.
    pub sms_tpdu: Vec<u8>,
    /// UDH bytes.
    pub udh: Vec<u8>,
    /// User data bytes.
    pub user_data: Vec<u8>,
}

/// Filter applied by [`list_messages`].
#[derive(Debug, Clone, Default)]
pub struct OtaMessageFilter {
    /// Restrict to one delivery status.
    pub status: Option<OtaMessageStatus>,
    /// Restrict to one target AID.
    pub target_aid: Option<Vec<u8>>,
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<OtaMessage> {
    let parameters_json: String = row.get("parameters_json")?;
    let status_str: String = row.get("status")?;
    Ok(OtaMessage {
        id: row.get("id")?,
        template_id: row.get("template_id")?,
        target_aid: row.get("target_aid")?,
        operation: row.get("operation")?,
        parameters: serde_json::from_str(&parameters_json).unwrap_or(Json::Null),
        sms_tpdu: row.get("sms_tpdu")?,
        udh: row.get("udh")?,
        user_data: row.get("user_data")?,
        created_at: row.get("created_at")?,
        status: OtaMessageStatus::from_str(&status_str)
            .map_err(|_| rusqlite::Error::InvalidColumnType(0, "status".into(), rusqlite::types::Type::Text))?,
    })
}

/// Insert a new OTA message with status PENDING (spec.md §9's resolution of
/// the initial-status Open Question).
pub fn add_message(conn: &Connection, new: NewOtaMessage) -> Result<OtaMessage> {
    let now = OffsetDateTime::now_utc().format(&Rfc3339).expect("valid timestamp");
    let parameters_json = serde_json::to_string(&new.parameters).unwrap_or_default();
    conn.execute(
        "INSERT INTO ota_messages
            (template_id, target_aid, operation, parameters_json, sms_tpdu, udh, user_data,
             created_at, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            new.template_id,
            new.target_aid,
            new.operation,
            parameters_json,
            new.sms_tpdu,
            new.udh,
            new.user_data,
            now,
            OtaMessageStatus::Pending.as_str(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(id, operation = %new.operation, "ota message recorded");
    get_message(conn, id)
}

/// Fetch a message by id.
pub fn get_message(conn: &Connection, id: i64) -> Result<OtaMessage> {
    conn.query_row("SELECT * FROM ota_messages WHERE id = ?1", params![id], row_to_message)
        .optional()?
        .ok_or(Error::MessageNotFound(id))
}

/// List messages matching `filter`, most recent first.
pub fn list_messages(conn: &Connection, filter: &OtaMessageFilter) -> Result<Vec<OtaMessage>> {
    let mut sql = String::from("SELECT * FROM ota_messages WHERE 1 = 1");
    if filter.status.is_some() {
        sql.push_str(" AND status = ?1");
    }
    if filter.target_aid.is_some() {
        sql.push_str(if filter.status.is_some() {
            " AND target_aid = ?2"
        } else {
            " AND target_aid = ?1"
        });
    }
    sql.push_str(" ORDER BY id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = match (&filter.status, &filter.target_aid) {
        (Some(s), Some(aid)) => stmt.query_map(params![s.as_str(), aid], row_to_message)?,
        (Some(s), None) => stmt.query_map(params![s.as_str()], row_to_message)?,
        (None, Some(aid)) => stmt.query_map(params![aid], row_to_message)?,
        (None, None) => stmt.query_map([], row_to_message)?,
    };
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
}

/// Update a message's delivery status.
pub fn update_message_status(conn: &Connection, id: i64, status: OtaMessageStatus) -> Result<OtaMessage> {
    get_message(conn, id)?;
    conn.execute(
        "UPDATE ota_messages SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    debug!(id, ?status, "ota message status updated");
    get_message(conn, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ota_template::{add_template, NewOtaTemplate};
    use crate::schema::ensure_schema;

    fn conn_with_template() -> (Connection, i64) {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        let template = add_template(
            &conn,
            NewOtaTemplate {
                name: "clfdb_lock".to_string(),
                template_type: "CLFDB".to_string(),
                spi: [0x02, 0x00],
                kic: 0x01,
                kid: 0x01,
                tar: [0x00, 0x00, 0x00],
                counter: 1,
                pcounter: 0x00,
                template: "80F040{lifecycle}{aid_length}{aid}".to_string(),
            },
        )
        .unwrap();
        (conn, template.id)
    }

    fn sample(template_id: i64) -> NewOtaMessage {
        NewOtaMessage {
            template_id,
            target_aid: vec![0xA0, 0x00, 0x00, 0x00, 0x03],
            operation: "LOCK".to_string(),
            parameters: serde_json::json!({"lifecycle": "0x87"}),
            sms_tpdu: vec![0x44, 0x00],
            udh: vec![0x70, 0x00],
            user_data: vec![0x01, 0x02],
        }
    }

    #[test]
    fn add_defaults_to_pending() {
        let (conn, template_id) = conn_with_template();
        let message = add_message(&conn, sample(template_id)).unwrap();
        assert_eq!(message.status, OtaMessageStatus::Pending);
    }

    #[test]
    fn status_updates_round_trip() {
        let (conn, template_id) = conn_with_template();
        let message = add_message(&conn, sample(template_id)).unwrap();
        let updated = update_message_status(&conn, message.id, OtaMessageStatus::Sent).unwrap();
        assert_eq!(updated.status, OtaMessageStatus::Sent);
    }

    #[test]
    fn list_filters_by_status_and_target() {
        let (conn, template_id) = conn_with_template();
        let m1 = add_message(&conn, sample(template_id)).unwrap();
        add_message(&conn, sample(template_id)).unwrap();
        update_message_status(&conn, m1.id, OtaMessageStatus::Sent).unwrap();

        let pending = list_messages(
            &conn,
            &OtaMessageFilter {
                status: Some(OtaMessageStatus::Pending),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(pending.len(), 1);

        let by_target = list_messages(
            &conn,
            &OtaMessageFilter {
                target_aid: Some(vec![0xA0, 0x00, 0x00, 0x00, 0x03]),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_target.len(), 2);
    }
}
