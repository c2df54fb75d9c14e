//! Encoding and decoding helpers between [`Record`] and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Entity payloads are stored as compact JSON.

use chrono::{DateTime, Utc};
use softdel_core::record::{Entity, Record, Tombstone};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Raw column values for one `records` row.
#[derive(Debug, Clone)]
pub struct RawRecord {
  pub record_id:   String,
  pub kind:        String,
  pub data_json:   String,
  pub created_at:  String,
  pub deleted_at:  Option<String>,
  pub deleted_by:  Option<i64>,
  pub restored_by: Option<i64>,
}

impl RawRecord {
  pub fn from_record<T: Entity>(record: &Record<T>) -> Result<Self> {
    Ok(Self {
      record_id:   encode_uuid(record.record_id),
      kind:        T::KIND.to_owned(),
      data_json:   serde_json::to_string(&record.data)?,
      created_at:  encode_dt(record.created_at),
      deleted_at:  record.tombstone.deleted_at.map(encode_dt),
      deleted_by:  record.tombstone.deleted_by,
      restored_by: record.tombstone.restored_by,
    })
  }

  pub fn into_record<T: Entity>(self) -> Result<Record<T>> {
    let deleted_at = self.deleted_at.as_deref().map(decode_dt).transpose()?;

    Ok(Record {
      record_id:  decode_uuid(&self.record_id)?,
      created_at: decode_dt(&self.created_at)?,
      tombstone:  Tombstone {
        deleted_at,
        deleted_by: self.deleted_by,
        restored_by: self.restored_by,
      },
      data:       serde_json::from_str(&self.data_json)?,
    })
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:   row.get(0)?,
      kind:        row.get(1)?,
      data_json:   row.get(2)?,
      created_at:  row.get(3)?,
      deleted_at:  row.get(4)?,
      deleted_by:  row.get(5)?,
      restored_by: row.get(6)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dt_round_trips_through_rfc3339() {
    let now = Utc::now();
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
  }

  #[test]
  fn decode_dt_rejects_garbage() {
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }
}
