//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`
//! suffix) so that text ordering matches time ordering. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use carelink_core::model::{AccountId, Identity, Link, NoteRecord, Role};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Drop sub-microsecond precision so a value survives a round trip through
/// [`encode_dt`] unchanged.
pub fn now_micros() -> DateTime<Utc> {
  let now = Utc::now();
  DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

// ─── AccountId / Role ─────────────────────────────────────────────────────────

pub fn decode_account_id(s: String) -> Result<AccountId> {
  AccountId::parse(s).map_err(|e| Error::Corrupt(e.to_string()))
}

pub fn encode_role(r: Role) -> &'static str {
  match r {
    Role::Patient => "patient",
    Role::Caregiver => "caregiver",
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  Role::parse(s).ok_or_else(|| Error::Corrupt(format!("unknown role: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `accounts` row.
pub struct RawIdentity {
  pub account_id: String,
  pub email:      String,
  pub role:       String,
}

impl RawIdentity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id: row.get(0)?,
      email:      row.get(1)?,
      role:       row.get(2)?,
    })
  }

  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      role:  decode_role(&self.role)?,
      id:    decode_account_id(self.account_id)?,
      email: self.email,
    })
  }
}

/// Raw strings read directly from a `links` row.
pub struct RawLink {
  pub link_id:      String,
  pub caregiver_id: String,
  pub patient_id:   String,
  pub created_at:   String,
  pub active:       bool,
}

impl RawLink {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      link_id:      row.get(0)?,
      caregiver_id: row.get(1)?,
      patient_id:   row.get(2)?,
      created_at:   row.get(3)?,
      active:       row.get(4)?,
    })
  }

  pub fn into_link(self) -> Result<Link> {
    Ok(Link {
      link_id:      decode_uuid(&self.link_id)?,
      caregiver_id: decode_account_id(self.caregiver_id)?,
      patient_id:   decode_account_id(self.patient_id)?,
      created_at:   decode_dt(&self.created_at)?,
      active:       self.active,
    })
  }
}

/// Raw strings read directly from a `notes` row.
pub struct RawNote {
  pub note_id:     String,
  pub owner_id:    String,
  pub content:     String,
  pub analysis:    Option<String>,
  pub analyzed_at: Option<String>,
  pub created_at:  String,
}

impl RawNote {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      note_id:     row.get(0)?,
      owner_id:    row.get(1)?,
      content:     row.get(2)?,
      analysis:    row.get(3)?,
      analyzed_at: row.get(4)?,
      created_at:  row.get(5)?,
    })
  }

  pub fn into_note(self) -> Result<NoteRecord> {
    Ok(NoteRecord {
      id:               decode_uuid(&self.note_id)?,
      owner_patient_id: decode_account_id(self.owner_id)?,
      content:          self.content,
      analysis:         self.analysis,
      analyzed_at:      self.analyzed_at.as_deref().map(decode_dt).transpose()?,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}
