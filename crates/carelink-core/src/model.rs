//! Domain records: identities, links, peer-index projections and notes.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Longest identifier the identity provider ever issues.
pub const MAX_ACCOUNT_ID_LEN: usize = 128;

/// A stable account identifier issued by the identity provider.
///
/// Always non-empty, at most [`MAX_ACCOUNT_ID_LEN`] characters, and free of
/// whitespace and control characters.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
  pub fn parse(raw: impl Into<String>) -> Result<Self> {
    let raw = raw.into();
    if raw.is_empty() {
      return Err(Error::Validation("account id is empty".to_owned()));
    }
    if raw.chars().count() > MAX_ACCOUNT_ID_LEN {
      return Err(Error::Validation(format!(
        "account id exceeds {MAX_ACCOUNT_ID_LEN} characters"
      )));
    }
    if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
      return Err(Error::Validation(
        "account id contains whitespace or control characters".to_owned(),
      ));
    }
    Ok(Self(raw))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for AccountId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl FromStr for AccountId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

impl TryFrom<String> for AccountId {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { Self::parse(s) }
}

impl From<AccountId> for String {
  fn from(id: AccountId) -> Self { id.0 }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// The two kinds of account this system knows about.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Patient,
  Caregiver,
}

impl Role {
  /// Parse a role string. Unknown values yield `None`, never a default role.
  pub fn parse(s: &str) -> Option<Self> { s.trim().parse().ok() }
}

/// An account as known to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub id:    AccountId,
  pub email: String,
  pub role:  Role,
}

// ─── Links ───────────────────────────────────────────────────────────────────

/// An authorization relationship granting one caregiver read access to one
/// patient's notes. Owned exclusively by the authoritative store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
  pub link_id:      Uuid,
  pub caregiver_id: AccountId,
  pub patient_id:   AccountId,
  pub created_at:   DateTime<Utc>,
  pub active:       bool,
}

/// A freshly committed link together with the identities validated alongside
/// it in the same transaction.
#[derive(Debug, Clone)]
pub struct CreatedLink {
  pub link:      Link,
  pub caregiver: Identity,
  pub patient:   Identity,
}

/// Denormalized copy of a link held by the peer index.
///
/// Written once when the link is created; emails are not refreshed afterwards,
/// so readers must tolerate stale values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerIndexEntry {
  pub caregiver_id:    AccountId,
  pub patient_id:      AccountId,
  pub linked_at:       DateTime<Utc>,
  pub caregiver_email: String,
  pub patient_email:   String,
}

impl PeerIndexEntry {
  pub fn project(created: &CreatedLink) -> Self {
    Self {
      caregiver_id:    created.link.caregiver_id.clone(),
      patient_id:      created.link.patient_id.clone(),
      linked_at:       created.link.created_at,
      caregiver_email: created.caregiver.email.clone(),
      patient_email:   created.patient.email.clone(),
    }
  }
}

// ─── Notes ───────────────────────────────────────────────────────────────────

/// A clinical note. Referenced, never mutated, by the access path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
  pub id:               Uuid,
  pub owner_patient_id: AccountId,
  pub content:          String,
  pub analysis:         Option<String>,
  pub analyzed_at:      Option<DateTime<Utc>>,
  pub created_at:       DateTime<Utc>,
}

// ─── Decisions ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Permit,
  Deny,
}

impl Decision {
  pub fn is_permit(self) -> bool { matches!(self, Self::Permit) }
}
