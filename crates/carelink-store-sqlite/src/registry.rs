//! [`SqliteRegistry`]: the authoritative store.
//!
//! Implements [`IdentityProvider`], [`LinkStore`] and [`ClinicalNoteStore`]
//! over one SQLite file. Link writes validate and insert inside a single
//! `IMMEDIATE` transaction; `tokio_rusqlite` runs each closure to completion on
//! its own thread, so a caller that drops the future mid-flight still leaves
//! the transaction either committed or rolled back.

use std::{collections::BTreeSet, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use carelink_core::{
  Entity,
  model::{AccountId, CreatedLink, Identity, Link, NoteRecord, Role},
  store::{ClinicalNoteStore, IdentityProvider, LinkStore},
};

use crate::{
  Error, Result,
  encode::{
    RawIdentity, RawLink, RawNote, decode_account_id, encode_dt, encode_role, encode_uuid,
    now_micros,
  },
  schema::REGISTRY_SCHEMA,
};

// ─── Transaction outcomes ────────────────────────────────────────────────────

enum CreateOutcome {
  Created { caregiver: RawIdentity, patient: RawIdentity },
  CaregiverMissing,
  PatientMissing,
  AlreadyLinked,
}

enum EnrollOutcome {
  Stored,
  RoleChange,
}

fn select_identity(
  conn: &rusqlite::Connection,
  account_id: &str,
) -> rusqlite::Result<Option<RawIdentity>> {
  conn
    .query_row(
      "SELECT account_id, email, role FROM accounts WHERE account_id = ?1",
      rusqlite::params![account_id],
      RawIdentity::from_row,
    )
    .optional()
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _) if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// The authoritative CareLink store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteRegistry {
  conn: tokio_rusqlite::Connection,
}

impl SqliteRegistry {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, as used by the tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(REGISTRY_SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Register an account, or refresh the email of an existing one.
  ///
  /// Roles are immutable: re-enrolling an id under another role fails with
  /// [`Error::RoleChange`]. Peer index entries keep the email they were
  /// created with.
  pub async fn enroll(&self, identity: Identity) -> Result<Identity> {
    let id_str    = identity.id.as_str().to_owned();
    let email     = identity.email.clone();
    let role_str  = encode_role(identity.role);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(existing) = select_identity(&tx, &id_str)?
          && existing.role != role_str
        {
          return Ok(EnrollOutcome::RoleChange);
        }
        tx.execute(
          "INSERT INTO accounts (account_id, email, role) VALUES (?1, ?2, ?3)
           ON CONFLICT (account_id) DO UPDATE SET email = excluded.email",
          rusqlite::params![id_str, email, role_str],
        )?;
        tx.commit()?;
        Ok(EnrollOutcome::Stored)
      })
      .await?;

    match outcome {
      EnrollOutcome::Stored => {
        tracing::info!(account = %identity.id, role = %identity.role, "account enrolled");
        Ok(identity)
      }
      EnrollOutcome::RoleChange => Err(Error::RoleChange(identity.id.to_string())),
    }
  }

  /// Record a note for an existing patient. Notes are normally written by the
  /// external notes collaborator; this is the seeding path.
  pub async fn add_note(&self, owner: &AccountId, content: impl Into<String>) -> Result<NoteRecord> {
    let note = NoteRecord {
      id:               Uuid::new_v4(),
      owner_patient_id: owner.clone(),
      content:          content.into(),
      analysis:         None,
      analyzed_at:      None,
      created_at:       now_micros(),
    };

    let note_id_str  = encode_uuid(note.id);
    let owner_str    = owner.as_str().to_owned();
    let content      = note.content.clone();
    let created_str  = encode_dt(note.created_at);

    let stored = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let is_patient = select_identity(&tx, &owner_str)?
          .is_some_and(|i| i.role == encode_role(Role::Patient));
        if !is_patient {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO notes (note_id, owner_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![note_id_str, owner_str, content, created_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if stored { Ok(note) } else { Err(Error::NotFound(Entity::Patient)) }
  }

  async fn query_ids(&self, sql: &'static str, key: &AccountId) -> Result<BTreeSet<AccountId>> {
    let key_str = key.as_str().to_owned();

    let raws: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map(rusqlite::params![key_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(decode_account_id).collect()
  }

  async fn query_notes(&self, sql: &'static str, owner: &AccountId, limit: i64) -> Result<Vec<NoteRecord>> {
    let owner_str = owner.as_str().to_owned();

    let raws: Vec<RawNote> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map(rusqlite::params![owner_str, limit], RawNote::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNote::into_note).collect()
  }
}

// ─── IdentityProvider impl ───────────────────────────────────────────────────

impl IdentityProvider for SqliteRegistry {
  type Error = Error;

  async fn resolve(&self, id: &AccountId) -> Result<Option<Identity>> {
    let id_str = id.as_str().to_owned();

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| Ok(select_identity(conn, &id_str)?))
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn resolve_by_email_fragment(
    &self,
    pattern: &str,
    role: Role,
    exclude: &BTreeSet<AccountId>,
    limit: usize,
  ) -> Result<Vec<Identity>> {
    let pattern   = pattern.to_owned();
    let role_str  = encode_role(role);
    let excluded  = serde_json::to_string(exclude)?;
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawIdentity> = self
      .conn
      .call(move |conn| {
        // instr() rather than LIKE so '%' and '_' in the fragment are literal.
        let mut stmt = conn.prepare(
          "SELECT account_id, email, role FROM accounts
           WHERE role = ?2
             AND instr(lower(email), lower(?1)) > 0
             AND account_id NOT IN (SELECT value FROM json_each(?3))
           ORDER BY email, account_id
           LIMIT ?4",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![pattern, role_str, excluded, limit_val],
            RawIdentity::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIdentity::into_identity).collect()
  }
}

// ─── LinkStore impl ──────────────────────────────────────────────────────────

impl LinkStore for SqliteRegistry {
  type Error = Error;

  async fn create_link(&self, caregiver_id: &AccountId, patient_id: &AccountId) -> Result<CreatedLink> {
    if caregiver_id == patient_id {
      return Err(Error::SelfLink);
    }

    let link = Link {
      link_id:      Uuid::new_v4(),
      caregiver_id: caregiver_id.clone(),
      patient_id:   patient_id.clone(),
      created_at:   now_micros(),
      active:       true,
    };

    let link_id_str   = encode_uuid(link.link_id);
    let caregiver_str = caregiver_id.as_str().to_owned();
    let patient_str   = patient_id.as_str().to_owned();
    let at_str        = encode_dt(link.created_at);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(caregiver) = select_identity(&tx, &caregiver_str)?
          .filter(|i| i.role == encode_role(Role::Caregiver))
        else {
          return Ok(CreateOutcome::CaregiverMissing);
        };
        let Some(patient) = select_identity(&tx, &patient_str)?
          .filter(|i| i.role == encode_role(Role::Patient))
        else {
          return Ok(CreateOutcome::PatientMissing);
        };

        let linked: bool = tx
          .query_row(
            "SELECT 1 FROM links WHERE caregiver_id = ?1 AND patient_id = ?2 AND active = 1",
            rusqlite::params![caregiver_str, patient_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if linked {
          return Ok(CreateOutcome::AlreadyLinked);
        }

        match tx.execute(
          "INSERT INTO links (link_id, caregiver_id, patient_id, created_at, active)
           VALUES (?1, ?2, ?3, ?4, 1)",
          rusqlite::params![link_id_str, caregiver_str, patient_str, at_str],
        ) {
          Ok(_) => {}
          Err(e) if is_constraint_violation(&e) => return Ok(CreateOutcome::AlreadyLinked),
          Err(e) => return Err(e.into()),
        }
        tx.commit()?;
        Ok(CreateOutcome::Created { caregiver, patient })
      })
      .await?;

    match outcome {
      CreateOutcome::Created { caregiver, patient } => Ok(CreatedLink {
        link,
        caregiver: caregiver.into_identity()?,
        patient: patient.into_identity()?,
      }),
      CreateOutcome::CaregiverMissing => Err(Error::NotFound(Entity::Caregiver)),
      CreateOutcome::PatientMissing => Err(Error::NotFound(Entity::Patient)),
      CreateOutcome::AlreadyLinked => Err(Error::AlreadyLinked),
    }
  }

  async fn delete_link(&self, caregiver_id: &AccountId, patient_id: &AccountId) -> Result<Link> {
    let caregiver_str = caregiver_id.as_str().to_owned();
    let patient_str   = patient_id.as_str().to_owned();

    let removed: Option<RawLink> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(raw) = tx
          .query_row(
            "SELECT link_id, caregiver_id, patient_id, created_at, active FROM links
             WHERE caregiver_id = ?1 AND patient_id = ?2 AND active = 1",
            rusqlite::params![caregiver_str, patient_str],
            RawLink::from_row,
          )
          .optional()?
        else {
          return Ok(None);
        };
        tx.execute("DELETE FROM links WHERE link_id = ?1", rusqlite::params![raw.link_id])?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    removed
      .ok_or(Error::NotFound(Entity::Link))?
      .into_link()
  }

  async fn link_exists(&self, caregiver_id: &AccountId, patient_id: &AccountId) -> Result<bool> {
    let caregiver_str = caregiver_id.as_str().to_owned();
    let patient_str   = patient_id.as_str().to_owned();

    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM links WHERE caregiver_id = ?1 AND patient_id = ?2 AND active = 1",
              rusqlite::params![caregiver_str, patient_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }

  async fn patients_of(&self, caregiver_id: &AccountId) -> Result<BTreeSet<AccountId>> {
    self
      .query_ids(
        "SELECT patient_id FROM links WHERE caregiver_id = ?1 AND active = 1",
        caregiver_id,
      )
      .await
  }

  async fn caregivers_of(&self, patient_id: &AccountId) -> Result<BTreeSet<AccountId>> {
    self
      .query_ids(
        "SELECT caregiver_id FROM links WHERE patient_id = ?1 AND active = 1",
        patient_id,
      )
      .await
  }
}

// ─── ClinicalNoteStore impl ──────────────────────────────────────────────────

impl ClinicalNoteStore for SqliteRegistry {
  type Error = Error;

  async fn list_by_owner(&self, patient_id: &AccountId) -> Result<Vec<NoteRecord>> {
    self
      .query_notes(
        "SELECT note_id, owner_id, content, analysis, analyzed_at, created_at FROM notes
         WHERE owner_id = ?1
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?2",
        patient_id,
        -1,
      )
      .await
  }

  async fn list_unanalyzed(&self, patient_id: &AccountId, limit: usize) -> Result<Vec<NoteRecord>> {
    self
      .query_notes(
        "SELECT note_id, owner_id, content, analysis, analyzed_at, created_at FROM notes
         WHERE owner_id = ?1 AND analysis IS NULL AND content != ''
         ORDER BY created_at ASC, rowid ASC
         LIMIT ?2",
        patient_id,
        i64::try_from(limit).unwrap_or(i64::MAX),
      )
      .await
  }

  async fn set_analysis(&self, note_id: Uuid, text: String, analyzed_at: DateTime<Utc>) -> Result<()> {
    let note_id_str = encode_uuid(note_id);
    let at_str      = encode_dt(analyzed_at);

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE notes SET analysis = ?2, analyzed_at = ?3 WHERE note_id = ?1",
          rusqlite::params![note_id_str, text, at_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::NotFound(Entity::Note));
    }
    Ok(())
  }
}
