//! [`SqlitePeerIndex`]: the document-style mirror of link existence.
//!
//! Entries are stored as JSON documents in the `caregiverPatientLinks`
//! collection of a generic `documents` table, on a connection entirely separate
//! from [`SqliteRegistry`](crate::SqliteRegistry). Queries filter on document
//! fields with `json_extract`.

use std::{collections::BTreeSet, path::Path};

use carelink_core::{
  model::{AccountId, PeerIndexEntry},
  store::SecondaryIndex,
};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{decode_account_id, encode_uuid},
  schema::{LINKS_COLLECTION, PEER_INDEX_SCHEMA},
};

/// A peer index backed by its own SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqlitePeerIndex {
  conn: tokio_rusqlite::Connection,
}

impl SqlitePeerIndex {
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let index = Self { conn };
    index.init_schema().await?;
    Ok(index)
  }

  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let index = Self { conn };
    index.init_schema().await?;
    Ok(index)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(PEER_INDEX_SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Every document currently held for the pair, decoded.
  pub async fn entries_for(
    &self,
    caregiver_id: &AccountId,
    patient_id: &AccountId,
  ) -> Result<Vec<PeerIndexEntry>> {
    let caregiver_str = caregiver_id.as_str().to_owned();
    let patient_str   = patient_id.as_str().to_owned();

    let bodies: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT body FROM documents
           WHERE collection = ?1
             AND json_extract(body, '$.caregiverId') = ?2
             AND json_extract(body, '$.patientId') = ?3",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![LINKS_COLLECTION, caregiver_str, patient_str],
            |row| row.get(0),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    bodies
      .iter()
      .map(|b| serde_json::from_str(b).map_err(Error::from))
      .collect()
  }

  /// Ids found in `field` of every document whose `key_field` equals `key`.
  async fn project(
    &self,
    key_field: &'static str,
    field: &'static str,
    key: &AccountId,
  ) -> Result<BTreeSet<AccountId>> {
    let key_str = key.as_str().to_owned();

    let raws: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT json_extract(body, ?3) FROM documents
           WHERE collection = ?1 AND json_extract(body, ?2) = ?4",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![LINKS_COLLECTION, key_field, field, key_str],
            |row| row.get(0),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(decode_account_id).collect()
  }
}

impl SecondaryIndex for SqlitePeerIndex {
  type Error = Error;

  async fn mirror(&self, entry: &PeerIndexEntry) -> Result<()> {
    let body          = serde_json::to_string(entry)?;
    let doc_id        = encode_uuid(Uuid::new_v4());
    let caregiver_str = entry.caregiver_id.as_str().to_owned();
    let patient_str   = entry.patient_id.as_str().to_owned();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        // A stale document may survive a failed unmirror; replace it.
        tx.execute(
          "DELETE FROM documents
           WHERE collection = ?1
             AND json_extract(body, '$.caregiverId') = ?2
             AND json_extract(body, '$.patientId') = ?3",
          rusqlite::params![LINKS_COLLECTION, caregiver_str, patient_str],
        )?;
        tx.execute(
          "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3)",
          rusqlite::params![LINKS_COLLECTION, doc_id, body],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn unmirror(&self, caregiver_id: &AccountId, patient_id: &AccountId) -> Result<()> {
    let caregiver_str = caregiver_id.as_str().to_owned();
    let patient_str   = patient_id.as_str().to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM documents
           WHERE collection = ?1
             AND json_extract(body, '$.caregiverId') = ?2
             AND json_extract(body, '$.patientId') = ?3",
          rusqlite::params![LINKS_COLLECTION, caregiver_str, patient_str],
        )?)
      })
      .await?;

    if removed == 0 {
      tracing::debug!(caregiver = %caregiver_id, patient = %patient_id, "no peer index entry to remove");
    }
    Ok(())
  }

  async fn query_by_caregiver(&self, caregiver_id: &AccountId) -> Result<BTreeSet<AccountId>> {
    self.project("$.caregiverId", "$.patientId", caregiver_id).await
  }

  async fn query_by_patient(&self, patient_id: &AccountId) -> Result<BTreeSet<AccountId>> {
    self.project("$.patientId", "$.caregiverId", patient_id).await
  }
}
