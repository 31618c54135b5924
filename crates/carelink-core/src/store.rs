//! Storage and collaborator traits.
//!
//! The authoritative relational store implements [`IdentityProvider`],
//! [`LinkStore`] and [`ClinicalNoteStore`]; the document-oriented mirror
//! implements [`SecondaryIndex`]. Higher layers (`carelink-api`) depend on these
//! abstractions, not on any concrete backend.
//!
//! Every associated error type converts into [`crate::Error`], so the backend
//! decides which of its failures are domain outcomes and which are transient.

use std::{collections::BTreeSet, future::Future};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{AccountId, CreatedLink, Identity, Link, NoteRecord, PeerIndexEntry, Role};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Read access to account records. Consulted, never owned, by this crate.
pub trait IdentityProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  /// Look up an account by id. Returns `None` if it does not exist.
  fn resolve<'a>(
    &'a self,
    id: &'a AccountId,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  /// Case-insensitive substring search over the emails of `role` accounts,
  /// skipping every id in `exclude`. Both filters apply before the `limit`
  /// cut. Only used for non-authorizing listings.
  fn resolve_by_email_fragment<'a>(
    &'a self,
    pattern: &'a str,
    role: Role,
    exclude: &'a BTreeSet<AccountId>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Identity>, Self::Error>> + Send + 'a;
}

// ─── Authoritative links ─────────────────────────────────────────────────────

/// The authoritative record of caregiver/patient links.
///
/// `create_link` and `delete_link` each run as one atomic transaction: either
/// the whole write commits or nothing is observable. Reads see committed
/// state only.
pub trait LinkStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  /// Validate both identities and persist a new active link.
  ///
  /// Fails with `NotFound(Caregiver)` / `NotFound(Patient)` when an id does
  /// not resolve to an account of the expected role, `SelfLink` when both ids
  /// are equal, and `AlreadyLinked` when an active link exists for the pair.
  fn create_link<'a>(
    &'a self,
    caregiver_id: &'a AccountId,
    patient_id: &'a AccountId,
  ) -> impl Future<Output = Result<CreatedLink, Self::Error>> + Send + 'a;

  /// Remove the active link for the pair, returning the removed row.
  /// Fails with `NotFound(Link)` when there is none.
  fn delete_link<'a>(
    &'a self,
    caregiver_id: &'a AccountId,
    patient_id: &'a AccountId,
  ) -> impl Future<Output = Result<Link, Self::Error>> + Send + 'a;

  /// `true` iff an active link exists for the pair.
  fn link_exists<'a>(
    &'a self,
    caregiver_id: &'a AccountId,
    patient_id: &'a AccountId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn patients_of<'a>(
    &'a self,
    caregiver_id: &'a AccountId,
  ) -> impl Future<Output = Result<BTreeSet<AccountId>, Self::Error>> + Send + 'a;

  fn caregivers_of<'a>(
    &'a self,
    patient_id: &'a AccountId,
  ) -> impl Future<Output = Result<BTreeSet<AccountId>, Self::Error>> + Send + 'a;
}

// ─── Mirror ──────────────────────────────────────────────────────────────────

/// The denormalized peer index held in a second, independent store.
///
/// It is a cache of link existence, never a source of truth: nothing that
/// grants access may read it.
pub trait SecondaryIndex: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  /// Store the projection of a just-created link. Replaces any stale entry
  /// left behind for the same pair.
  fn mirror<'a>(
    &'a self,
    entry: &'a PeerIndexEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove every entry for the pair. Removing nothing is not an error.
  fn unmirror<'a>(
    &'a self,
    caregiver_id: &'a AccountId,
    patient_id: &'a AccountId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn query_by_caregiver<'a>(
    &'a self,
    caregiver_id: &'a AccountId,
  ) -> impl Future<Output = Result<BTreeSet<AccountId>, Self::Error>> + Send + 'a;

  fn query_by_patient<'a>(
    &'a self,
    patient_id: &'a AccountId,
  ) -> impl Future<Output = Result<BTreeSet<AccountId>, Self::Error>> + Send + 'a;
}

// ─── Notes ───────────────────────────────────────────────────────────────────

/// The external notes collaborator.
pub trait ClinicalNoteStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  /// All notes owned by `patient_id`, most recent first.
  fn list_by_owner<'a>(
    &'a self,
    patient_id: &'a AccountId,
  ) -> impl Future<Output = Result<Vec<NoteRecord>, Self::Error>> + Send + 'a;

  /// Up to `limit` notes of `patient_id` that have no analysis yet, oldest
  /// first.
  fn list_unanalyzed<'a>(
    &'a self,
    patient_id: &'a AccountId,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<NoteRecord>, Self::Error>> + Send + 'a;

  fn set_analysis(
    &self,
    note_id: Uuid,
    text: String,
    analyzed_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
