//! [`LinkRegistry`]: link creation and removal across both stores.
//!
//! The authoritative [`LinkStore`] always commits first. The [`SecondaryIndex`]
//! is written second:
//!
//! - **create**: if the mirror write fails, the just-created link is deleted
//!   again and the caller sees a single failure. No link may exist in the
//!   authoritative store without its mirror entry.
//! - **delete**: the authoritative removal is the success signal. A failing
//!   unmirror is logged and swallowed; the stale entry authorizes nothing.
//!
//! The create sequence runs on its own tokio task, so it finishes even when
//! the caller stops polling after the authoritative commit.

use std::{collections::BTreeSet, sync::Arc};

use thiserror::Error;

use crate::{
  Error, Result,
  model::{AccountId, Link, PeerIndexEntry},
  store::{LinkStore, SecondaryIndex},
};

/// Internal signal that the mirror write failed after the authoritative commit.
/// Callers only ever see it folded into [`Error::Transient`].
#[derive(Debug, Error)]
#[error("peer index mirror failed; link creation was rolled back")]
pub(crate) struct MirrorInconsistency {
  #[source]
  source: Box<dyn std::error::Error + Send + Sync>,
}

pub struct LinkRegistry<L, X> {
  links: Arc<L>,
  index: Arc<X>,
}

impl<L, X> Clone for LinkRegistry<L, X> {
  fn clone(&self) -> Self {
    Self { links: self.links.clone(), index: self.index.clone() }
  }
}

impl<L, X> LinkRegistry<L, X>
where
  L: LinkStore + 'static,
  X: SecondaryIndex + 'static,
{
  pub fn new(links: Arc<L>, index: Arc<X>) -> Self { Self { links, index } }

  /// Link `caregiver_id` to `patient_id` and mirror the link into the peer
  /// index.
  pub async fn create(
    &self,
    caregiver_id: &AccountId,
    patient_id: &AccountId,
  ) -> Result<Link> {
    if caregiver_id == patient_id {
      return Err(Error::SelfLink);
    }

    let registry = self.clone();
    let (caregiver_id, patient_id) = (caregiver_id.clone(), patient_id.clone());
    tokio::spawn(async move { registry.create_mirrored(&caregiver_id, &patient_id).await })
      .await
      .map_err(Error::transient)?
  }

  async fn create_mirrored(
    &self,
    caregiver_id: &AccountId,
    patient_id: &AccountId,
  ) -> Result<Link> {
    let created = self
      .links
      .create_link(caregiver_id, patient_id)
      .await
      .map_err(Into::into)?;

    let entry = PeerIndexEntry::project(&created);
    if let Err(e) = self.index.mirror(&entry).await {
      tracing::warn!(
        caregiver = %caregiver_id,
        patient = %patient_id,
        error = %e,
        "peer index mirror failed, compensating"
      );
      self.compensate(caregiver_id, patient_id).await;
      return Err(Error::transient(MirrorInconsistency { source: Box::new(e) }));
    }

    tracing::info!(
      link_id = %created.link.link_id,
      caregiver = %caregiver_id,
      patient = %patient_id,
      "link created"
    );
    Ok(created.link)
  }

  async fn compensate(&self, caregiver_id: &AccountId, patient_id: &AccountId) {
    match self.links.delete_link(caregiver_id, patient_id).await {
      Ok(link) => tracing::info!(
        link_id = %link.link_id,
        "compensating delete committed"
      ),
      Err(e) => tracing::error!(
        caregiver = %caregiver_id,
        patient = %patient_id,
        error = %e,
        "compensating delete failed; authoritative link has no mirror entry"
      ),
    }
  }

  /// Remove the link for the pair. Fails with `NotFound(Link)` when no active
  /// link exists.
  pub async fn delete(
    &self,
    caregiver_id: &AccountId,
    patient_id: &AccountId,
  ) -> Result<()> {
    let removed = self
      .links
      .delete_link(caregiver_id, patient_id)
      .await
      .map_err(Into::into)?;

    tracing::info!(link_id = %removed.link_id, "link deleted");

    if let Err(e) = self.index.unmirror(caregiver_id, patient_id).await {
      tracing::warn!(
        caregiver = %caregiver_id,
        patient = %patient_id,
        error = %e,
        "peer index unmirror failed; stale entry left behind"
      );
    }
    Ok(())
  }

  pub async fn exists(
    &self,
    caregiver_id: &AccountId,
    patient_id: &AccountId,
  ) -> Result<bool> {
    self
      .links
      .link_exists(caregiver_id, patient_id)
      .await
      .map_err(Into::into)
  }

  pub async fn patients_of(&self, caregiver_id: &AccountId) -> Result<BTreeSet<AccountId>> {
    self.links.patients_of(caregiver_id).await.map_err(Into::into)
  }

  pub async fn caregivers_of(&self, patient_id: &AccountId) -> Result<BTreeSet<AccountId>> {
    self.links.caregivers_of(patient_id).await.map_err(Into::into)
  }
}
