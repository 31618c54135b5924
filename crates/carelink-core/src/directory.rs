//! [`PatientDirectory`]: the "available patients to link" listing.
//!
//! Purely informational. It reads the peer index for convenience and must never
//! be used to grant access.

use std::sync::Arc;

use crate::{
  Result,
  model::{AccountId, Identity, Role},
  store::{IdentityProvider, SecondaryIndex},
};

/// Maximum number of patients a single search returns.
pub const SEARCH_RESULT_CAP: usize = 20;

pub struct PatientDirectory<I, X> {
  identities: Arc<I>,
  index:      Arc<X>,
}

impl<I, X> Clone for PatientDirectory<I, X> {
  fn clone(&self) -> Self {
    Self { identities: self.identities.clone(), index: self.index.clone() }
  }
}

impl<I, X> PatientDirectory<I, X>
where
  I: IdentityProvider,
  X: SecondaryIndex,
{
  pub fn new(identities: Arc<I>, index: Arc<X>) -> Self { Self { identities, index } }

  /// Patients whose email contains `fragment` and who are not yet linked to
  /// `caregiver_id` according to the peer index.
  pub async fn available_patients(
    &self,
    caregiver_id: &AccountId,
    fragment: &str,
  ) -> Result<Vec<Identity>> {
    let already_linked = self
      .index
      .query_by_caregiver(caregiver_id)
      .await
      .map_err(Into::into)?;

    self
      .identities
      .resolve_by_email_fragment(fragment.trim(), Role::Patient, &already_linked, SEARCH_RESULT_CAP)
      .await
      .map_err(Into::into)
  }
}
