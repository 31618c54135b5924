//! [`NoteAccessService`]: authorized note reads.

use std::sync::Arc;

use crate::{
  Entity, Error, Result,
  gate::{AccessGate, AccessRequest},
  model::{Decision, NoteRecord, Role},
  store::{ClinicalNoteStore, IdentityProvider, LinkStore},
};

pub struct NoteAccessService<I, L, N> {
  gate:       AccessGate<I, L>,
  identities: Arc<I>,
  notes:      Arc<N>,
}

impl<I, L, N> Clone for NoteAccessService<I, L, N> {
  fn clone(&self) -> Self {
    Self {
      gate:       self.gate.clone(),
      identities: self.identities.clone(),
      notes:      self.notes.clone(),
    }
  }
}

impl<I, L, N> NoteAccessService<I, L, N>
where
  I: IdentityProvider,
  L: LinkStore,
  N: ClinicalNoteStore,
{
  pub fn new(gate: AccessGate<I, L>, identities: Arc<I>, notes: Arc<N>) -> Self {
    Self { gate, identities, notes }
  }

  /// Return every note of the target patient, most recent first.
  ///
  /// The notes store is not touched unless the gate permits, so a denied
  /// caller cannot tell a patient with notes from one without.
  pub async fn get_notes(&self, request: AccessRequest<'_>) -> Result<Vec<NoteRecord>> {
    if self.gate.decide(request).await? == Decision::Deny {
      return Err(Error::Deny);
    }
    let Some((_, _, patient_id)) = request.parts() else {
      return Err(Error::Deny);
    };

    let patient = self.identities.resolve(&patient_id).await.map_err(Into::into)?;
    if !patient.is_some_and(|p| p.role == Role::Patient) {
      return Err(Error::NotFound(Entity::Patient));
    }

    let mut notes = self.notes.list_by_owner(&patient_id).await.map_err(Into::into)?;
    notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(notes)
  }
}
