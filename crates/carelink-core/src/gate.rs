//! [`AccessGate`]: the single decision point for note reads.
//!
//! Access is exactly one hop: a patient reads their own notes, and a caregiver
//! reads a patient's notes iff an active link between the two exists in the
//! authoritative store. The peer index is never consulted here.

use std::sync::Arc;

use crate::{
  Result,
  model::{AccountId, Decision, Identity, Role},
  store::{IdentityProvider, LinkStore},
};

/// The raw inputs of an access check, as received from the caller.
///
/// Any field may be missing; a missing or malformed field always yields
/// [`Decision::Deny`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessRequest<'a> {
  pub requester_id:   Option<&'a str>,
  pub requester_role: Option<Role>,
  pub patient_id:     Option<&'a str>,
}

impl<'a> AccessRequest<'a> {
  pub fn new(requester_id: &'a str, requester_role: Role, patient_id: &'a str) -> Self {
    Self {
      requester_id:   Some(requester_id),
      requester_role: Some(requester_role),
      patient_id:     Some(patient_id),
    }
  }

  /// The validated `(requester, role, patient)` triple, if every field is
  /// present and well-formed.
  pub fn parts(&self) -> Option<(AccountId, Role, AccountId)> {
    let requester = AccountId::parse(self.requester_id?).ok()?;
    let patient = AccountId::parse(self.patient_id?).ok()?;
    Some((requester, self.requester_role?, patient))
  }
}

/// A patient may always read their own notes, and nobody else's.
pub fn patient_verdict(requester: &AccountId, patient: &AccountId) -> Decision {
  if requester == patient { Decision::Permit } else { Decision::Deny }
}

/// A caregiver may read a patient's notes iff both accounts resolved with the
/// expected roles and an active link joins them.
pub fn caregiver_verdict(
  requester: Option<&Identity>,
  patient: Option<&Identity>,
  linked: bool,
) -> Decision {
  match (requester, patient) {
    (Some(c), Some(p)) if c.role == Role::Caregiver && p.role == Role::Patient && linked => {
      Decision::Permit
    }
    _ => Decision::Deny,
  }
}

pub struct AccessGate<I, L> {
  identities: Arc<I>,
  links:      Arc<L>,
}

impl<I, L> Clone for AccessGate<I, L> {
  fn clone(&self) -> Self {
    Self { identities: self.identities.clone(), links: self.links.clone() }
  }
}

impl<I, L> AccessGate<I, L>
where
  I: IdentityProvider,
  L: LinkStore,
{
  pub fn new(identities: Arc<I>, links: Arc<L>) -> Self { Self { identities, links } }

  /// Decide whether the requester may read the target patient's notes.
  ///
  /// Store failures during lookup propagate as `Transient`; they never turn
  /// into a permit.
  pub async fn decide(&self, request: AccessRequest<'_>) -> Result<Decision> {
    let Some((requester, role, patient)) = request.parts() else {
      tracing::debug!("access denied: missing or malformed parameter");
      return Ok(Decision::Deny);
    };

    let decision = match role {
      Role::Patient => patient_verdict(&requester, &patient),
      Role::Caregiver => self.caregiver_decision(&requester, &patient).await?,
    };

    if !decision.is_permit() {
      tracing::debug!(requester = %requester, %role, patient = %patient, "access denied");
    }
    Ok(decision)
  }

  async fn caregiver_decision(
    &self,
    requester: &AccountId,
    patient: &AccountId,
  ) -> Result<Decision> {
    let caregiver_identity = self.identities.resolve(requester).await.map_err(Into::into)?;
    let patient_identity = self.identities.resolve(patient).await.map_err(Into::into)?;

    let roles_match = matches!(
      (&caregiver_identity, &patient_identity),
      (Some(c), Some(p)) if c.role == Role::Caregiver && p.role == Role::Patient
    );
    let linked = if roles_match {
      self.links.link_exists(requester, patient).await.map_err(Into::into)?
    } else {
      false
    };

    Ok(caregiver_verdict(
      caregiver_identity.as_ref(),
      patient_identity.as_ref(),
      linked,
    ))
  }
}
