//! The requester asserted by the upstream identity layer.
//!
//! Extraction never rejects: absent or unreadable headers become `None`.
//! Note reads hand them to the access gate; the link routes require the
//! requester to be one side of the link (see [`Requester::require`]).

use std::convert::Infallible;

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use carelink_core::{
  Error,
  gate::AccessRequest,
  model::{AccountId, Role},
};

pub const REQUESTER_ID_HEADER: &str = "x-requester-id";
pub const REQUESTER_ROLE_HEADER: &str = "x-requester-role";

#[derive(Debug, Clone, Default)]
pub struct Requester {
  pub id:   Option<String>,
  pub role: Option<Role>,
}

impl Requester {
  pub fn from_headers(headers: &HeaderMap) -> Self {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    Self {
      id:   header(REQUESTER_ID_HEADER).map(str::to_owned),
      role: header(REQUESTER_ROLE_HEADER).and_then(Role::parse),
    }
  }

  /// `true` iff the requester asserts `role` and is `account` itself.
  pub fn acts_as(&self, role: Role, account: &AccountId) -> bool {
    self.role == Some(role) && self.id.as_deref() == Some(account.as_str())
  }

  /// Uniform [`Error::Deny`] unless the requester [acts as](Self::acts_as)
  /// `account` in `role`.
  pub fn require(&self, role: Role, account: &AccountId) -> Result<(), Error> {
    if self.acts_as(role, account) {
      return Ok(());
    }
    tracing::debug!(requester = ?self.id, %role, account = %account, "request denied");
    Err(Error::Deny)
  }

  /// The gate input for this requester reading `patient_id`'s data.
  pub fn access_to<'a>(&'a self, patient_id: &'a str) -> AccessRequest<'a> {
    AccessRequest {
      requester_id:   self.id.as_deref(),
      requester_role: self.role,
      patient_id:     Some(patient_id),
    }
  }
}

impl<S> FromRequestParts<S> for Requester
where
  S: Send + Sync,
{
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    Ok(Self::from_headers(&parts.headers))
  }
}
