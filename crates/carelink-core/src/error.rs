//! Error taxonomy shared by every CareLink operation.
//!
//! Backends keep their own error types and convert into [`Error`]; callers only
//! ever see the variants below.

use thiserror::Error;

/// The kind of record a [`Error::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Entity {
  Caregiver,
  Patient,
  Link,
  Note,
}

#[derive(Debug, Error)]
pub enum Error {
  /// Missing or malformed identifier, rejected before any store access.
  #[error("invalid request: {0}")]
  Validation(String),

  #[error("{0} not found")]
  NotFound(Entity),

  #[error("caregiver is already linked to this patient")]
  AlreadyLinked,

  #[error("an account cannot be linked to itself")]
  SelfLink,

  /// Uniform authorization refusal. Carries no reason.
  #[error("not permitted")]
  Deny,

  /// One of the stores was unreachable or failed mid-operation.
  #[error("store unavailable: {0}")]
  Transient(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn transient(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Transient(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
