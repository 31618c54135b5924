//! Error type for `carelink-store-sqlite`.

use carelink_core::Entity;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] carelink_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column held a value the decoder does not understand.
  #[error("corrupt row: {0}")]
  Corrupt(String),

  #[error("{0} not found")]
  NotFound(Entity),

  #[error("caregiver is already linked to this patient")]
  AlreadyLinked,

  #[error("an account cannot be linked to itself")]
  SelfLink,

  /// Enrolling an existing account under a different role.
  #[error("account {0} already exists with another role")]
  RoleChange(String),
}

impl From<Error> for carelink_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(inner) => inner,
      Error::NotFound(entity) => Self::NotFound(entity),
      Error::AlreadyLinked => Self::AlreadyLinked,
      Error::SelfLink => Self::SelfLink,
      Error::RoleChange(id) => {
        Self::Validation(format!("account {id} already exists with another role"))
      }
      other => Self::transient(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
