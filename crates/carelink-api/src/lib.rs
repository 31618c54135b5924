//! JSON REST API for CareLink.
//!
//! Exposes an axum [`Router`] over the core services, backed by any
//! authoritative store `S` and peer index `X`. Requester authentication, TLS
//! and transport concerns are the caller's responsibility; the requester is
//! read from headers set upstream (see [`requester`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", carelink_api::api_router(registry, peer_index))
//! ```

pub mod directory;
pub mod error;
pub mod links;
pub mod notes;
pub mod requester;


use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use carelink_core::{
  directory::PatientDirectory,
  gate::AccessGate,
  model::AccountId,
  notes::NoteAccessService,
  registry::LinkRegistry,
  store::{ClinicalNoteStore, IdentityProvider, LinkStore, SecondaryIndex},
};

pub use error::ApiError;

/// Marker for a backend that serves as the whole authoritative store.
pub trait Authoritative: IdentityProvider + LinkStore + ClinicalNoteStore + 'static {}

impl<T> Authoritative for T where T: IdentityProvider + LinkStore + ClinicalNoteStore + 'static {}

/// The core services every handler draws from.
pub struct AppState<S, X> {
  pub links:     LinkRegistry<S, X>,
  pub notes:     NoteAccessService<S, S, S>,
  pub directory: PatientDirectory<S, X>,
}

impl<S, X> AppState<S, X>
where
  S: Authoritative,
  X: SecondaryIndex + 'static,
{
  pub fn new(store: Arc<S>, index: Arc<X>) -> Self {
    let gate = AccessGate::new(store.clone(), store.clone());
    Self {
      links:     LinkRegistry::new(store.clone(), index.clone()),
      notes:     NoteAccessService::new(gate, store.clone(), store.clone()),
      directory: PatientDirectory::new(store, index),
    }
  }
}

/// Path segment → [`AccountId`], rejecting malformed ids as a validation error.
pub(crate) fn account_id(raw: &str) -> Result<AccountId, ApiError> {
  Ok(AccountId::parse(raw)?)
}

/// Build a fully-materialised API router over `store` and `index`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, X>(store: Arc<S>, index: Arc<X>) -> Router<()>
where
  S: Authoritative,
  X: SecondaryIndex + 'static,
{
  let state = Arc::new(AppState::new(store, index));

  Router::new()
    // Links
    .route("/links", post(links::create::<S, X>))
    .route("/links/{caregiver_id}/{patient_id}", delete(links::remove::<S, X>))
    .route("/caregivers/{id}/patients", get(links::patients_of::<S, X>))
    .route("/patients/{id}/caregivers", get(links::caregivers_of::<S, X>))
    // Directory
    .route(
      "/caregivers/{id}/available-patients",
      get(directory::available::<S, X>),
    )
    // Notes
    .route("/patients/{id}/notes", get(notes::list::<S, X>))
    .with_state(state)
}
