//! Handlers for link management and the authoritative listings.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/links` | Body: `{"caregiver_id":"…","patient_id":"…"}`; 201 + link |
//! | `DELETE` | `/links/:caregiver_id/:patient_id` | 204; 404 if no active link |
//! | `GET`    | `/caregivers/:id/patients` | Linked patient ids |
//! | `GET`    | `/patients/:id/caregivers` | Linked caregiver ids |
//!
//! Every route needs a requester on one side of the link: the caregiver for
//! creating and listing patients, the patient for listing caregivers, either
//! of the two for removal. Anyone else gets the uniform 403.

use std::{collections::BTreeSet, sync::Arc};

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use carelink_core::{
  Error,
  model::{AccountId, Role},
  store::SecondaryIndex,
};
use serde::Deserialize;

use crate::{AppState, Authoritative, account_id, error::ApiError, requester::Requester};

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub caregiver_id: String,
  pub patient_id:   String,
}

/// `POST /links`
pub async fn create<S, X>(
  State(state): State<Arc<AppState<S, X>>>,
  requester: Requester,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Authoritative,
  X: SecondaryIndex + 'static,
{
  let caregiver_id = account_id(&body.caregiver_id)?;
  let patient_id = account_id(&body.patient_id)?;
  requester.require(Role::Caregiver, &caregiver_id)?;
  let link = state.links.create(&caregiver_id, &patient_id).await?;
  Ok((StatusCode::CREATED, Json(link)))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /links/:caregiver_id/:patient_id`
pub async fn remove<S, X>(
  State(state): State<Arc<AppState<S, X>>>,
  Path((caregiver_id, patient_id)): Path<(String, String)>,
  requester: Requester,
) -> Result<StatusCode, ApiError>
where
  S: Authoritative,
  X: SecondaryIndex + 'static,
{
  let caregiver_id = account_id(&caregiver_id)?;
  let patient_id = account_id(&patient_id)?;
  if !requester.acts_as(Role::Caregiver, &caregiver_id)
    && !requester.acts_as(Role::Patient, &patient_id)
  {
    return Err(Error::Deny.into());
  }
  state.links.delete(&caregiver_id, &patient_id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Listings ─────────────────────────────────────────────────────────────────

/// `GET /caregivers/:id/patients`
pub async fn patients_of<S, X>(
  State(state): State<Arc<AppState<S, X>>>,
  Path(id): Path<String>,
  requester: Requester,
) -> Result<Json<BTreeSet<AccountId>>, ApiError>
where
  S: Authoritative,
  X: SecondaryIndex + 'static,
{
  let id = account_id(&id)?;
  requester.require(Role::Caregiver, &id)?;
  Ok(Json(state.links.patients_of(&id).await?))
}

/// `GET /patients/:id/caregivers`
pub async fn caregivers_of<S, X>(
  State(state): State<Arc<AppState<S, X>>>,
  Path(id): Path<String>,
  requester: Requester,
) -> Result<Json<BTreeSet<AccountId>>, ApiError>
where
  S: Authoritative,
  X: SecondaryIndex + 'static,
{
  let id = account_id(&id)?;
  requester.require(Role::Patient, &id)?;
  Ok(Json(state.links.caregivers_of(&id).await?))
}
