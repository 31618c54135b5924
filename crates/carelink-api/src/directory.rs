//! Handler for `GET /caregivers/:id/available-patients[?q=<fragment>]`.
//!
//! Lists patients a caregiver could link to. Only that caregiver may ask.
//! Informational only; the result comes from the peer index and grants
//! nothing.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use carelink_core::{
  model::{Identity, Role},
  store::SecondaryIndex,
};
use serde::Deserialize;

use crate::{AppState, Authoritative, account_id, error::ApiError, requester::Requester};

#[derive(Debug, Deserialize, Default)]
pub struct AvailableParams {
  /// Email fragment; empty or absent lists the first page of patients.
  pub q: Option<String>,
}

pub async fn available<S, X>(
  State(state): State<Arc<AppState<S, X>>>,
  Path(id): Path<String>,
  Query(params): Query<AvailableParams>,
  requester: Requester,
) -> Result<Json<Vec<Identity>>, ApiError>
where
  S: Authoritative,
  X: SecondaryIndex + 'static,
{
  let caregiver_id = account_id(&id)?;
  requester.require(Role::Caregiver, &caregiver_id)?;
  let patients = state
    .directory
    .available_patients(&caregiver_id, params.q.as_deref().unwrap_or_default())
    .await?;
  Ok(Json(patients))
}
