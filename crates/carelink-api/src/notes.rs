//! Handler for `GET /patients/:id/notes`.
//!
//! The requester comes from the `x-requester-id` / `x-requester-role`
//! headers. Every refusal answers 403 with the same body.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use carelink_core::{model::NoteRecord, store::SecondaryIndex};

use crate::{AppState, Authoritative, error::ApiError, requester::Requester};

/// `GET /patients/:id/notes`, newest first.
pub async fn list<S, X>(
  State(state): State<Arc<AppState<S, X>>>,
  Path(patient_id): Path<String>,
  requester: Requester,
) -> Result<Json<Vec<NoteRecord>>, ApiError>
where
  S: Authoritative,
  X: SecondaryIndex + 'static,
{
  let notes = state.notes.get_notes(requester.access_to(&patient_id)).await?;
  Ok(Json(notes))
}
