//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use carelink_core::Error;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match &self.0 {
      Error::Validation(_) => StatusCode::BAD_REQUEST,
      Error::NotFound(_) => StatusCode::NOT_FOUND,
      Error::AlreadyLinked => StatusCode::CONFLICT,
      Error::SelfLink => StatusCode::UNPROCESSABLE_ENTITY,
      Error::Deny => StatusCode::FORBIDDEN,
      Error::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self.0 {
      Error::Transient(e) => {
        tracing::error!(error = %e, "request failed on a store error");
        "service unavailable".to_owned()
      }
      other => other.to_string(),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
