//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Rejected operations all produce the same body. The distinct reason has
//! already been logged by the service.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// A mutation or lookup refused by the identity service.
  #[error("rejected: {0}")]
  Rejected(#[from] stamp_core::Error),

  #[error("not found: {0}")]
  NotFound(String),

  /// A read failed in the backend.
  #[error("store error: {0}")]
  Store(#[source] stamp_core::Error),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Rejected(e) => {
        tracing::debug!(kind = e.kind(), "responding with uniform rejection");
        (StatusCode::BAD_REQUEST, "request rejected".to_string())
      }
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "read failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
