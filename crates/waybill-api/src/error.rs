//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure is rendered as the same envelope callers get on success,
//! with `success: false` and a human-readable message.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::envelope::Failure;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  /// The request was understood but the shipment's state refuses it.
  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  Internal(String),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<waybill_core::Error> for ApiError {
  fn from(e: waybill_core::Error) -> Self {
    use waybill_core::Error as E;
    match e {
      e if e.is_not_found() => ApiError::NotFound(e.to_string()),
      E::Rejected(r) => ApiError::Conflict(r.to_string()),
      E::InvalidInput(m) => ApiError::BadRequest(m),
      e => ApiError::Internal(e.to_string()),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(r: JsonRejection) -> Self { ApiError::BadRequest(r.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(r: PathRejection) -> Self { ApiError::BadRequest(r.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(r: QueryRejection) -> Self { ApiError::BadRequest(r.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(error = %self, "request failed");
    }
    let body = Failure { success: false, message: self.to_string() };
    (status, Json(body)).into_response()
  }
}
