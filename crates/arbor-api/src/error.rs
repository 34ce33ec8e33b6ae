//! API error type and [`axum::response::IntoResponse`] implementation.

use arbor_core::Error as CoreError;
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
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Domain(#[from] CoreError),

  #[error("export failed: {0}")]
  Export(String),
}

impl ApiError {
  /// Lift a backend error into the domain taxonomy.
  pub fn store<E: Into<CoreError>>(e: E) -> Self { ApiError::Domain(e.into()) }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
      ApiError::Domain(e) => match e {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::InvalidParent { .. } | CoreError::UnknownParent(_) => {
          StatusCode::UNPROCESSABLE_ENTITY
        }
        CoreError::HasChildren(_)
        | CoreError::AlreadyDeleted(_)
        | CoreError::NoDeletedVersion(_) => StatusCode::CONFLICT,
        CoreError::MalformedTree(_) | CoreError::StorageUnavailable(_) => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let body = match &self {
      ApiError::Domain(CoreError::InvalidParent { sample, .. }) => {
        json!({ "error": self.to_string(), "valid_entities": sample })
      }
      _ => json!({ "error": self.to_string() }),
    };
    (status, Json(body)).into_response()
  }
}
