//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use insure_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by a service or handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// Missing or rejected Basic credentials.
  #[error("authentication required")]
  Unauthenticated,
}

impl ApiError {
  /// Box an infrastructure error from a store or identity provider.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Core(e) => match e {
        CoreError::Validation(_)
        | CoreError::InvalidToken
        | CoreError::InvalidCredentials => StatusCode::BAD_REQUEST,
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::Unauthorized => StatusCode::UNAUTHORIZED,
        CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
        CoreError::ConcurrencyConflict { .. }
        | CoreError::ReferentialIntegrity { .. }
        | CoreError::EmailTaken(_) => StatusCode::CONFLICT,
        CoreError::Notification { .. } => StatusCode::INTERNAL_SERVER_ERROR,
      },
      Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      Self::Unauthenticated => StatusCode::UNAUTHORIZED,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status == StatusCode::INTERNAL_SERVER_ERROR {
      tracing::error!(error = %self, "request failed");
    }

    let body = match &self {
      Self::Core(CoreError::Validation(fields)) => {
        json!({ "error": self.to_string(), "fields": fields })
      }
      _ => json!({ "error": self.to_string() }),
    };

    let mut res = (status, Json(body)).into_response();
    if matches!(self, Self::Unauthenticated) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"insure\""),
      );
    }
    res
  }
}
