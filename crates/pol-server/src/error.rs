//! Error type for the auth realm and its `IntoResponse` implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("invalid or expired token")]
  InvalidToken,

  #[error("invalid or expired OTP")]
  InvalidOtp,

  #[error("username already exists")]
  UsernameTaken,

  #[error("user not found")]
  UserNotFound,

  #[error("password hashing failed: {0}")]
  Hash(String),

  #[error(transparent)]
  Mail(#[from] crate::mailer::MailError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = match self {
      Error::InvalidCredentials | Error::InvalidToken | Error::InvalidOtp => {
        StatusCode::UNAUTHORIZED
      }
      Error::UsernameTaken => StatusCode::BAD_REQUEST,
      Error::UserNotFound => StatusCode::NOT_FOUND,
      Error::Hash(_) | Error::Mail(_) | Error::Store(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    let body = json!({ "success": false, "message": self.to_string() });
    (status, Json(body)).into_response()
  }
}
