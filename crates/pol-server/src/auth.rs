//! The POL auth realm: JSON login, bearer-token sessions, and OTP-based
//! password reset.
//!
//! Sessions and reset codes live in the injected [`TokenStore`], never in
//! module state. Passwords are argon2 PHC strings verified against the user
//! store.

use std::time::Duration;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  Json,
  extract::{FromRequestParts, Request, State},
  http::{HeaderMap, StatusCode, header, request::Parts},
  middleware::Next,
  response::{IntoResponse, Response},
};
use pol_core::{store::PolStore, user::NewPolUser};
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::Error, tokens::TokenStore};

/// How long a login session stays valid.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// How long a password-reset code stays valid.
pub const OTP_TTL: Duration = Duration::from_secs(5 * 60);

fn session_key(token: &str) -> String { format!("session:{token}") }

pub(crate) fn otp_key(username: &str) -> String { format!("otp:{username}") }

// ─── Passwords and codes ─────────────────────────────────────────────────────

/// Hash a plaintext password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Hash(e.to_string()))
}

fn verify_password(password: &str, phc: &str) -> Result<(), Error> {
  let parsed = PasswordHash::new(phc).map_err(|_| Error::InvalidCredentials)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .map_err(|_| Error::InvalidCredentials)
}

/// Six random decimal digits.
fn generate_otp() -> String {
  let n = OsRng.next_u32() % 900_000 + 100_000;
  n.to_string()
}

// ─── Sessions ────────────────────────────────────────────────────────────────

/// Resolve the bearer token in `headers` to the username it was issued for.
fn session_username(
  headers: &HeaderMap,
  tokens: &TokenStore,
) -> Result<String, Error> {
  let token = headers
    .get(header::AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.strip_prefix("Bearer "))
    .ok_or(Error::InvalidToken)?;
  tokens.get(&session_key(token)).ok_or(Error::InvalidToken)
}

/// Extractor: present in a handler's signature means the request carried a
/// live session token.
pub struct Session {
  pub username: String,
}

impl<S> FromRequestParts<AppState<S>> for Session
where
  S: PolStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let username = session_username(&parts.headers, &state.tokens)?;
    Ok(Session { username })
  }
}

/// Middleware gating mutating methods on a live session. Reads pass through
/// unauthenticated.
pub async fn require_session_for_writes<S>(
  State(state): State<AppState<S>>,
  req: Request,
  next: Next,
) -> Response
where
  S: PolStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let read_only =
    matches!(req.method().as_str(), "GET" | "HEAD" | "OPTIONS");
  if !read_only
    && let Err(e) = session_username(req.headers(), &state.tokens)
  {
    return e.into_response();
  }
  next.run(req).await
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
  pub success: bool,
  pub token:   String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
  pub success: bool,
  pub message: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
  pub success: bool,
  pub user:    UserInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
  pub id:       Uuid,
  pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
  pub username: String,
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RequestResetBody {
  pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordBody {
  pub username:     String,
  pub otp:          String,
  pub new_password: String,
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `POST /auth/login` — issue an opaque session token.
///
/// Unknown usernames and wrong passwords are indistinguishable to the caller.
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<LoginResponse>, Error>
where
  S: PolStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let user = state
    .store
    .get_user_by_username(&body.username)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .ok_or(Error::InvalidCredentials)?;

  verify_password(&body.password, &user.password_hash)?;

  let token = Uuid::new_v4().to_string();
  state
    .tokens
    .put(session_key(&token), user.username.as_str(), SESSION_TTL);

  tracing::info!(username = %user.username, "login");
  Ok(Json(LoginResponse { success: true, token }))
}

/// `GET /auth/verify` — resolve the bearer token to its user.
pub async fn verify<S>(
  session: Session,
  State(state): State<AppState<S>>,
) -> Result<Json<VerifyResponse>, Error>
where
  S: PolStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let user = state
    .store
    .get_user_by_username(&session.username)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .ok_or(Error::InvalidToken)?;

  Ok(Json(VerifyResponse {
    success: true,
    user:    UserInfo { id: user.user_id, username: user.username },
  }))
}

/// `POST /auth/create-user` — open to unauthenticated callers.
pub async fn create_user<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CreateUserBody>,
) -> Result<impl IntoResponse, Error>
where
  S: PolStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if state
    .store
    .get_user_by_username(&body.username)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .is_some()
  {
    return Err(Error::UsernameTaken);
  }

  let password_hash = hash_password(&body.password)?;
  let user = state
    .store
    .create_user(NewPolUser {
      username: body.username,
      email: body.email,
      password_hash,
    })
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  tracing::info!(username = %user.username, "user created");
  Ok((
    StatusCode::CREATED,
    Json(MessageResponse {
      success: true,
      message: "user created".to_string(),
    }),
  ))
}

/// `POST /auth/request-reset` — issue a reset code and mail it to the user's
/// registered address.
pub async fn request_reset<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<RequestResetBody>,
) -> Result<Json<MessageResponse>, Error>
where
  S: PolStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let user = state
    .store
    .get_user_by_username(&body.username)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .ok_or(Error::UserNotFound)?;

  let otp = generate_otp();
  state.tokens.put(otp_key(&user.username), otp.as_str(), OTP_TTL);
  state.mailer.send_otp(&user.email, &otp)?;

  tracing::info!(username = %user.username, "password-reset code issued");
  Ok(Json(MessageResponse {
    success: true,
    message: "OTP sent to registered email".to_string(),
  }))
}

/// `POST /auth/reset-password` — verify and consume the reset code, then
/// replace the stored hash.
///
/// The code is consumed only on success; a mistyped code leaves it valid for
/// another attempt within its lifetime.
pub async fn reset_password<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<ResetPasswordBody>,
) -> Result<Json<MessageResponse>, Error>
where
  S: PolStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let user = state
    .store
    .get_user_by_username(&body.username)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .ok_or(Error::InvalidOtp)?;

  let stored = state
    .tokens
    .get(&otp_key(&user.username))
    .ok_or(Error::InvalidOtp)?;
  if stored != body.otp {
    return Err(Error::InvalidOtp);
  }

  let password_hash = hash_password(&body.new_password)?;
  let changed = state
    .store
    .update_password(user.user_id, password_hash)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  if !changed {
    return Err(Error::UserNotFound);
  }

  state.tokens.take(&otp_key(&user.username));

  tracing::info!(username = %user.username, "password reset");
  Ok(Json(MessageResponse {
    success: true,
    message: "password changed".to_string(),
  }))
}
