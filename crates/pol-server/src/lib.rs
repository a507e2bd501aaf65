//! POL fuel-usage tracking server.
//!
//! Assembles the record/report API from `pol-api` and the POL auth realm into
//! one axum [`Router`] over any [`PolStore`]. Mutating record routes require a
//! live session token; listing and reports are open reads.

pub mod auth;
pub mod error;
pub mod mailer;
pub mod tokens;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router, middleware,
  routing::{get, post},
};
use pol_core::store::PolStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use mailer::OtpMailer;
use tokens::TokenStore;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// `POL_*` environment.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the auth handlers and the write guard.
///
/// The token store and mailer are injected here so deployments can substitute
/// an external cache or a real mail transport without code changes elsewhere.
#[derive(Clone)]
pub struct AppState<S: PolStore> {
  pub store:  Arc<S>,
  pub tokens: TokenStore,
  pub mailer: Arc<dyn OtpMailer>,
  pub config: Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router: the record/report API under `/api`,
/// with writes gated on a live session, and the auth realm under `/auth`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: PolStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let api = pol_api::api_router(state.store.clone()).layer(
    middleware::from_fn_with_state(
      state.clone(),
      auth::require_session_for_writes::<S>,
    ),
  );

  let auth_routes = Router::new()
    .route("/auth/login", post(auth::login::<S>))
    .route("/auth/verify", get(auth::verify::<S>))
    .route("/auth/create-user", post(auth::create_user::<S>))
    .route("/auth/request-reset", post(auth::request_reset::<S>))
    .route("/auth/reset-password", post(auth::reset_password::<S>))
    .with_state(state);

  Router::new()
    .nest("/api", api)
    .merge(auth_routes)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use pol_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;
  use crate::mailer::{MailError, OtpMailer};

  /// Mailer that records every dispatched code instead of sending it.
  #[derive(Clone, Default)]
  struct CaptureMailer {
    sent: Arc<Mutex<Vec<(String, String)>>>,
  }

  impl OtpMailer for CaptureMailer {
    fn send_otp(&self, to: &str, otp: &str) -> Result<(), MailError> {
      self
        .sent
        .lock()
        .unwrap()
        .push((to.to_string(), otp.to_string()));
      Ok(())
    }
  }

  impl CaptureMailer {
    fn last_otp(&self) -> String {
      self
        .sent
        .lock()
        .unwrap()
        .last()
        .expect("no OTP dispatched")
        .1
        .clone()
    }
  }

  async fn make_state() -> (AppState<SqliteStore>, CaptureMailer) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mailer = CaptureMailer::default();
    let state = AppState {
      store:  Arc::new(store),
      tokens: TokenStore::new(),
      mailer: Arc::new(mailer.clone()),
      config: Arc::new(ServerConfig {
        host:       "127.0.0.1".to_string(),
        port:       4000,
        store_path: PathBuf::from(":memory:"),
      }),
    };
    (state, mailer)
  }

  async fn send(
    state: AppState<SqliteStore>,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder =
        builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
      Some(body) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };

    let response = router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
    // Extractor rejections (e.g. a bad `{fuel}` segment) are plain text.
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
  }

  async fn create_user(state: &AppState<SqliteStore>, username: &str) {
    let (status, _) = send(
      state.clone(),
      "POST",
      "/auth/create-user",
      None,
      Some(json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "password": "hunter2",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
  }

  async fn login(state: &AppState<SqliteStore>, password: &str) -> String {
    let (status, body) = send(
      state.clone(),
      "POST",
      "/auth/login",
      None,
      Some(json!({ "username": "clerk", "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
  }

  fn record_body(control_number: &str, liters: f64) -> Value {
    json!({
      "date": chrono::Utc::now().to_rfc3339(),
      "controlNumber": control_number,
      "purpose": "generator run",
      "receivedBy": "MSgt Cruz",
      "liters": liters,
    })
  }

  // ── Auth realm ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_user_twice_returns_400() {
    let (state, _) = make_state().await;
    create_user(&state, "clerk").await;

    let (status, body) = send(
      state.clone(),
      "POST",
      "/auth/create-user",
      None,
      Some(json!({
        "username": "clerk",
        "email": "clerk@example.com",
        "password": "other",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
  }

  #[tokio::test]
  async fn login_with_wrong_password_returns_401() {
    let (state, _) = make_state().await;
    create_user(&state, "clerk").await;

    let (status, _) = send(
      state,
      "POST",
      "/auth/login",
      None,
      Some(json!({ "username": "clerk", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn login_with_unknown_username_returns_401() {
    let (state, _) = make_state().await;

    let (status, _) = send(
      state,
      "POST",
      "/auth/login",
      None,
      Some(json!({ "username": "nobody", "password": "hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn verify_resolves_live_token_to_user() {
    let (state, _) = make_state().await;
    create_user(&state, "clerk").await;
    let token = login(&state, "hunter2").await;

    let (status, body) =
      send(state, "GET", "/auth/verify", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["user"]["username"], json!("clerk"));
  }

  #[tokio::test]
  async fn verify_with_bad_token_returns_401() {
    let (state, _) = make_state().await;
    let (status, _) =
      send(state, "GET", "/auth/verify", Some("not-a-session"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  // ── Password reset ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn request_reset_for_unknown_user_returns_404() {
    let (state, _) = make_state().await;
    let (status, _) = send(
      state,
      "POST",
      "/auth/request-reset",
      None,
      Some(json!({ "username": "nobody" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn reset_flow_changes_password_and_consumes_otp() {
    let (state, mailer) = make_state().await;
    create_user(&state, "clerk").await;

    let (status, _) = send(
      state.clone(),
      "POST",
      "/auth/request-reset",
      None,
      Some(json!({ "username": "clerk" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let otp = mailer.last_otp();

    // A wrong code fails and leaves the real one usable.
    let (status, _) = send(
      state.clone(),
      "POST",
      "/auth/reset-password",
      None,
      Some(json!({
        "username": "clerk",
        "otp": "000000",
        "newPassword": "correct-horse",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
      state.clone(),
      "POST",
      "/auth/reset-password",
      None,
      Some(json!({
        "username": "clerk",
        "otp": otp,
        "newPassword": "correct-horse",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The consumed code cannot be replayed.
    let (status, _) = send(
      state.clone(),
      "POST",
      "/auth/reset-password",
      None,
      Some(json!({
        "username": "clerk",
        "otp": otp,
        "newPassword": "again",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Old password is dead, new one works.
    let (status, _) = send(
      state.clone(),
      "POST",
      "/auth/login",
      None,
      Some(json!({ "username": "clerk", "password": "hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    login(&state, "correct-horse").await;
  }

  #[tokio::test]
  async fn expired_otp_is_rejected() {
    let (state, mailer) = make_state().await;
    create_user(&state, "clerk").await;

    send(
      state.clone(),
      "POST",
      "/auth/request-reset",
      None,
      Some(json!({ "username": "clerk" })),
    )
    .await;
    let otp = mailer.last_otp();

    // Force the stored code past its lifetime.
    state
      .tokens
      .put(auth::otp_key("clerk"), otp.as_str(), std::time::Duration::ZERO);

    let (status, _) = send(
      state,
      "POST",
      "/auth/reset-password",
      None,
      Some(json!({
        "username": "clerk",
        "otp": otp,
        "newPassword": "correct-horse",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  // ── Write gating ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn record_write_without_token_returns_401() {
    let (state, _) = make_state().await;
    let (status, _) = send(
      state,
      "POST",
      "/api/records/adf",
      None,
      Some(record_body("CN-001", 100.0)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn record_write_with_token_creates_and_open_read_sees_it() {
    let (state, _) = make_state().await;
    create_user(&state, "clerk").await;
    let token = login(&state, "hunter2").await;

    let (status, created) = send(
      state.clone(),
      "POST",
      "/api/records/adf",
      Some(&token),
      Some(record_body("CN-001", 100.0)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["controlNumber"], json!("CN-001"));

    // Listing needs no token.
    let (status, page) =
      send(state, "GET", "/api/records/adf", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["records"].as_array().unwrap().len(), 1);
    assert_eq!(page["totalPages"], json!(1));
    assert_eq!(page["currentPage"], json!(1));
  }

  #[tokio::test]
  async fn record_delete_without_token_returns_401() {
    let (state, _) = make_state().await;
    let id = uuid::Uuid::new_v4();
    let (status, _) = send(
      state,
      "DELETE",
      &format!("/api/records/adf/{id}"),
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn bulk_insert_with_duplicate_inserts_nothing() {
    let (state, _) = make_state().await;
    create_user(&state, "clerk").await;
    let token = login(&state, "hunter2").await;

    let (status, _) = send(
      state.clone(),
      "POST",
      "/api/records/xcs/bulk",
      Some(&token),
      Some(json!({
        "records": [record_body("CN-001", 10.0), record_body("CN-001", 20.0)],
      })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, page) =
      send(state, "GET", "/api/records/xcs", None, None).await;
    assert_eq!(page["records"].as_array().unwrap().len(), 0);
  }

  // ── Reports over HTTP ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn totals_on_empty_store_are_zero_filled() {
    let (state, _) = make_state().await;
    let (status, body) =
      send(state, "GET", "/api/records/adf/totals", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["daily"], json!(0.0));
    assert_eq!(body["weekly"], json!(0.0));
    assert_eq!(body["monthlyTotal"], json!(0.0));
    assert_eq!(body["monthly"].as_array().unwrap().len(), 12);
    assert_eq!(body["quarterly"].as_array().unwrap().len(), 4);
  }

  #[tokio::test]
  async fn combined_reports_pair_and_sum_both_fuel_types() {
    let (state, _) = make_state().await;
    create_user(&state, "clerk").await;
    let token = login(&state, "hunter2").await;

    send(
      state.clone(),
      "POST",
      "/api/records/adf",
      Some(&token),
      Some(record_body("CN-A", 100.0)),
    )
    .await;
    send(
      state.clone(),
      "POST",
      "/api/records/xcs",
      Some(&token),
      Some(record_body("CN-X", 50.0)),
    )
    .await;

    let (status, months) =
      send(state.clone(), "GET", "/api/reports/adf-xcs", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let months = months.as_array().unwrap();
    assert_eq!(months.len(), 12);
    let current = months.last().unwrap();
    assert_eq!(current["adfLiters"], json!(100.0));
    assert_eq!(current["xcsLiters"], json!(50.0));

    let (status, body) =
      send(state, "GET", "/api/reports/ground-fuel", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let monthly = body["monthly"].as_array().unwrap();
    assert_eq!(monthly.len(), 12);
    assert_eq!(monthly.last().unwrap()["totalLiters"], json!(150.0));
  }

  #[tokio::test]
  async fn unknown_fuel_type_in_path_returns_400() {
    let (state, _) = make_state().await;
    let (status, _) =
      send(state, "GET", "/api/records/jp8", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }
}
