//! JSON REST API for the POL fuel tracker.
//!
//! Exposes an axum [`Router`] backed by any [`pol_core::store::PolStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", pol_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod records;
pub mod reports;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use pol_core::store::PolStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: PolStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Records
    .route(
      "/records/{fuel}",
      get(records::list::<S>).post(records::create::<S>),
    )
    .route("/records/{fuel}/bulk", post(records::create_bulk::<S>))
    .route("/records/{fuel}/totals", get(reports::totals::<S>))
    .route(
      "/records/{fuel}/{id}",
      put(records::update::<S>).delete(records::delete::<S>),
    )
    // Cross-partition reports
    .route("/reports/adf-xcs", get(reports::adf_xcs::<S>))
    .route("/reports/ground-fuel", get(reports::ground_fuel::<S>))
    .with_state(store)
}
