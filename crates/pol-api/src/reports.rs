//! Handlers for the aggregation endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/records/{fuel}/totals` | Daily/weekly/monthly totals + histograms |
//! | `GET` | `/reports/adf-xcs` | Trailing 12 months, ADF and XCS side by side |
//! | `GET` | `/reports/ground-fuel` | Trailing 12 months of ADF + XCS summed |
//!
//! Every handler runs its report under [`REPORT_TIMEOUT`]. A report either
//! completes whole or fails whole — a timeout or store failure on any
//! underlying query aborts the entire request.

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, extract::{Path, State}};
use chrono::Utc;
use pol_core::{
  record::FuelType,
  report::{self, CombinedMonth, MonthlyBucket, UsageTotals},
  store::PolStore,
};
use serde::Serialize;
use tokio::time::timeout;

use crate::error::ApiError;

/// Upper bound on a single report request against the store.
pub const REPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// `GET /records/{fuel}/totals`
pub async fn totals<S>(
  State(store): State<Arc<S>>,
  Path(fuel): Path<FuelType>,
) -> Result<Json<UsageTotals>, ApiError>
where
  S: PolStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let totals = timeout(
    REPORT_TIMEOUT,
    report::usage_totals(store.as_ref(), fuel, Utc::now()),
  )
  .await
  .map_err(|_| ApiError::Timeout)?
  .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(totals))
}

/// `GET /reports/adf-xcs`
pub async fn adf_xcs<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<CombinedMonth>>, ApiError>
where
  S: PolStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let combined = timeout(
    REPORT_TIMEOUT,
    report::adf_xcs_report(store.as_ref(), Utc::now()),
  )
  .await
  .map_err(|_| ApiError::Timeout)?
  .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(combined))
}

#[derive(Debug, Serialize)]
pub struct GroundFuelResponse {
  pub monthly: Vec<MonthlyBucket>,
}

/// `GET /reports/ground-fuel`
pub async fn ground_fuel<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<GroundFuelResponse>, ApiError>
where
  S: PolStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let monthly = timeout(
    REPORT_TIMEOUT,
    report::ground_fuel_report(store.as_ref(), Utc::now()),
  )
  .await
  .map_err(|_| ApiError::Timeout)?
  .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(GroundFuelResponse { monthly }))
}
