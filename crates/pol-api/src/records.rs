//! Handlers for `/records/{fuel}` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/records/{fuel}` | Paginated listing; `?page`, `limit`, `sortBy`, `order` |
//! | `POST`   | `/records/{fuel}` | Body: [`NewFuelRecord`]; returns 201 + stored record |
//! | `POST`   | `/records/{fuel}/bulk` | Body: [`BulkBody`]; all-or-nothing |
//! | `PUT`    | `/records/{fuel}/{id}` | Full-field replace |
//! | `DELETE` | `/records/{fuel}/{id}` | Returns 204 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use pol_core::{
  record::{FuelRecord, FuelType, NewFuelRecord},
  store::{PolStore, RecordPage, RecordQuery, SortField, SortOrder},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  /// 1-based page number. Default 1.
  pub page:    Option<u32>,
  /// Page size. Default 25.
  pub limit:   Option<u32>,
  pub sort_by: Option<SortField>,
  pub order:   Option<SortOrder>,
}

impl From<ListParams> for RecordQuery {
  fn from(p: ListParams) -> Self {
    let defaults = Self::default();
    Self {
      sort_by: p.sort_by.unwrap_or(defaults.sort_by),
      order:   p.order.unwrap_or(defaults.order),
      page:    p.page.unwrap_or(defaults.page),
      limit:   p.limit.unwrap_or(defaults.limit),
    }
  }
}

/// `GET /records/{fuel}?page=1&limit=25&sortBy=date&order=asc`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Path(fuel): Path<FuelType>,
  Query(params): Query<ListParams>,
) -> Result<Json<RecordPage>, ApiError>
where
  S: PolStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let page = store
    .list_records(fuel, RecordQuery::from(params))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(page))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /records/{fuel}` — returns 201 + the stored [`FuelRecord`].
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Path(fuel): Path<FuelType>,
  Json(body): Json<NewFuelRecord>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PolStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let record = store
    .insert_record(fuel, body)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(record)))
}

/// JSON body accepted by `POST /records/{fuel}/bulk`.
#[derive(Debug, Deserialize)]
pub struct BulkBody {
  pub records: Vec<NewFuelRecord>,
}

/// `POST /records/{fuel}/bulk` — inserts the whole batch in one transaction.
pub async fn create_bulk<S>(
  State(store): State<Arc<S>>,
  Path(fuel): Path<FuelType>,
  Json(body): Json<BulkBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PolStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.records.is_empty() {
    return Err(ApiError::BadRequest("empty record batch".to_string()));
  }

  let records: Vec<FuelRecord> = store
    .insert_records(fuel, body.records)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(records)))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /records/{fuel}/{id}` — body is the full replacement record.
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path((fuel, id)): Path<(FuelType, Uuid)>,
  Json(body): Json<NewFuelRecord>,
) -> Result<Json<FuelRecord>, ApiError>
where
  S: PolStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let updated = store
    .update_record(fuel, id, body)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("record {id} not found")))?;
  Ok(Json(updated))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /records/{fuel}/{id}` — 204 on success, 404 if absent.
pub async fn delete<S>(
  State(store): State<Arc<S>>,
  Path((fuel, id)): Path<(FuelType, Uuid)>,
) -> Result<StatusCode, ApiError>
where
  S: PolStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let deleted = store
    .delete_record(fuel, id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  if deleted {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("record {id} not found")))
  }
}
