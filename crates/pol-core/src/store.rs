//! The `PolStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `pol-store-sqlite`).
//! Higher layers (`pol-api`, `pol-server`) depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error,
  record::{FuelRecord, FuelType, NewFuelRecord},
  user::{NewPolUser, PolUser},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// A sortable record column for [`PolStore::list_records`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
  Date,
  ControlNumber,
  Purpose,
  ReceivedBy,
  Liters,
}

impl FromStr for SortField {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "date" => Ok(Self::Date),
      "controlNumber" => Ok(Self::ControlNumber),
      "purpose" => Ok(Self::Purpose),
      "receivedBy" => Ok(Self::ReceivedBy),
      "liters" => Ok(Self::Liters),
      other => Err(Error::UnknownSortField(other.to_string())),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  Asc,
  Desc,
}

/// Parameters for [`PolStore::list_records`]. Pages are 1-based.
#[derive(Debug, Clone)]
pub struct RecordQuery {
  pub sort_by: SortField,
  pub order:   SortOrder,
  pub page:    u32,
  pub limit:   u32,
}

impl Default for RecordQuery {
  fn default() -> Self {
    Self {
      sort_by: SortField::Date,
      order:   SortOrder::Asc,
      page:    1,
      limit:   25,
    }
  }
}

/// One page of listed records, with enough metadata for a pager UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPage {
  pub records:      Vec<FuelRecord>,
  /// `ceil(total / limit)`; 0 when the partition is empty.
  pub total_pages:  u64,
  pub current_page: u32,
}

// ─── Grouped aggregation rows ────────────────────────────────────────────────

/// One `(year, month)` group-and-sum row, as produced by the backend.
/// `month` is 1–12.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthTotal {
  pub year:         i32,
  pub month:        u32,
  pub total_liters: f64,
}

/// One calendar-quarter group-and-sum row. `quarter` is 1–4 and spans all
/// years in the record set — January of any year lands in quarter 1.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarterTotal {
  pub quarter:      u32,
  pub total_liters: f64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a POL storage backend.
///
/// Fuel records are partitioned by [`FuelType`]; no operation crosses
/// partitions. The aggregation queries are read-only and may be issued in any
/// order — no invariant depends on their relative sequencing.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PolStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Fuel records ──────────────────────────────────────────────────────

  /// Persist a new record in `fuel`'s partition and return it with its
  /// store-assigned id. Fails if the control number is already present in
  /// the partition.
  fn insert_record(
    &self,
    fuel: FuelType,
    input: NewFuelRecord,
  ) -> impl Future<Output = Result<FuelRecord, Self::Error>> + Send + '_;

  /// Bulk insert; all-or-nothing. A duplicate control number anywhere in
  /// the batch (or against existing rows) inserts nothing.
  fn insert_records(
    &self,
    fuel: FuelType,
    inputs: Vec<NewFuelRecord>,
  ) -> impl Future<Output = Result<Vec<FuelRecord>, Self::Error>> + Send + '_;

  /// Retrieve a record by id. Returns `None` if not found in `fuel`'s
  /// partition.
  fn get_record(
    &self,
    fuel: FuelType,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<FuelRecord>, Self::Error>> + Send + '_;

  /// One page of `fuel`'s records, sorted per `query`.
  fn list_records(
    &self,
    fuel: FuelType,
    query: RecordQuery,
  ) -> impl Future<Output = Result<RecordPage, Self::Error>> + Send + '_;

  /// Full-field replace. Returns `None` if the record does not exist.
  fn update_record(
    &self,
    fuel: FuelType,
    id: Uuid,
    input: NewFuelRecord,
  ) -> impl Future<Output = Result<Option<FuelRecord>, Self::Error>> + Send + '_;

  /// Delete a record. Returns `false` if it did not exist.
  fn delete_record(
    &self,
    fuel: FuelType,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Aggregation queries ───────────────────────────────────────────────

  /// Sum of `liters` over records with `date >= since` (inclusive).
  /// An empty match is 0.0, not an error.
  fn sum_liters_since(
    &self,
    fuel: FuelType,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<f64, Self::Error>> + Send + '_;

  /// Group-and-sum `liters` by `(year, month)` of `date`, over the whole
  /// partition. Months with no records are absent from the result.
  fn liters_by_month(
    &self,
    fuel: FuelType,
  ) -> impl Future<Output = Result<Vec<MonthTotal>, Self::Error>> + Send + '_;

  /// Group-and-sum `liters` by calendar quarter (`ceil(month / 3)`), over
  /// the whole partition and across all years.
  fn liters_by_quarter(
    &self,
    fuel: FuelType,
  ) -> impl Future<Output = Result<Vec<QuarterTotal>, Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create and persist a POL user. Fails if the username is taken.
  fn create_user(
    &self,
    input: NewPolUser,
  ) -> impl Future<Output = Result<PolUser, Self::Error>> + Send + '_;

  /// Look up a user by username. Returns `None` if not found.
  fn get_user_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<PolUser>, Self::Error>> + Send + 'a;

  /// Replace a user's password hash. Returns `false` if the user does not
  /// exist.
  fn update_password(
    &self,
    user_id: Uuid,
    password_hash: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
