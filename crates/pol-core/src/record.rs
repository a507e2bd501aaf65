//! Fuel dispensing records — the fundamental unit of the POL store.
//!
//! A record is a flat fact: "X liters dispensed to Y for Z on date D". It has
//! no relationship to other records beyond sharing a fuel-type partition, and
//! no lifecycle states — records are created, edited in place, or deleted.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

// ─── FuelType ────────────────────────────────────────────────────────────────

/// The fuel-type partition a record belongs to. The names are domain codes
/// carried over from the dispensing slips; they are opaque type tags here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
  Adf,
  Xcs,
}

impl FuelType {
  /// The discriminant string used on the wire and in storage.
  /// Must match the `rename_all = "lowercase"` serde tags above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Adf => "adf",
      Self::Xcs => "xcs",
    }
  }
}

impl FromStr for FuelType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "adf" => Ok(Self::Adf),
      "xcs" => Ok(Self::Xcs),
      other => Err(Error::UnknownFuelType(other.to_string())),
    }
  }
}

// ─── FuelRecord ──────────────────────────────────────────────────────────────

/// A persisted dispensing record. All fields besides `record_id` and
/// `fuel_type` are editable via full-field replace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelRecord {
  pub record_id:      Uuid,
  pub fuel_type:      FuelType,
  /// When the dispensing occurred (not when the row was written).
  pub date:           DateTime<Utc>,
  /// External slip/ticket identifier; unique within the fuel-type partition.
  pub control_number: String,
  pub purpose:        String,
  pub received_by:    String,
  /// Quantity dispensed. Assumed non-negative; not enforced.
  pub liters:         f64,
}

// ─── NewFuelRecord ───────────────────────────────────────────────────────────

/// Input to [`crate::store::PolStore::insert_record`] and
/// [`crate::store::PolStore::update_record`]. The `record_id` is assigned by
/// the store; the fuel type comes from the partition being written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFuelRecord {
  pub date:           DateTime<Utc>,
  pub control_number: String,
  pub purpose:        String,
  pub received_by:    String,
  pub liters:         f64,
}

impl NewFuelRecord {
  /// Attach store-assigned identity to produce a persisted record.
  pub fn into_record(self, record_id: Uuid, fuel_type: FuelType) -> FuelRecord {
    FuelRecord {
      record_id,
      fuel_type,
      date:           self.date,
      control_number: self.control_number,
      purpose:        self.purpose,
      received_by:    self.received_by,
      liters:         self.liters,
    }
  }
}
