//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Fuel types are stored as
//! their lowercase discriminant. UUIDs are stored as hyphenated lowercase
//! strings.

use std::str::FromStr as _;

use chrono::{DateTime, Utc};
use pol_core::{
  record::{FuelRecord, FuelType},
  user::PolUser,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── FuelType
// ─────────────────────────────────────────────────────────────────

pub fn encode_fuel_type(fuel: FuelType) -> &'static str { fuel.as_str() }

pub fn decode_fuel_type(s: &str) -> Result<FuelType> {
  Ok(FuelType::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `fuel_records` row.
pub struct RawRecord {
  pub record_id:      String,
  pub fuel_type:      String,
  pub date:           String,
  pub control_number: String,
  pub purpose:        String,
  pub received_by:    String,
  pub liters:         f64,
}

impl RawRecord {
  pub fn into_record(self) -> Result<FuelRecord> {
    Ok(FuelRecord {
      record_id:      decode_uuid(&self.record_id)?,
      fuel_type:      decode_fuel_type(&self.fuel_type)?,
      date:           decode_dt(&self.date)?,
      control_number: self.control_number,
      purpose:        self.purpose,
      received_by:    self.received_by,
      liters:         self.liters,
    })
  }
}

/// Raw strings read directly from a `pol_users` row.
pub struct RawUser {
  pub user_id:       String,
  pub username:      String,
  pub email:         String,
  pub password_hash: String,
  pub created_at:    String,
}

impl RawUser {
  pub fn into_user(self) -> Result<PolUser> {
    Ok(PolUser {
      user_id:       decode_uuid(&self.user_id)?,
      username:      self.username,
      email:         self.email,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}
