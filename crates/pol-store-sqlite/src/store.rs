//! [`SqliteStore`] — the SQLite implementation of [`PolStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use pol_core::{
  record::{FuelRecord, FuelType, NewFuelRecord},
  store::{
    MonthTotal, PolStore, QuarterTotal, RecordPage, RecordQuery, SortField,
    SortOrder,
  },
  user::{NewPolUser, PolUser},
};

use crate::{
  Error, Result,
  encode::{RawRecord, RawUser, encode_dt, encode_fuel_type, encode_uuid},
  schema::SCHEMA,
};

const RECORD_COLUMNS: &str =
  "record_id, fuel_type, date, control_number, purpose, received_by, liters";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A POL store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Error mapping ───────────────────────────────────────────────────────────

/// Whether a call failed on a UNIQUE constraint (duplicate control number or
/// username), as opposed to a genuine database failure.
fn is_unique_violation(err: &tokio_rusqlite::Error) -> bool {
  matches!(
    err,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _))
      if e.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

fn is_rusqlite_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

// ─── Sorting ─────────────────────────────────────────────────────────────────

/// Column whitelist for ORDER BY — sort input never reaches SQL as raw text.
fn sort_column(field: SortField) -> &'static str {
  match field {
    SortField::Date => "date",
    SortField::ControlNumber => "control_number",
    SortField::Purpose => "purpose",
    SortField::ReceivedBy => "received_by",
    SortField::Liters => "liters",
  }
}

fn sort_direction(order: SortOrder) -> &'static str {
  match order {
    SortOrder::Asc => "ASC",
    SortOrder::Desc => "DESC",
  }
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
  Ok(RawRecord {
    record_id:      row.get(0)?,
    fuel_type:      row.get(1)?,
    date:           row.get(2)?,
    control_number: row.get(3)?,
    purpose:        row.get(4)?,
    received_by:    row.get(5)?,
    liters:         row.get(6)?,
  })
}

// ─── PolStore impl ───────────────────────────────────────────────────────────

impl PolStore for SqliteStore {
  type Error = Error;

  // ── Fuel records ──────────────────────────────────────────────────────────

  async fn insert_record(
    &self,
    fuel: FuelType,
    input: NewFuelRecord,
  ) -> Result<FuelRecord> {
    let record = input.into_record(Uuid::new_v4(), fuel);

    let id_str        = encode_uuid(record.record_id);
    let fuel_str      = encode_fuel_type(fuel).to_owned();
    let date_str      = encode_dt(record.date);
    let control       = record.control_number.clone();
    let purpose       = record.purpose.clone();
    let received_by   = record.received_by.clone();
    let liters        = record.liters;

    let control_for_err = record.control_number.clone();

    let result = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO fuel_records (
             record_id, fuel_type, date, control_number, purpose,
             received_by, liters
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            fuel_str,
            date_str,
            control,
            purpose,
            received_by,
            liters,
          ],
        )?;
        Ok(())
      })
      .await;

    match result {
      Ok(()) => Ok(record),
      Err(e) if is_unique_violation(&e) => {
        Err(Error::DuplicateControlNumber(control_for_err))
      }
      Err(e) => Err(Error::Database(e)),
    }
  }

  async fn insert_records(
    &self,
    fuel: FuelType,
    inputs: Vec<NewFuelRecord>,
  ) -> Result<Vec<FuelRecord>> {
    let records: Vec<FuelRecord> = inputs
      .into_iter()
      .map(|input| input.into_record(Uuid::new_v4(), fuel))
      .collect();

    let to_insert = records.clone();

    // Inner Err carries the offending control number; the transaction rolls
    // back on drop, so a failed batch inserts nothing.
    let outcome: std::result::Result<(), String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for record in &to_insert {
          let inserted = tx.execute(
            "INSERT INTO fuel_records (
               record_id, fuel_type, date, control_number, purpose,
               received_by, liters
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
              encode_uuid(record.record_id),
              encode_fuel_type(record.fuel_type),
              encode_dt(record.date),
              record.control_number,
              record.purpose,
              record.received_by,
              record.liters,
            ],
          );
          match inserted {
            Ok(_) => {}
            Err(e) if is_rusqlite_unique_violation(&e) => {
              return Ok(Err(record.control_number.clone()));
            }
            Err(e) => return Err(e.into()),
          }
        }
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    match outcome {
      Ok(()) => Ok(records),
      Err(control_number) => Err(Error::DuplicateControlNumber(control_number)),
    }
  }

  async fn get_record(
    &self,
    fuel: FuelType,
    id: Uuid,
  ) -> Result<Option<FuelRecord>> {
    let id_str   = encode_uuid(id);
    let fuel_str = encode_fuel_type(fuel).to_owned();

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {RECORD_COLUMNS} FROM fuel_records
                 WHERE record_id = ?1 AND fuel_type = ?2"
              ),
              rusqlite::params![id_str, fuel_str],
              record_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn list_records(
    &self,
    fuel: FuelType,
    query: RecordQuery,
  ) -> Result<RecordPage> {
    let fuel_str = encode_fuel_type(fuel).to_owned();
    let column   = sort_column(query.sort_by);
    let dir      = sort_direction(query.order);

    // A zero limit would divide by zero below; a zero page would underflow.
    let limit  = i64::from(query.limit.max(1));
    let page   = query.page.max(1);
    let offset = i64::from(page - 1) * limit;

    let (raws, total): (Vec<RawRecord>, i64) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          "SELECT COUNT(*) FROM fuel_records WHERE fuel_type = ?1",
          rusqlite::params![fuel_str],
          |row| row.get(0),
        )?;

        let sql = format!(
          "SELECT {RECORD_COLUMNS} FROM fuel_records
           WHERE fuel_type = ?1
           ORDER BY {column} {dir}
           LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![fuel_str, limit, offset],
            record_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((rows, total))
      })
      .await?;

    let records = raws
      .into_iter()
      .map(RawRecord::into_record)
      .collect::<Result<Vec<_>>>()?;

    let total = total.max(0) as u64;
    let total_pages = total.div_ceil(limit as u64);

    Ok(RecordPage {
      records,
      total_pages,
      current_page: page,
    })
  }

  async fn update_record(
    &self,
    fuel: FuelType,
    id: Uuid,
    input: NewFuelRecord,
  ) -> Result<Option<FuelRecord>> {
    let updated = input.into_record(id, fuel);

    let id_str      = encode_uuid(id);
    let fuel_str    = encode_fuel_type(fuel).to_owned();
    let date_str    = encode_dt(updated.date);
    let control     = updated.control_number.clone();
    let purpose     = updated.purpose.clone();
    let received_by = updated.received_by.clone();
    let liters      = updated.liters;

    let control_for_err = updated.control_number.clone();

    let result = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE fuel_records
           SET date = ?1, control_number = ?2, purpose = ?3,
               received_by = ?4, liters = ?5
           WHERE record_id = ?6 AND fuel_type = ?7",
          rusqlite::params![
            date_str,
            control,
            purpose,
            received_by,
            liters,
            id_str,
            fuel_str,
          ],
        )?;
        Ok(changed)
      })
      .await;

    match result {
      Ok(0) => Ok(None),
      Ok(_) => Ok(Some(updated)),
      Err(e) if is_unique_violation(&e) => {
        Err(Error::DuplicateControlNumber(control_for_err))
      }
      Err(e) => Err(Error::Database(e)),
    }
  }

  async fn delete_record(&self, fuel: FuelType, id: Uuid) -> Result<bool> {
    let id_str   = encode_uuid(id);
    let fuel_str = encode_fuel_type(fuel).to_owned();

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM fuel_records WHERE record_id = ?1 AND fuel_type = ?2",
          rusqlite::params![id_str, fuel_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  // ── Aggregation queries ───────────────────────────────────────────────────

  async fn sum_liters_since(
    &self,
    fuel: FuelType,
    since: DateTime<Utc>,
  ) -> Result<f64> {
    let fuel_str  = encode_fuel_type(fuel).to_owned();
    let since_str = encode_dt(since);

    let total: f64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COALESCE(SUM(liters), 0.0) FROM fuel_records
           WHERE fuel_type = ?1 AND date >= ?2",
          rusqlite::params![fuel_str, since_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(total)
  }

  async fn liters_by_month(&self, fuel: FuelType) -> Result<Vec<MonthTotal>> {
    let fuel_str = encode_fuel_type(fuel).to_owned();

    let groups = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT CAST(strftime('%Y', date) AS INTEGER) AS year,
                  CAST(strftime('%m', date) AS INTEGER) AS month,
                  SUM(liters)
           FROM fuel_records
           WHERE fuel_type = ?1
           GROUP BY year, month",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![fuel_str], |row| {
            Ok(MonthTotal {
              year:         row.get(0)?,
              month:        row.get(1)?,
              total_liters: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(groups)
  }

  async fn liters_by_quarter(
    &self,
    fuel: FuelType,
  ) -> Result<Vec<QuarterTotal>> {
    let fuel_str = encode_fuel_type(fuel).to_owned();

    // Quarter = ceil(month / 3) in integer arithmetic. Grouping ignores the
    // year entirely, so the buckets accumulate across all years in the
    // partition.
    let groups = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT (CAST(strftime('%m', date) AS INTEGER) + 2) / 3 AS quarter,
                  SUM(liters)
           FROM fuel_records
           WHERE fuel_type = ?1
           GROUP BY quarter",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![fuel_str], |row| {
            Ok(QuarterTotal {
              quarter:      row.get(0)?,
              total_liters: row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(groups)
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewPolUser) -> Result<PolUser> {
    let user = PolUser {
      user_id:       Uuid::new_v4(),
      username:      input.username,
      email:         input.email,
      password_hash: input.password_hash,
      created_at:    Utc::now(),
    };

    let id_str        = encode_uuid(user.user_id);
    let username      = user.username.clone();
    let email         = user.email.clone();
    let password_hash = user.password_hash.clone();
    let at_str        = encode_dt(user.created_at);

    let username_for_err = user.username.clone();

    let result = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO pol_users (
             user_id, username, email, password_hash, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, username, email, password_hash, at_str],
        )?;
        Ok(())
      })
      .await;

    match result {
      Ok(()) => Ok(user),
      Err(e) if is_unique_violation(&e) => {
        Err(Error::UsernameTaken(username_for_err))
      }
      Err(e) => Err(Error::Database(e)),
    }
  }

  async fn get_user_by_username(
    &self,
    username: &str,
  ) -> Result<Option<PolUser>> {
    let username = username.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, username, email, password_hash, created_at
               FROM pol_users WHERE username = ?1",
              rusqlite::params![username],
              |row| {
                Ok(RawUser {
                  user_id:       row.get(0)?,
                  username:      row.get(1)?,
                  email:         row.get(2)?,
                  password_hash: row.get(3)?,
                  created_at:    row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn update_password(
    &self,
    user_id: Uuid,
    password_hash: String,
  ) -> Result<bool> {
    let id_str = encode_uuid(user_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE pol_users SET password_hash = ?1 WHERE user_id = ?2",
          rusqlite::params![password_hash, id_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }
}
