//! Error type for `pol-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] pol_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The control number is already present in the fuel-type partition.
  #[error("duplicate control number: {0:?}")]
  DuplicateControlNumber(String),

  #[error("username already exists: {0:?}")]
  UsernameTaken(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
