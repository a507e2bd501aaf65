//! Error types for `pol-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown fuel type: {0:?}")]
  UnknownFuelType(String),

  #[error("unknown sort field: {0:?}")]
  UnknownSortField(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
