//! Error type for `waybill-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;
use waybill_core::store::StoreError;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown shipment status: {0:?}")]
  UnknownStatus(String),

  #[error("count out of range: {0}")]
  CountOutOfRange(i64),
}

impl Error {
  fn sqlite_failure(&self) -> Option<&rusqlite::ffi::Error> {
    match self {
      Error::Database(tokio_rusqlite::Error::Rusqlite(
        rusqlite::Error::SqliteFailure(e, _),
      )) => Some(e),
      _ => None,
    }
  }
}

impl StoreError for Error {
  fn is_unique_violation(&self) -> bool {
    self.sqlite_failure().is_some_and(|e| {
      e.code == ErrorCode::ConstraintViolation
        && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    })
  }

  fn is_transient(&self) -> bool {
    self.sqlite_failure().is_some_and(|e| {
      matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
