//! Error type for `arbor-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] arbor_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A column held a value that does not decode to its domain type.
  #[error("decode error: {0}")]
  Decode(String),
}

impl Error {
  /// `true` when SQLite refused the statement because another writer holds
  /// the database.
  pub fn is_contention(&self) -> bool {
    use rusqlite::ErrorCode;

    match self {
      Error::Database(tokio_rusqlite::Error::Rusqlite(
        rusqlite::Error::SqliteFailure(failure, _),
      )) => matches!(
        failure.code,
        ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
      ),
      _ => false,
    }
  }
}

impl From<Error> for arbor_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(inner) => inner,
      Error::Database(inner) => Self::StorageUnavailable(inner.to_string()),
      Error::DateParse(msg) | Error::Decode(msg) => {
        Self::StorageUnavailable(format!("unreadable row: {msg}"))
      }
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
