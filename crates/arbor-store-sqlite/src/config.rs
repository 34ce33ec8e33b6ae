//! Store configuration, handed to [`SqliteStore::open`](crate::SqliteStore::open).

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
  /// Database file; created if missing.
  pub path:            PathBuf,
  /// How long SQLite waits on a locked database before reporting busy.
  pub busy_timeout_ms: u64,
  /// Attempts made at a comment-creating transaction when the database is
  /// busy. Other writes are attempted once.
  pub create_attempts: u32,
}

impl StoreConfig {
  pub fn busy_timeout(&self) -> Duration {
    Duration::from_millis(self.busy_timeout_ms)
  }
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      path:            PathBuf::from("arbor.db"),
      busy_timeout_ms: 5_000,
      create_attempts: 3,
    }
  }
}
