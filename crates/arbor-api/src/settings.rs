//! Runtime server configuration, deserialised from `config.toml` and
//! `ARBOR_*` environment variables.
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8080
//!
//! [store]
//! path = "/var/lib/arbor/arbor.db"
//! busy_timeout_ms = 5000
//! create_attempts = 3
//! ```

use arbor_store_sqlite::StoreConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:  String,
  pub port:  u16,
  pub store: StoreConfig,
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:  "127.0.0.1".to_owned(),
      port:  8080,
      store: StoreConfig::default(),
    }
  }
}
