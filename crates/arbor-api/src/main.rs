//! Arbor API server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), layers
//! `ARBOR_*` environment variables over it, opens the SQLite store and
//! serves the JSON API under `/api`.
//!
//! ```text
//! ARBOR_PORT=9000 ARBOR_STORE__PATH=/tmp/arbor.db cargo run -p arbor-api --bin server
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use arbor_api::ServerConfig;
use arbor_store_sqlite::SqliteStore;
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Arbor threaded-comment server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("ARBOR").separator("__"))
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store = SqliteStore::open(&server_cfg.store)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store.path))?;

  let app = Router::new()
    .nest("/api", arbor_api::api_router(Arc::new(store)))
    .layer(TraceLayer::new_for_http());

  let address = server_cfg.address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
