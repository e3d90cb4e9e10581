//! waybill-server binary.
//!
//! Reads `waybill.toml` (or the path given with `--config`) layered under
//! `WAYBILL_*` environment variables, opens the SQLite store and serves the
//! JSON API under `/api` until SIGINT or SIGTERM.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;
use waybill_api::{AppState, api_router};
use waybill_server::ServerConfig;
use waybill_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Waybill shipment service")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "waybill.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = cfg.store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let shutdown = shutdown_token();
  let state = AppState::new(
    Arc::new(store),
    cfg.engine_settings(),
    cfg.stream_settings(),
    shutdown.clone(),
  );
  let app = Router::new().nest("/api", api_router(Arc::new(state)));

  let address = cfg.address();
  info!(
    policy = ?cfg.transition_policy,
    store = %store_path.display(),
    "Listening on http://{address}"
  );
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown.cancelled_owned())
    .await
    .context("server error")?;

  info!("server stopped");
  Ok(())
}

/// A token cancelled on SIGINT or SIGTERM. Open update streams hold child
/// tokens, so they close and let graceful shutdown finish.
fn shutdown_token() -> CancellationToken {
  let token = CancellationToken::new();
  let trigger = token.clone();

  tokio::spawn(async move {
    let ctrl_c = ctrl_c();

    #[cfg(unix)]
    {
      use tokio::signal::unix::{SignalKind, signal};
      match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
          tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
          }
        }
        Err(e) => {
          warn!(error = %e, "failed to install SIGTERM handler");
          ctrl_c.await;
        }
      }
    }

    #[cfg(not(unix))]
    ctrl_c.await;

    trigger.cancel();
  });

  token
}

/// Resolves on SIGINT. If the listener cannot be installed this never
/// resolves, leaving shutdown to the other signal.
async fn ctrl_c() {
  match tokio::signal::ctrl_c().await {
    Ok(()) => info!("received SIGINT, shutting down"),
    Err(e) => {
      warn!(error = %e, "failed to listen for SIGINT");
      std::future::pending::<()>().await;
    }
  }
}
