//! Runtime configuration.
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! `WAYBILL_*` environment variables. Nested keys use `__`, so
//! `WAYBILL_STREAM__POLL_INTERVAL_SECS=2` sets `stream.poll_interval_secs`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use waybill_core::{
  lifecycle::EngineSettings, stream::StreamSettings,
  transition::TransitionPolicy,
};

pub const ENV_PREFIX: &str = "WAYBILL";

// ─── Configuration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  /// A leading `~/` is expanded against `$HOME`.
  pub store_path:            PathBuf,
  pub transition_policy:     TransitionPolicy,
  pub max_tracking_attempts: u32,
  pub stream:                StreamConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let engine = EngineSettings::default();
    Self {
      host:                  "127.0.0.1".to_owned(),
      port:                  5001,
      store_path:            PathBuf::from("waybill.db"),
      transition_policy:     engine.transition_policy,
      max_tracking_attempts: engine.max_tracking_attempts,
      stream:                StreamConfig::default(),
    }
  }
}

/// The `[stream]` table.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
  pub poll_interval_secs: u64,
  pub read_attempts:      u32,
  pub retry_backoff_ms:   u64,
}

impl Default for StreamConfig {
  fn default() -> Self {
    Self { poll_interval_secs: 5, read_attempts: 3, retry_backoff_ms: 200 }
  }
}

impl ServerConfig {
  /// Load from `path` (which need not exist) and the process environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::from_sources(path, environment())
  }

  fn from_sources(path: &Path, env: Environment) -> Result<Self, ConfigError> {
    Config::builder()
      .add_source(File::from(path).required(false))
      .add_source(env)
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn engine_settings(&self) -> EngineSettings {
    EngineSettings {
      transition_policy:     self.transition_policy,
      max_tracking_attempts: self.max_tracking_attempts,
    }
  }

  pub fn stream_settings(&self) -> StreamSettings {
    StreamSettings {
      poll_interval: Duration::from_secs(self.stream.poll_interval_secs),
      read_attempts: self.stream.read_attempts,
      retry_backoff: Duration::from_millis(self.stream.retry_backoff_ms),
    }
  }
}

fn environment() -> Environment {
  Environment::with_prefix(ENV_PREFIX)
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
