//! Configuration for the `timeslots` binary.

use std::path::{Path, PathBuf};

use config::{ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use slots_auth::{HashCost, token::MAX_TTL_SECS};
use slots_service::WorkerConfig;

/// Process configuration, read from TOML and overridden by `TIMESLOTS_*`
/// environment variables (`TIMESLOTS_TOKEN__TTL_SECS=600`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub store_path:       PathBuf,
  /// PEM private key. Only the process issuing tokens needs it.
  pub private_key_path: PathBuf,
  pub public_key_path:  PathBuf,
  pub token:            TokenConfig,
  pub worker:           WorkerConfig,
  pub hash:             HashCost,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
  pub issuer:   String,
  pub ttl_secs: i64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      store_path:       PathBuf::from("timeslots.db"),
      private_key_path: PathBuf::from("keys/private_rsa.pem"),
      public_key_path:  PathBuf::from("keys/public_rsa.pem"),
      token:            TokenConfig::default(),
      worker:           WorkerConfig::default(),
      hash:             HashCost::default(),
    }
  }
}

impl Default for TokenConfig {
  fn default() -> Self { Self { issuer: "timeslots".into(), ttl_secs: 24 * 60 * 60 } }
}

impl TokenConfig {
  /// Clamped to `1..=MAX_TTL_SECS`; [`ServerConfig::load`] rejects anything
  /// outside that range.
  pub fn ttl(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.ttl_secs.clamp(1, MAX_TTL_SECS))
  }
}

impl ServerConfig {
  /// Load from `path` (optional) layered with the environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::from_source(File::from(path).required(false))
  }

  /// Load from a TOML string layered with the environment.
  pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
    Self::from_source(File::from_str(toml, FileFormat::Toml))
  }

  fn from_source<S>(file: S) -> Result<Self, ConfigError>
  where
    S: config::Source + Send + Sync + 'static,
  {
    config::Config::builder()
      .add_source(file)
      .add_source(
        Environment::with_prefix("TIMESLOTS")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize::<Self>()
      .and_then(|cfg| cfg.validate().map(|()| cfg))
  }

  /// Reject values that deserialise but cannot be used.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(1..=MAX_TTL_SECS).contains(&self.token.ttl_secs) {
      return Err(ConfigError::Message(format!(
        "token.ttl_secs must be between 1 and {MAX_TTL_SECS}, got {}",
        self.token.ttl_secs
      )));
    }
    if self.worker.interval_secs == 0 {
      return Err(ConfigError::Message(
        "worker.interval_secs must be at least 1".into(),
      ));
    }
    if self.worker.max_attempts == 0 {
      return Err(ConfigError::Message(
        "worker.max_attempts must be at least 1".into(),
      ));
    }
    Ok(())
  }
}
