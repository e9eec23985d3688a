//! Error type for `slots-auth`.

use std::path::PathBuf;

use slots_core::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Login failed. Deliberately says nothing about which part was wrong.
  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("unauthorized")]
  Unauthorized,

  #[error("key material at {}: {reason}", path.display())]
  Key { path: PathBuf, reason: String },

  #[error("password hashing failed: {0}")]
  Hash(String),

  #[error("token lifetime out of range: {0}")]
  Lifetime(chrono::Duration),

  #[error("token signing failed: {0}")]
  Sign(#[from] jsonwebtoken::errors::Error),

  #[error("store error: {source}")]
  Store {
    kind:   ErrorKind,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::InvalidCredentials => ErrorKind::InvalidCredentials,
      Self::Unauthorized => ErrorKind::Unauthorized,
      Self::Key { .. } => ErrorKind::Fatal,
      Self::Hash(_) | Self::Lifetime(_) | Self::Sign(_) => ErrorKind::Internal,
      Self::Store { kind, .. } => *kind,
    }
  }
}
