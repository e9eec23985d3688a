//! Error types for `slots-core` and the error taxonomy shared by all crates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown role: {0:?}")]
  UnknownRole(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The closed set of failure kinds every layer reports.
///
/// Errors are matched by kind, never by identity. Wrapping an error with more
/// context must preserve its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  /// The entity is absent or soft-deleted.
  NotFound,
  /// An active row already holds the unique key.
  AlreadyExists,
  /// Login failed. Unknown account and wrong password look the same.
  InvalidCredentials,
  /// A bearer token is missing, malformed, forged, or expired.
  Unauthorized,
  /// A store failure worth retrying (busy, locked, I/O).
  Transient,
  /// Startup cannot continue, e.g. key material is missing.
  Fatal,
  /// Anything else; surfaced to clients as an opaque internal error.
  Internal,
}

impl ErrorKind {
  pub fn is_transient(self) -> bool { matches!(self, Self::Transient) }
}

/// Implemented by every error type that crosses a crate boundary.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::UnknownRole(_) => ErrorKind::Internal,
    }
  }
}

impl Classify for std::convert::Infallible {
  fn kind(&self) -> ErrorKind { match *self {} }
}
