//! Error type for `slots-store-sqlite`.

use std::fmt;

use rusqlite::ErrorCode;
use slots_core::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] slots_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("user not found: {0}")]
  UserNotFound(i64),

  #[error("user not found")]
  PhoneNotFound,

  #[error("meeting not found: {0}")]
  MeetingNotFound(i64),

  #[error("an active user with phone {0:?} already exists")]
  PhoneTaken(String),

  /// A non-domain failure, wrapped with the operation that hit it.
  #[error("{op} failed after {attempts} attempt(s): {source}")]
  Failed {
    op:       Op,
    attempts: u32,
    source:   Box<Error>,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  /// Errors that describe the data rather than the store; these are returned
  /// unwrapped and never retried.
  pub fn is_domain(&self) -> bool {
    matches!(
      self.kind(),
      ErrorKind::NotFound | ErrorKind::AlreadyExists
    )
  }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::UserNotFound(_) | Self::PhoneNotFound | Self::MeetingNotFound(_) => {
        ErrorKind::NotFound
      }
      Self::PhoneTaken(_) => ErrorKind::AlreadyExists,
      Self::Database(e) if is_transient(e) => ErrorKind::Transient,
      Self::Failed { source, .. } => source.kind(),
      Self::Core(_) | Self::Database(_) | Self::DateParse(_) => {
        ErrorKind::Internal
      }
    }
  }
}

/// SQLite failures that may succeed when tried again.
fn is_transient(e: &tokio_rusqlite::Error) -> bool {
  match e {
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(f, _)) => {
      matches!(
        f.code,
        ErrorCode::DatabaseBusy
          | ErrorCode::DatabaseLocked
          | ErrorCode::SystemIoFailure
      )
    }
    _ => false,
  }
}

/// Whether the driver reported a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(e: &tokio_rusqlite::Error) -> bool {
  matches!(
    e,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(f, _))
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── Operation context ───────────────────────────────────────────────────────

/// Names a gateway operation for error context and logs, e.g. `get user 7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Op {
  pub action: &'static str,
  pub entity: &'static str,
  pub id:     Option<i64>,
}

impl Op {
  pub const fn new(action: &'static str, entity: &'static str) -> Self {
    Self { action, entity, id: None }
  }

  pub const fn with_id(mut self, id: i64) -> Self {
    self.id = Some(id);
    self
  }
}

impl fmt::Display for Op {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.action, self.entity)?;
    if let Some(id) = self.id {
      write!(f, " {id}")?;
    }
    Ok(())
  }
}
