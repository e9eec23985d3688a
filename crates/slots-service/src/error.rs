//! Service-level error: the failing operation plus the underlying cause.

use std::fmt;

use slots_core::{Classify, ErrorKind};
use thiserror::Error;

/// What the service was doing when it failed, e.g. `get user (id 5)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
  pub action: &'static str,
  pub entity: &'static str,
  pub id:     Option<i64>,
}

impl Operation {
  pub const fn new(action: &'static str, entity: &'static str) -> Self {
    Self { action, entity, id: None }
  }

  pub const fn with_id(mut self, id: i64) -> Self {
    self.id = Some(id);
    self
  }
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.action, self.entity)?;
    if let Some(id) = self.id {
      write!(f, " (id {id})")?;
    }
    Ok(())
  }
}

/// Wraps a store or auth failure with the operation that hit it. The kind
/// is taken from the cause and never changed.
#[derive(Debug, Error)]
#[error("{op}: {source}")]
pub struct Error {
  op:     Operation,
  kind:   ErrorKind,
  #[source]
  source: Box<dyn std::error::Error + Send + Sync>,
}

impl Error {
  pub fn new<E>(op: Operation, source: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    Self { op, kind: source.kind(), source: Box::new(source) }
  }

  pub fn op(&self) -> Operation { self.op }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind { self.kind }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
