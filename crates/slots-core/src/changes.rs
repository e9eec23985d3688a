//! Partial updates expressed as data.
//!
//! A [`Changes`] value is an ordered list of `(column, value)` pairs built by
//! the caller. Stores interpret it the same way for every table, so no entity
//! needs its own hand-written UPDATE.

use chrono::{DateTime, Utc};

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
  Text(String),
  Int(i64),
  Bool(bool),
  Timestamp(DateTime<Utc>),
}

/// The columns to touch in one update, in insertion order.
///
/// Column names are `'static` so they always come from code, never from
/// request input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changes {
  fields: Vec<(&'static str, FieldValue)>,
}

impl Changes {
  pub fn new() -> Self { Self::default() }

  /// Set `column`, replacing an earlier value for the same column.
  pub fn set(&mut self, column: &'static str, value: FieldValue) {
    match self.fields.iter_mut().find(|(c, _)| *c == column) {
      Some(slot) => slot.1 = value,
      None => self.fields.push((column, value)),
    }
  }

  /// Set `column` only when a value is present.
  pub fn set_opt(&mut self, column: &'static str, value: Option<FieldValue>) {
    if let Some(v) = value {
      self.set(column, v);
    }
  }

  pub fn is_empty(&self) -> bool { self.fields.is_empty() }

  pub fn len(&self) -> usize { self.fields.len() }

  pub fn contains(&self, column: &str) -> bool {
    self.fields.iter().any(|(c, _)| *c == column)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
    self.fields.iter().map(|(c, v)| (*c, v))
  }
}
