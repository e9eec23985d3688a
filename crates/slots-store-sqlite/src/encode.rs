//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings with microsecond
//! precision, so text order matches time order and SQLite's `unixepoch()`
//! can read them.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Row, types::Value};
use slots_core::{
  changes::FieldValue,
  meeting::Meeting,
  notify::UserNotify,
  user::{Role, User},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── FieldValue ──────────────────────────────────────────────────────────────

pub fn encode_field(v: &FieldValue) -> Value {
  match v {
    FieldValue::Text(s) => Value::Text(s.clone()),
    FieldValue::Int(i) => Value::Integer(*i),
    FieldValue::Bool(b) => Value::Integer(i64::from(*b)),
    FieldValue::Timestamp(dt) => Value::Text(encode_dt(*dt)),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawUser::from_row`].
pub const USER_COLUMNS: &str = "id, last_name, first_name, phone, email, \
                                password_hash, role, notify_lead, deleted, \
                                created_at, updated_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:            i64,
  pub last_name:     String,
  pub first_name:    String,
  pub phone:         String,
  pub email:         Option<String>,
  pub password_hash: String,
  pub role:          String,
  pub notify_lead:   i64,
  pub deleted:       bool,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawUser {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      last_name:     row.get(1)?,
      first_name:    row.get(2)?,
      phone:         row.get(3)?,
      email:         row.get(4)?,
      password_hash: row.get(5)?,
      role:          row.get(6)?,
      notify_lead:   row.get(7)?,
      deleted:       row.get(8)?,
      created_at:    row.get(9)?,
      updated_at:    row.get(10)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:            self.id,
      last_name:     self.last_name,
      first_name:    self.first_name,
      phone:         self.phone,
      email:         self.email,
      password_hash: self.password_hash,
      role:          Role::parse(&self.role)?,
      notify_lead:   self.notify_lead,
      deleted:       self.deleted,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

/// Column list matching [`RawMeeting::from_row`].
pub const MEETING_COLUMNS: &str =
  "id, manager, client, start_at, end_at, notified, created_at, updated_at";

/// Raw values read directly from a `meetings` row.
pub struct RawMeeting {
  pub id:         i64,
  pub manager:    i64,
  pub client:     i64,
  pub start_at:   String,
  pub end_at:     String,
  pub notified:   bool,
  pub created_at: String,
  pub updated_at: String,
}

impl RawMeeting {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      manager:    row.get(1)?,
      client:     row.get(2)?,
      start_at:   row.get(3)?,
      end_at:     row.get(4)?,
      notified:   row.get(5)?,
      created_at: row.get(6)?,
      updated_at: row.get(7)?,
    })
  }

  pub fn into_meeting(self) -> Result<Meeting> {
    Ok(Meeting {
      id:         self.id,
      manager:    self.manager,
      client:     self.client,
      start_at:   decode_dt(&self.start_at)?,
      end_at:     decode_dt(&self.end_at)?,
      notified:   self.notified,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values from the reminder projection.
pub struct RawUserNotify {
  pub user_id:    i64,
  pub meeting_id: i64,
  pub last_name:  String,
  pub first_name: String,
  pub phone:      String,
  pub start_at:   String,
  pub notified:   bool,
}

impl RawUserNotify {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      meeting_id: row.get(1)?,
      last_name:  row.get(2)?,
      first_name: row.get(3)?,
      phone:      row.get(4)?,
      start_at:   row.get(5)?,
      notified:   row.get(6)?,
    })
  }

  pub fn into_user_notify(self) -> Result<UserNotify> {
    Ok(UserNotify {
      user_id:    self.user_id,
      meeting_id: self.meeting_id,
      last_name:  self.last_name,
      first_name: self.first_name,
      phone:      self.phone,
      start_at:   decode_dt(&self.start_at)?,
      notified:   self.notified,
    })
  }
}
