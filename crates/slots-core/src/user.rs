//! Users: coaches and their clients.
//!
//! Users are never physically deleted. Deletion flips the `deleted` flag and
//! the row stays behind for the audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::changes::{Changes, FieldValue};

/// Default reminder lead window, in minutes.
pub const DEFAULT_NOTIFY_LEAD: i64 = 60;

/// What a user is allowed to do.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Coach,
  Client,
}

impl Role {
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn parse(s: &str) -> crate::Result<Self> {
    s.parse()
      .map_err(|_| crate::Error::UnknownRole(s.to_owned()))
  }
}

/// A persisted user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id:            i64,
  pub last_name:     String,
  pub first_name:    String,
  /// Unique among active users.
  pub phone:         String,
  pub email:         Option<String>,
  #[serde(skip_serializing, default)]
  pub password_hash: String,
  pub role:          Role,
  /// Minutes before a meeting at which the reminder becomes due.
  pub notify_lead:   i64,
  pub deleted:       bool,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input to [`crate::store::ScheduleStore::create_user`].
///
/// The password is already hashed; plaintext never reaches the store.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub last_name:     String,
  pub first_name:    String,
  pub phone:         String,
  pub email:         Option<String>,
  pub password_hash: String,
  pub role:          Role,
  pub notify_lead:   i64,
}

/// A sparse set of user fields to change. `None` leaves the column alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
  pub last_name:     Option<String>,
  pub first_name:    Option<String>,
  pub phone:         Option<String>,
  pub email:         Option<String>,
  pub password_hash: Option<String>,
  pub role:          Option<Role>,
  pub notify_lead:   Option<i64>,
}

impl UserPatch {
  /// Flatten into the column list the store applies.
  pub fn into_changes(self) -> Changes {
    let mut changes = Changes::new();
    changes.set_opt("last_name", self.last_name.map(FieldValue::Text));
    changes.set_opt("first_name", self.first_name.map(FieldValue::Text));
    changes.set_opt("phone", self.phone.map(FieldValue::Text));
    changes.set_opt("email", self.email.map(FieldValue::Text));
    changes.set_opt("password_hash", self.password_hash.map(FieldValue::Text));
    changes.set_opt(
      "role",
      self.role.map(|r| FieldValue::Text(r.as_str().to_owned())),
    );
    changes.set_opt("notify_lead", self.notify_lead.map(FieldValue::Int));
    changes
  }
}
