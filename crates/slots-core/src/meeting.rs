//! Meetings between a coach (the manager) and a client.
//!
//! Unlike users, meetings are physically deleted together with their history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::changes::{Changes, FieldValue};

/// A persisted meeting row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
  pub id:         i64,
  /// User id of the coach.
  pub manager:    i64,
  /// User id of the client.
  pub client:     i64,
  pub start_at:   DateTime<Utc>,
  pub end_at:     DateTime<Utc>,
  /// Set once the reminder for this meeting has been delivered.
  pub notified:   bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Input to [`crate::store::ScheduleStore::create_meeting`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMeeting {
  pub manager:  i64,
  pub client:   i64,
  pub start_at: DateTime<Utc>,
  pub end_at:   DateTime<Utc>,
}

/// A sparse set of meeting fields to change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingPatch {
  pub manager:  Option<i64>,
  pub client:   Option<i64>,
  pub start_at: Option<DateTime<Utc>>,
  pub end_at:   Option<DateTime<Utc>>,
}

impl MeetingPatch {
  pub fn into_changes(self) -> Changes {
    let mut changes = Changes::new();
    changes.set_opt("manager", self.manager.map(FieldValue::Int));
    changes.set_opt("client", self.client.map(FieldValue::Int));
    changes.set_opt("start_at", self.start_at.map(FieldValue::Timestamp));
    changes.set_opt("end_at", self.end_at.map(FieldValue::Timestamp));
    changes
  }
}
