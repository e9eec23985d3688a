//! Reminder delivery: the projection the worker reads and the channel it
//! writes to.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A client with an upcoming meeting whose reminder is due.
///
/// Produced by a query joining users and meetings; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotify {
  #[serde(rename = "userID")]
  pub user_id:    i64,
  #[serde(rename = "meetingID")]
  pub meeting_id: i64,
  pub last_name:  String,
  pub first_name: String,
  pub phone:      String,
  pub start_at:   DateTime<Utc>,
  pub notified:   bool,
}

/// An outbound channel for reminders (chat bot, SMS, email, ...).
pub trait Notifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn notify<'a>(
    &'a self,
    message: &'a str,
    recipient: &'a UserNotify,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
