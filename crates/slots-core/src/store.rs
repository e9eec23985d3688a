//! The `ScheduleStore` trait.
//!
//! Implemented by storage backends (e.g. `slots-store-sqlite`). The service
//! and worker depend on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  error::Classify,
  meeting::{Meeting, MeetingPatch, NewMeeting},
  notify::UserNotify,
  user::{NewUser, User, UserPatch},
};

/// Abstraction over the persistence gateway.
///
/// Lookups of absent rows fail with an error whose kind is
/// [`NotFound`](crate::ErrorKind::NotFound); soft-deleted users count as
/// absent. All methods return `Send` futures so the trait can be used from
/// multi-threaded runtimes.
pub trait ScheduleStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// All active users.
  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Insert a user. Fails with `AlreadyExists` when an active user already
  /// has the phone. Writes one history row.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user_by_phone<'a>(
    &'a self,
    phone: &'a str,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + 'a;

  /// Apply the present fields of `patch` and bump `updated_at`. Writes one
  /// history row.
  fn update_user(
    &self,
    id: i64,
    patch: UserPatch,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Soft-delete; returns the row with `deleted` set.
  fn delete_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  // ── Meetings ──────────────────────────────────────────────────────────

  fn list_meetings(
    &self,
  ) -> impl Future<Output = Result<Vec<Meeting>, Self::Error>> + Send + '_;

  fn create_meeting(
    &self,
    input: NewMeeting,
  ) -> impl Future<Output = Result<Meeting, Self::Error>> + Send + '_;

  fn get_meeting(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Meeting, Self::Error>> + Send + '_;

  fn update_meeting(
    &self,
    id: i64,
    patch: MeetingPatch,
  ) -> impl Future<Output = Result<Meeting, Self::Error>> + Send + '_;

  /// Physically remove the meeting and its history; returns the row as it
  /// was before removal.
  fn delete_meeting(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Meeting, Self::Error>> + Send + '_;

  // ── Reminders ─────────────────────────────────────────────────────────

  /// Meetings not yet notified that start within their client's lead window
  /// measured from `now`.
  fn pending_notifications(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<UserNotify>, Self::Error>> + Send + '_;

  /// Flag a meeting as notified.
  fn mark_notified(
    &self,
    meeting_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
