//! [`SqliteStore`]: the SQLite implementation of [`ScheduleStore`].

use std::{path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use slots_core::{
  changes::Changes,
  clock::{Clock, SystemClock},
  meeting::{Meeting, MeetingPatch, NewMeeting},
  notify::UserNotify,
  store::ScheduleStore,
  user::{NewUser, User, UserPatch},
};

use crate::{
  encode::{
    encode_dt, encode_field, RawMeeting, RawUser, RawUserNotify,
    MEETING_COLUMNS, USER_COLUMNS,
  },
  error::is_unique_violation,
  retry::with_retries,
  schema::SCHEMA,
  Error, Op, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A schedule store backed by a single SQLite file.
///
/// Clones share one connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  clock: Arc<dyn Clock>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, clock: Arc::new(SystemClock) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a private in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, clock: Arc::new(SystemClock) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Replace the clock used for `created_at`/`updated_at`.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  fn now_str(&self) -> String { encode_dt(self.clock.now()) }

  /// Number of audit rows recorded for user `id`.
  pub async fn user_history_count(&self, id: i64) -> Result<i64> {
    self.history_count("SELECT count(*) FROM users_history WHERE user_id = ?1", id).await
  }

  /// Number of audit rows recorded for meeting `id`.
  pub async fn meeting_history_count(&self, id: i64) -> Result<i64> {
    self
      .history_count("SELECT count(*) FROM meetings_history WHERE meeting_id = ?1", id)
      .await
  }

  async fn history_count(&self, sql: &'static str, id: i64) -> Result<i64> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(conn.query_row(sql, rusqlite::params![id], |r| r.get(0))?)
        })
        .await?,
    )
  }
}

// ─── Shared SQL helpers ──────────────────────────────────────────────────────

/// Build `UPDATE <table> SET <changes>, updated_at = ? WHERE id = ? ...
/// RETURNING <columns>` and its parameters.
///
/// Parameters are the change values in order, then `updated_at`, then `id`.
fn build_update(
  table:      &str,
  columns:    &str,
  changes:    &Changes,
  only_live:  bool,
  updated_at: String,
  id:         i64,
) -> (String, Vec<rusqlite::types::Value>) {
  let mut sets: Vec<String> = changes
    .iter()
    .enumerate()
    .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
    .collect();
  let n = changes.len();
  sets.push(format!("updated_at = ?{}", n + 1));

  let live = if only_live { " AND deleted = 0" } else { "" };
  let sql = format!(
    "UPDATE {table} SET {} WHERE id = ?{}{live} RETURNING {columns}",
    sets.join(", "),
    n + 2,
  );

  let mut params: Vec<rusqlite::types::Value> =
    changes.iter().map(|(_, v)| encode_field(v)).collect();
  params.push(rusqlite::types::Value::Text(updated_at));
  params.push(rusqlite::types::Value::Integer(id));

  (sql, params)
}

fn record_user_history(
  conn:   &rusqlite::Connection,
  id:     i64,
  action: &str,
  at:     &str,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO users_history (
       user_id, action, last_name, first_name, phone, email,
       role, notify_lead, deleted, recorded_at
     )
     SELECT id, ?2, last_name, first_name, phone, email,
            role, notify_lead, deleted, ?3
     FROM users WHERE id = ?1",
    rusqlite::params![id, action, at],
  )?;
  Ok(())
}

fn record_meeting_history(
  conn:   &rusqlite::Connection,
  id:     i64,
  action: &str,
  at:     &str,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO meetings_history (
       meeting_id, action, manager, client, start_at, end_at, notified, recorded_at
     )
     SELECT id, ?2, manager, client, start_at, end_at, notified, ?3
     FROM meetings WHERE id = ?1",
    rusqlite::params![id, action, at],
  )?;
  Ok(())
}

// ─── Single attempts ─────────────────────────────────────────────────────────
//
// Each method below is one try at one operation. The trait impl wraps them in
// `with_retries`.

impl SqliteStore {
  async fn fetch_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users WHERE deleted = 0 ORDER BY id"
        ))?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn insert_user(&self, input: &NewUser) -> Result<User> {
    let input = input.clone();
    let phone = input.phone.clone();
    let now   = self.now_str();

    let result = self
      .conn
      .call(move |conn| -> tokio_rusqlite::Result<Option<RawUser>> {
        let tx = conn.transaction()?;

        let taken = tx
          .query_row(
            "SELECT 1 FROM users WHERE phone = ?1 AND deleted = 0",
            rusqlite::params![input.phone],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if taken {
          return Ok(None);
        }

        let raw = tx.query_row(
          &format!(
            "INSERT INTO users (
               last_name, first_name, phone, email, password_hash,
               role, notify_lead, deleted, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)
             RETURNING {USER_COLUMNS}"
          ),
          rusqlite::params![
            input.last_name,
            input.first_name,
            input.phone,
            input.email,
            input.password_hash,
            input.role.as_str(),
            input.notify_lead,
            now,
          ],
          RawUser::from_row,
        )?;

        record_user_history(&tx, raw.id, "create", &now)?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await;

    match result {
      Ok(Some(raw)) => raw.into_user(),
      Ok(None) => Err(Error::PhoneTaken(phone)),
      Err(e) if is_unique_violation(&e) => Err(Error::PhoneTaken(phone)),
      Err(e) => Err(e.into()),
    }
  }

  async fn fetch_user(&self, id: i64) -> Result<User> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND deleted = 0"),
              rusqlite::params![id],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.ok_or(Error::UserNotFound(id))?.into_user()
  }

  async fn fetch_user_by_phone(&self, phone: &str) -> Result<User> {
    let phone = phone.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE phone = ?1 AND deleted = 0"),
              rusqlite::params![phone],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.ok_or(Error::PhoneNotFound)?.into_user()
  }

  async fn apply_user_changes(&self, id: i64, patch: &UserPatch) -> Result<User> {
    let phone = patch.phone.clone().unwrap_or_default();
    let changes = patch.clone().into_changes();
    let now = self.now_str();
    let (sql, params) =
      build_update("users", USER_COLUMNS, &changes, true, now.clone(), id);

    let result = self
      .conn
      .call(move |conn| -> tokio_rusqlite::Result<Option<RawUser>> {
        let tx = conn.transaction()?;
        let raw = tx
          .query_row(&sql, rusqlite::params_from_iter(params), RawUser::from_row)
          .optional()?;
        if let Some(raw) = &raw {
          record_user_history(&tx, raw.id, "update", &now)?;
        }
        tx.commit()?;
        Ok(raw)
      })
      .await;

    match result {
      Ok(Some(raw)) => raw.into_user(),
      Ok(None) => Err(Error::UserNotFound(id)),
      Err(e) if is_unique_violation(&e) => Err(Error::PhoneTaken(phone)),
      Err(e) => Err(e.into()),
    }
  }

  async fn soft_delete_user(&self, id: i64) -> Result<User> {
    let now = self.now_str();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let raw = tx
          .query_row(
            &format!(
              "UPDATE users SET deleted = 1, updated_at = ?2
               WHERE id = ?1 AND deleted = 0
               RETURNING {USER_COLUMNS}"
            ),
            rusqlite::params![id, now],
            RawUser::from_row,
          )
          .optional()?;
        if raw.is_some() {
          record_user_history(&tx, id, "delete", &now)?;
        }
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.ok_or(Error::UserNotFound(id))?.into_user()
  }

  async fn fetch_meetings(&self) -> Result<Vec<Meeting>> {
    let raws: Vec<RawMeeting> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {MEETING_COLUMNS} FROM meetings ORDER BY id"))?;
        let rows = stmt
          .query_map([], RawMeeting::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMeeting::into_meeting).collect()
  }

  async fn insert_meeting(&self, input: &NewMeeting) -> Result<Meeting> {
    let start_at = encode_dt(input.start_at);
    let end_at   = encode_dt(input.end_at);
    let manager  = input.manager;
    let client   = input.client;
    let now      = self.now_str();

    let raw: RawMeeting = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let raw = tx.query_row(
          &format!(
            "INSERT INTO meetings (
               manager, client, start_at, end_at, notified, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)
             RETURNING {MEETING_COLUMNS}"
          ),
          rusqlite::params![manager, client, start_at, end_at, now],
          RawMeeting::from_row,
        )?;
        record_meeting_history(&tx, raw.id, "create", &now)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_meeting()
  }

  async fn fetch_meeting(&self, id: i64) -> Result<Meeting> {
    let raw: Option<RawMeeting> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {MEETING_COLUMNS} FROM meetings WHERE id = ?1"),
              rusqlite::params![id],
              RawMeeting::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.ok_or(Error::MeetingNotFound(id))?.into_meeting()
  }

  async fn apply_meeting_changes(
    &self,
    id:    i64,
    patch: &MeetingPatch,
  ) -> Result<Meeting> {
    let changes = patch.clone().into_changes();
    let now = self.now_str();
    let (sql, params) =
      build_update("meetings", MEETING_COLUMNS, &changes, false, now.clone(), id);

    let raw: Option<RawMeeting> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let raw = tx
          .query_row(&sql, rusqlite::params_from_iter(params), RawMeeting::from_row)
          .optional()?;
        if raw.is_some() {
          record_meeting_history(&tx, id, "update", &now)?;
        }
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.ok_or(Error::MeetingNotFound(id))?.into_meeting()
  }

  async fn remove_meeting(&self, id: i64) -> Result<Meeting> {
    let raw: Option<RawMeeting> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let raw = tx
          .query_row(
            &format!("SELECT {MEETING_COLUMNS} FROM meetings WHERE id = ?1"),
            rusqlite::params![id],
            RawMeeting::from_row,
          )
          .optional()?;
        if raw.is_some() {
          tx.execute(
            "DELETE FROM meetings_history WHERE meeting_id = ?1",
            rusqlite::params![id],
          )?;
          tx.execute("DELETE FROM meetings WHERE id = ?1", rusqlite::params![id])?;
        }
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.ok_or(Error::MeetingNotFound(id))?.into_meeting()
  }

  async fn fetch_pending(&self, now: DateTime<Utc>) -> Result<Vec<UserNotify>> {
    let now = encode_dt(now);

    let raws: Vec<RawUserNotify> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT u.id, m.id, u.last_name, u.first_name, u.phone,
                  m.start_at, m.notified
           FROM meetings m
           JOIN users u ON u.id = m.client
           WHERE m.notified = 0
             AND u.deleted = 0
             AND unixepoch(m.start_at) >= unixepoch(?1)
             AND unixepoch(m.start_at) <= unixepoch(?1) + u.notify_lead * 60
           ORDER BY m.start_at, m.id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![now], RawUserNotify::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUserNotify::into_user_notify).collect()
  }

  async fn flag_notified(&self, id: i64) -> Result<()> {
    let now = self.now_str();

    let found: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE meetings SET notified = 1, updated_at = ?2 WHERE id = ?1",
          rusqlite::params![id, now],
        )?;
        if changed > 0 {
          record_meeting_history(&tx, id, "notified", &now)?;
        }
        tx.commit()?;
        Ok(changed > 0)
      })
      .await?;

    if found { Ok(()) } else { Err(Error::MeetingNotFound(id)) }
  }
}

// ─── ScheduleStore impl ──────────────────────────────────────────────────────

impl ScheduleStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn list_users(&self) -> Result<Vec<User>> {
    with_retries(Op::new("list", "users"), || self.fetch_users()).await
  }

  async fn create_user(&self, input: NewUser) -> Result<User> {
    with_retries(Op::new("create", "user"), || self.insert_user(&input)).await
  }

  async fn get_user(&self, id: i64) -> Result<User> {
    with_retries(Op::new("get", "user").with_id(id), || self.fetch_user(id)).await
  }

  async fn get_user_by_phone(&self, phone: &str) -> Result<User> {
    with_retries(Op::new("get", "user by phone"), || {
      self.fetch_user_by_phone(phone)
    })
    .await
  }

  async fn update_user(&self, id: i64, patch: UserPatch) -> Result<User> {
    with_retries(Op::new("update", "user").with_id(id), || {
      self.apply_user_changes(id, &patch)
    })
    .await
  }

  async fn delete_user(&self, id: i64) -> Result<User> {
    with_retries(Op::new("delete", "user").with_id(id), || {
      self.soft_delete_user(id)
    })
    .await
  }

  // ── Meetings ──────────────────────────────────────────────────────────────

  async fn list_meetings(&self) -> Result<Vec<Meeting>> {
    with_retries(Op::new("list", "meetings"), || self.fetch_meetings()).await
  }

  async fn create_meeting(&self, input: NewMeeting) -> Result<Meeting> {
    with_retries(Op::new("create", "meeting"), || self.insert_meeting(&input)).await
  }

  async fn get_meeting(&self, id: i64) -> Result<Meeting> {
    with_retries(Op::new("get", "meeting").with_id(id), || self.fetch_meeting(id))
      .await
  }

  async fn update_meeting(&self, id: i64, patch: MeetingPatch) -> Result<Meeting> {
    with_retries(Op::new("update", "meeting").with_id(id), || {
      self.apply_meeting_changes(id, &patch)
    })
    .await
  }

  async fn delete_meeting(&self, id: i64) -> Result<Meeting> {
    with_retries(Op::new("delete", "meeting").with_id(id), || {
      self.remove_meeting(id)
    })
    .await
  }

  // ── Reminders ─────────────────────────────────────────────────────────────

  async fn pending_notifications(
    &self,
    now: DateTime<Utc>,
  ) -> Result<Vec<UserNotify>> {
    with_retries(Op::new("list", "pending notifications"), || {
      self.fetch_pending(now)
    })
    .await
  }

  async fn mark_notified(&self, meeting_id: i64) -> Result<()> {
    with_retries(Op::new("mark notified", "meeting").with_id(meeting_id), || {
      self.flag_notified(meeting_id)
    })
    .await
  }
}
