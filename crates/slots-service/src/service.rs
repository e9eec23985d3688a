//! Request/response orchestration over a [`ScheduleStore`].
//!
//! Every call goes straight to the store. Failures are wrapped with the
//! operation that hit them and keep their kind, so a `NotFound` from the
//! store is still a `NotFound` here.

use std::sync::Arc;

use serde::Deserialize;
use slots_auth::Authenticator;
use slots_core::{
  meeting::{Meeting, MeetingPatch, NewMeeting},
  store::ScheduleStore,
  user::{DEFAULT_NOTIFY_LEAD, NewUser, Role, User, UserPatch},
};

use crate::{Error, Operation, Result};

/// Input for [`ScheduleService::create_user`]. Carries the plaintext
/// password, which is hashed before it reaches the store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
  pub last_name:   String,
  pub first_name:  String,
  pub phone:       String,
  #[serde(default)]
  pub email:       Option<String>,
  pub password:    String,
  pub role:        Role,
  #[serde(default)]
  pub notify_lead: Option<i64>,
}

/// Input for [`ScheduleService::update_user`]. `None` leaves a field alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserUpdate {
  pub last_name:   Option<String>,
  pub first_name:  Option<String>,
  pub phone:       Option<String>,
  pub email:       Option<String>,
  pub password:    Option<String>,
  pub role:        Option<Role>,
  pub notify_lead: Option<i64>,
}

pub struct ScheduleService<S> {
  store: Arc<S>,
  auth:  Authenticator,
}

impl<S> Clone for ScheduleService<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), auth: self.auth.clone() }
  }
}

impl<S: ScheduleStore> ScheduleService<S> {
  pub fn new(store: Arc<S>, auth: Authenticator) -> Self { Self { store, auth } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  fn hash(&self, op: Operation, password: &str) -> Result<String> {
    self
      .auth
      .hasher()
      .hash(password)
      .map_err(|e| Error::new(op, e))
  }

  // ─── Users ──────────────────────────────────────────────────────────────────

  pub async fn list_users(&self) -> Result<Vec<User>> {
    let op = Operation::new("list", "users");
    tracing::debug!(%op);
    self.store.list_users().await.map_err(|e| Error::new(op, e))
  }

  pub async fn create_user(&self, input: CreateUser) -> Result<User> {
    let op = Operation::new("create", "user");
    tracing::debug!(%op, phone = %input.phone);
    let password_hash = self.hash(op, &input.password)?;
    let new = NewUser {
      last_name: input.last_name,
      first_name: input.first_name,
      phone: input.phone,
      email: input.email,
      password_hash,
      role: input.role,
      notify_lead: input.notify_lead.unwrap_or(DEFAULT_NOTIFY_LEAD),
    };
    self.store.create_user(new).await.map_err(|e| Error::new(op, e))
  }

  pub async fn get_user(&self, id: i64) -> Result<User> {
    let op = Operation::new("get", "user").with_id(id);
    tracing::debug!(%op);
    self.store.get_user(id).await.map_err(|e| Error::new(op, e))
  }

  pub async fn update_user(&self, id: i64, update: UserUpdate) -> Result<User> {
    let op = Operation::new("update", "user").with_id(id);
    tracing::debug!(%op);
    let password_hash = match update.password {
      Some(ref password) => Some(self.hash(op, password)?),
      None => None,
    };
    let patch = UserPatch {
      last_name: update.last_name,
      first_name: update.first_name,
      phone: update.phone,
      email: update.email,
      password_hash,
      role: update.role,
      notify_lead: update.notify_lead,
    };
    self
      .store
      .update_user(id, patch)
      .await
      .map_err(|e| Error::new(op, e))
  }

  pub async fn delete_user(&self, id: i64) -> Result<User> {
    let op = Operation::new("delete", "user").with_id(id);
    tracing::debug!(%op);
    self.store.delete_user(id).await.map_err(|e| Error::new(op, e))
  }

  // ─── Meetings ───────────────────────────────────────────────────────────────

  pub async fn list_meetings(&self) -> Result<Vec<Meeting>> {
    let op = Operation::new("list", "meetings");
    tracing::debug!(%op);
    self.store.list_meetings().await.map_err(|e| Error::new(op, e))
  }

  pub async fn create_meeting(&self, input: NewMeeting) -> Result<Meeting> {
    let op = Operation::new("create", "meeting");
    tracing::debug!(%op, manager = input.manager, client = input.client);
    self
      .store
      .create_meeting(input)
      .await
      .map_err(|e| Error::new(op, e))
  }

  pub async fn get_meeting(&self, id: i64) -> Result<Meeting> {
    let op = Operation::new("get", "meeting").with_id(id);
    tracing::debug!(%op);
    self.store.get_meeting(id).await.map_err(|e| Error::new(op, e))
  }

  pub async fn update_meeting(
    &self,
    id: i64,
    patch: MeetingPatch,
  ) -> Result<Meeting> {
    let op = Operation::new("update", "meeting").with_id(id);
    tracing::debug!(%op);
    self
      .store
      .update_meeting(id, patch)
      .await
      .map_err(|e| Error::new(op, e))
  }

  pub async fn delete_meeting(&self, id: i64) -> Result<Meeting> {
    let op = Operation::new("delete", "meeting").with_id(id);
    tracing::debug!(%op);
    self.store.delete_meeting(id).await.map_err(|e| Error::new(op, e))
  }

  // ─── Auth ───────────────────────────────────────────────────────────────────

  /// Returns a signed bearer token for the user holding `phone`.
  pub async fn login(&self, phone: &str, password: &str) -> Result<String> {
    let op = Operation::new("login", "user");
    tracing::debug!(%op);
    self
      .auth
      .login(self.store.as_ref(), phone, password)
      .await
      .map_err(|e| Error::new(op, e))
  }
}
