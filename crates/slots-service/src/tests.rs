//! Service and worker tests against an in-memory `SqliteStore`.

use std::{
  sync::{
    Arc, Mutex,
    atomic::{AtomicU32, Ordering},
  },
  time::Duration as StdDuration,
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use slots_auth::{
  Authenticator, HashCost, PasswordHasher, TokenIssuer, TokenVerifier, keys,
};
use slots_core::{
  Classify, ErrorKind,
  clock::{Clock, ManualClock},
  meeting::{MeetingPatch, NewMeeting},
  notify::{Notifier, UserNotify},
  store::ScheduleStore,
  user::Role,
};
use slots_store_sqlite::SqliteStore;
use tokio_util::sync::CancellationToken;

use crate::{
  CreateUser, ScheduleService, TickReport, UserUpdate, Worker, WorkerConfig,
  reminder_message,
};

const PRIVATE_KEY: &str =
  concat!(env!("CARGO_MANIFEST_DIR"), "/../slots-auth/testdata/private_rsa.pem");
const PUBLIC_KEY: &str =
  concat!(env!("CARGO_MANIFEST_DIR"), "/../slots-auth/testdata/public_rsa.pem");

fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2023, 1, 1, 9, 0, 0).unwrap() }

struct Fixture {
  service: ScheduleService<SqliteStore>,
  store:   Arc<SqliteStore>,
  clock:   Arc<ManualClock>,
}

async fn fixture() -> Fixture {
  let clock = Arc::new(ManualClock::new(t0()));
  let store = Arc::new(
    SqliteStore::open_in_memory()
      .await
      .unwrap()
      .with_clock(clock.clone()),
  );
  let auth = Authenticator::new(
    PasswordHasher::new(HashCost::minimal()).unwrap(),
    TokenIssuer::new(
      keys::load_signing_key(PRIVATE_KEY).unwrap(),
      "timeslots",
      Duration::hours(1),
    )
    .unwrap(),
  )
  .unwrap();
  Fixture { service: ScheduleService::new(store.clone(), auth), store, clock }
}

fn verifier() -> TokenVerifier {
  TokenVerifier::new(keys::load_verifying_key(PUBLIC_KEY).unwrap(), "timeslots")
}

fn create(phone: &str, role: Role) -> CreateUser {
  CreateUser {
    last_name:   "Ivanov".into(),
    first_name:  "Ivan".into(),
    phone:       phone.into(),
    email:       None,
    password:    "jopa".into(),
    role,
    notify_lead: None,
  }
}

/// A coach and a client with one meeting starting `in_` from now.
async fn booked(f: &Fixture, in_: Duration) -> (i64, i64, i64) {
  let coach = f.service.create_user(create("+7 900", Role::Coach)).await.unwrap();
  let client = f.service.create_user(create("+7 901", Role::Client)).await.unwrap();
  let start = f.clock.now() + in_;
  let meeting = f
    .service
    .create_meeting(NewMeeting {
      manager:  coach.id,
      client:   client.id,
      start_at: start,
      end_at:   start + Duration::hours(1),
    })
    .await
    .unwrap();
  (coach.id, client.id, meeting.id)
}

// ─── Service ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_user_hashes_the_password() {
  let f = fixture().await;
  let user = f.service.create_user(create("+7 999", Role::Client)).await.unwrap();
  assert!(user.password_hash.starts_with("$argon2id$"));
  assert_ne!(user.password_hash, "jopa");
  assert_eq!(user.notify_lead, 60);
  assert_eq!(user.created_at, user.updated_at);
}

#[tokio::test]
async fn login_round_trip() {
  let f = fixture().await;
  let user = f.service.create_user(create("+7 999", Role::Coach)).await.unwrap();

  let token = f.service.login("+7 999", "jopa").await.unwrap();
  let claims = verifier().verify(&token).unwrap();
  assert_eq!(claims.user_id, user.id);
  assert_eq!(claims.role, Role::Coach);

  let wrong = f.service.login("+7 999", "nope").await.unwrap_err();
  let unknown = f.service.login("+7 000", "jopa").await.unwrap_err();
  assert_eq!(wrong.kind(), ErrorKind::InvalidCredentials);
  assert_eq!(unknown.kind(), ErrorKind::InvalidCredentials);
  assert_eq!(wrong.to_string(), unknown.to_string());
}

#[tokio::test]
async fn not_found_keeps_its_kind_and_gains_context() {
  let f = fixture().await;
  let err = f.service.get_user(99).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
  assert!(err.to_string().starts_with("get user (id 99): "), "{err}");

  let err = f.service.delete_meeting(7).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
  assert!(err.to_string().starts_with("delete meeting (id 7): "), "{err}");
}

#[tokio::test]
async fn duplicate_phone_is_already_exists() {
  let f = fixture().await;
  f.service.create_user(create("+7 999", Role::Client)).await.unwrap();
  let err = f
    .service
    .create_user(create("+7 999", Role::Coach))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[tokio::test]
async fn updating_the_password_rehashes_it() {
  let f = fixture().await;
  let user = f.service.create_user(create("+7 999", Role::Client)).await.unwrap();

  f.clock.advance(Duration::minutes(1));
  let updated = f
    .service
    .update_user(user.id, UserUpdate {
      password: Some("new-secret".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_ne!(updated.password_hash, user.password_hash);
  assert_eq!(updated.last_name, user.last_name);
  assert!(updated.updated_at > user.updated_at);

  assert!(f.service.login("+7 999", "jopa").await.is_err());
  assert!(f.service.login("+7 999", "new-secret").await.is_ok());
}

#[tokio::test]
async fn deleted_user_is_gone_for_the_service() {
  let f = fixture().await;
  let user = f.service.create_user(create("+7 999", Role::Client)).await.unwrap();
  let deleted = f.service.delete_user(user.id).await.unwrap();
  assert!(deleted.deleted);

  assert_eq!(
    f.service.get_user(user.id).await.unwrap_err().kind(),
    ErrorKind::NotFound
  );
  assert_eq!(
    f.service.login("+7 999", "jopa").await.unwrap_err().kind(),
    ErrorKind::InvalidCredentials
  );
  assert!(f.service.list_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn meeting_lifecycle() {
  let f = fixture().await;
  let (_, _, id) = booked(&f, Duration::days(1)).await;

  let later = t0() + Duration::days(2);
  let moved = f
    .service
    .update_meeting(id, MeetingPatch {
      start_at: Some(later),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(moved.start_at, later);
  assert_eq!(f.service.list_meetings().await.unwrap(), vec![moved.clone()]);

  let removed = f.service.delete_meeting(id).await.unwrap();
  assert_eq!(removed, moved);
  assert_eq!(
    f.service.get_meeting(id).await.unwrap_err().kind(),
    ErrorKind::NotFound
  );
  assert_eq!(f.store.meeting_history_count(id).await.unwrap(), 0);
}

// ─── Worker ──────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("channel down")]
struct ChannelDown;

/// Records what it was asked to send. The first `failures` calls fail.
#[derive(Default)]
struct RecordingNotifier {
  sent:     Mutex<Vec<(String, i64)>>,
  calls:    AtomicU32,
  failures: u32,
}

impl RecordingNotifier {
  fn failing(failures: u32) -> Self { Self { failures, ..Default::default() } }

  fn sent(&self) -> Vec<(String, i64)> { self.sent.lock().unwrap().clone() }
}

impl Notifier for RecordingNotifier {
  type Error = ChannelDown;

  async fn notify(
    &self,
    message: &str,
    recipient: &UserNotify,
  ) -> Result<(), ChannelDown> {
    let call = self.calls.fetch_add(1, Ordering::SeqCst);
    if call < self.failures {
      return Err(ChannelDown);
    }
    self
      .sent
      .lock()
      .unwrap()
      .push((message.to_owned(), recipient.meeting_id));
    Ok(())
  }
}

fn worker(
  f: &Fixture,
  notifier: RecordingNotifier,
) -> Worker<SqliteStore, RecordingNotifier, ManualClock> {
  Worker::new(f.store.clone(), notifier, f.clock.clone(), WorkerConfig {
    interval_secs: 3600,
    max_attempts:  3,
  })
}

#[tokio::test]
async fn one_tick_sends_one_reminder_then_none() {
  let f = fixture().await;
  let (_, _, meeting) = booked(&f, Duration::minutes(30)).await;
  let w = worker(&f, RecordingNotifier::default());

  let report = w.tick().await;
  assert_eq!((report.sent, report.failed), (1, 0));
  let sent = w.notifier().sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].1, meeting);
  assert_eq!(sent[0].0, "You have a training at 2023-01-01 09:30 UTC");
  assert!(f.service.get_meeting(meeting).await.unwrap().notified);

  let report = w.tick().await;
  assert_eq!((report.sent, report.failed), (0, 0));
  assert_eq!(w.notifier().sent().len(), 1);
}

#[tokio::test]
async fn reminder_waits_for_the_lead_window() {
  let f = fixture().await;
  let (_, _, meeting) = booked(&f, Duration::hours(3)).await;
  let w = worker(&f, RecordingNotifier::default());

  assert_eq!(w.tick().await.sent, 0);
  f.clock.advance(Duration::hours(2));
  assert_eq!(w.tick().await.sent, 1);
  assert!(f.service.get_meeting(meeting).await.unwrap().notified);
}

#[tokio::test]
async fn flaky_notifier_is_retried_within_the_tick() {
  let f = fixture().await;
  let (_, _, meeting) = booked(&f, Duration::minutes(10)).await;
  let w = worker(&f, RecordingNotifier::failing(2));

  let report = w.tick().await;
  assert_eq!((report.sent, report.failed), (1, 0));
  assert_eq!(w.notifier().calls.load(Ordering::SeqCst), 3);
  assert!(f.service.get_meeting(meeting).await.unwrap().notified);
}

#[tokio::test]
async fn failed_reminder_is_skipped_and_retried_next_tick() {
  let f = fixture().await;
  let (_, _, meeting) = booked(&f, Duration::minutes(10)).await;
  let w = worker(&f, RecordingNotifier::failing(3));

  let report = w.tick().await;
  assert_eq!((report.sent, report.failed), (0, 1));
  assert!(!f.service.get_meeting(meeting).await.unwrap().notified);

  let report = w.tick().await;
  assert_eq!((report.sent, report.failed), (1, 0));
  assert!(f.service.get_meeting(meeting).await.unwrap().notified);
}

/// Deletes the meeting while its reminder is being sent.
struct DeletingNotifier {
  store: Arc<SqliteStore>,
  calls: AtomicU32,
}

impl Notifier for DeletingNotifier {
  type Error = ChannelDown;

  async fn notify(
    &self,
    _message: &str,
    recipient: &UserNotify,
  ) -> Result<(), ChannelDown> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self
      .store
      .delete_meeting(recipient.meeting_id)
      .await
      .map_err(|_| ChannelDown)?;
    Ok(())
  }
}

#[tokio::test]
async fn meeting_deleted_mid_delivery_is_skipped_not_failed() {
  let f = fixture().await;
  let (_, _, meeting) = booked(&f, Duration::minutes(10)).await;
  let notifier = DeletingNotifier { store: f.store.clone(), calls: AtomicU32::new(0) };
  let w = Worker::new(f.store.clone(), notifier, f.clock.clone(), WorkerConfig {
    interval_secs: 3600,
    max_attempts:  3,
  });

  let report = w.tick().await;
  assert_eq!((report.sent, report.failed, report.skipped), (0, 0, 1));
  assert_eq!(w.notifier().calls.load(Ordering::SeqCst), 1);
  assert_eq!(
    f.service.get_meeting(meeting).await.unwrap_err().kind(),
    ErrorKind::NotFound
  );
  assert_eq!(w.tick().await, TickReport::default());
}

#[tokio::test]
async fn cancelled_before_start_does_nothing() {
  let f = fixture().await;
  booked(&f, Duration::minutes(10)).await;
  let w = worker(&f, RecordingNotifier::default());

  let cancel = CancellationToken::new();
  cancel.cancel();
  w.run(cancel).await;
  assert!(w.notifier().sent().is_empty());
}

#[tokio::test]
async fn run_stops_between_ticks_on_cancel() {
  let f = fixture().await;
  let (_, _, meeting) = booked(&f, Duration::minutes(10)).await;
  let w = worker(&f, RecordingNotifier::default());

  let cancel = CancellationToken::new();
  let handle = w.start(cancel.clone());

  for _ in 0..200 {
    if f.service.get_meeting(meeting).await.unwrap().notified {
      break;
    }
    tokio::time::sleep(StdDuration::from_millis(10)).await;
  }
  assert!(f.service.get_meeting(meeting).await.unwrap().notified);

  cancel.cancel();
  tokio::time::timeout(StdDuration::from_secs(5), handle)
    .await
    .expect("worker did not stop")
    .unwrap();
}

#[test]
fn reminder_text() {
  let item = UserNotify {
    user_id:    1,
    meeting_id: 2,
    last_name:  "Ivanov".into(),
    first_name: "Ivan".into(),
    phone:      "+7 999".into(),
    start_at:   Utc.with_ymd_and_hms(2023, 3, 8, 18, 5, 0).unwrap(),
    notified:   false,
  };
  assert_eq!(reminder_message(&item), "You have a training at 2023-03-08 18:05 UTC");
}
