//! Background reminder delivery.
//!
//! Each tick reads the meetings whose reminder is due, sends one message per
//! meeting through the [`Notifier`] and flags the meeting as notified. A
//! reminder can be sent twice if the process dies between the send and the
//! flag; it is never lost.

use std::{sync::Arc, time::Duration};

use serde::Deserialize;
use slots_core::{
  Classify, ErrorKind,
  clock::Clock,
  notify::{Notifier, UserNotify},
  store::ScheduleStore,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
  /// Pause between ticks, in seconds.
  pub interval_secs: u64,
  /// Tries per reminder within one tick.
  pub max_attempts:  u32,
}

impl Default for WorkerConfig {
  fn default() -> Self { Self { interval_secs: 5, max_attempts: 3 } }
}

impl WorkerConfig {
  /// Never shorter than one second.
  pub fn interval(&self) -> Duration {
    Duration::from_secs(self.interval_secs.max(1))
  }
}

/// Outcome of one [`Worker::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
  pub sent:    usize,
  pub failed:  usize,
  /// Meetings deleted between the query and the notified flag.
  pub skipped: usize,
}

enum Delivery {
  Sent,
  Failed,
  Gone,
}

pub struct Worker<S, N, C> {
  store:    Arc<S>,
  notifier: N,
  clock:    Arc<C>,
  config:   WorkerConfig,
}

/// The reminder text sent to a client.
pub fn reminder_message(item: &UserNotify) -> String {
  format!(
    "You have a training at {}",
    item.start_at.format("%Y-%m-%d %H:%M UTC")
  )
}

impl<S, N, C> Worker<S, N, C>
where
  S: ScheduleStore + 'static,
  N: Notifier + 'static,
  C: Clock + 'static,
{
  pub fn new(
    store: Arc<S>,
    notifier: N,
    clock: Arc<C>,
    config: WorkerConfig,
  ) -> Self {
    Self { store, notifier, clock, config }
  }

  pub fn notifier(&self) -> &N { &self.notifier }

  /// Spawn [`Worker::run`] onto the runtime.
  pub fn start(self, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move { self.run(cancel).await })
  }

  /// Tick, then wait for the interval or cancellation. Cancellation is only
  /// observed between ticks, so a batch in progress always completes.
  pub async fn run(&self, cancel: CancellationToken) {
    tracing::info!(
      interval = ?self.config.interval(),
      max_attempts = self.config.max_attempts,
      "reminder worker started"
    );

    loop {
      if cancel.is_cancelled() {
        break;
      }

      let report = self.tick().await;
      if report != TickReport::default() {
        tracing::info!(
          sent = report.sent,
          failed = report.failed,
          skipped = report.skipped,
          "reminder tick"
        );
      }

      tokio::select! {
        _ = tokio::time::sleep(self.config.interval()) => {},
        _ = cancel.cancelled() => break,
      }
    }

    tracing::info!("reminder worker shutting down");
  }

  /// One pass over the due reminders. Failures are logged and counted; they
  /// never stop the worker.
  pub async fn tick(&self) -> TickReport {
    let mut report = TickReport::default();

    let due = match self.store.pending_notifications(self.clock.now()).await {
      Ok(due) => due,
      Err(e) => {
        tracing::error!(kind = %e.kind(), "failed to load due reminders: {e}");
        return report;
      }
    };

    for item in &due {
      match self.deliver(item).await {
        Delivery::Sent => report.sent += 1,
        Delivery::Failed => report.failed += 1,
        Delivery::Gone => report.skipped += 1,
      }
    }
    report
  }

  /// Send and flag one reminder. Once the send has succeeded only the flag
  /// is retried, so a flaky store does not cause repeated messages within a
  /// tick.
  async fn deliver(&self, item: &UserNotify) -> Delivery {
    let message = reminder_message(item);
    let mut sent = false;

    for attempt in 1..=self.config.max_attempts.max(1) {
      if !sent {
        if let Err(e) = self.notifier.notify(&message, item).await {
          tracing::warn!(
            meeting_id = item.meeting_id,
            attempt,
            "reminder send failed: {e}"
          );
          continue;
        }
        sent = true;
      }

      match self.store.mark_notified(item.meeting_id).await {
        Ok(()) => {
          tracing::debug!(
            meeting_id = item.meeting_id,
            user_id = item.user_id,
            "reminder sent"
          );
          return Delivery::Sent;
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
          tracing::debug!(
            meeting_id = item.meeting_id,
            "meeting deleted before it could be flagged"
          );
          return Delivery::Gone;
        }
        Err(e) => tracing::warn!(
          meeting_id = item.meeting_id,
          attempt,
          kind = %e.kind(),
          "marking meeting notified failed: {e}"
        ),
      }
    }

    tracing::error!(
      meeting_id = item.meeting_id,
      sent,
      "giving up on reminder until the next tick"
    );
    Delivery::Failed
  }
}
