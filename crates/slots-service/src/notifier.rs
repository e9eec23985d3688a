//! Notifier for deployments without a live delivery channel.

use std::convert::Infallible;

use slots_core::notify::{Notifier, UserNotify};

/// Writes reminders to the log instead of sending them anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  type Error = Infallible;

  async fn notify(
    &self,
    message: &str,
    recipient: &UserNotify,
  ) -> Result<(), Infallible> {
    tracing::info!(
      user_id = recipient.user_id,
      meeting_id = recipient.meeting_id,
      phone = %recipient.phone,
      "{message}"
    );
    Ok(())
  }
}
