//! Bounded retry for gateway operations.

use std::future::Future;

use slots_core::Classify;

use crate::{Error, Op, Result};

/// Attempts made per operation before giving up.
pub const MAX_ATTEMPTS: u32 = 3;

/// Run `attempt` up to [`MAX_ATTEMPTS`] times.
///
/// Only transient failures are retried. Not-found and already-exists come
/// back unwrapped on the first occurrence; every other failure is wrapped in
/// [`Error::Failed`] with `op` so the caller can tell what was being done.
pub async fn with_retries<T, F, Fut>(op: Op, mut attempt: F) -> Result<T>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T>>,
{
  let mut attempts = 0;
  loop {
    attempts += 1;
    match attempt().await {
      Ok(value) => return Ok(value),
      Err(e) if e.is_domain() => return Err(e),
      Err(e) if e.kind().is_transient() && attempts < MAX_ATTEMPTS => {
        tracing::warn!(%op, attempts, error = %e, "transient store error, retrying");
      }
      Err(e) => {
        return Err(Error::Failed { op, attempts, source: Box::new(e) });
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};

  use slots_core::ErrorKind;

  use super::*;

  fn busy() -> Error {
    Error::Database(tokio_rusqlite::Error::Rusqlite(
      rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
        None,
      ),
    ))
  }

  const OP: Op = Op::new("get", "user").with_id(7);

  #[tokio::test]
  async fn succeeds_on_third_attempt() {
    let calls = AtomicU32::new(0);
    let result = with_retries(OP, || {
      let n = calls.fetch_add(1, Ordering::SeqCst);
      async move { if n < 2 { Err(busy()) } else { Ok(42) } }
    })
    .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn not_found_is_not_retried() {
    let calls = AtomicU32::new(0);
    let err = with_retries(OP, || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err::<(), _>(Error::UserNotFound(7)) }
    })
    .await
    .unwrap_err();

    assert!(matches!(err, Error::UserNotFound(7)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn exhaustion_wraps_last_error_with_context() {
    let calls = AtomicU32::new(0);
    let err = with_retries(OP, || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err::<(), _>(busy()) }
    })
    .await
    .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    assert_eq!(err.kind(), ErrorKind::Transient);
    assert!(matches!(err, Error::Failed { attempts: 3, .. }));
    assert!(err.to_string().starts_with("get user 7 failed after 3"));
  }

  #[tokio::test]
  async fn permanent_failure_is_wrapped_without_retry() {
    let calls = AtomicU32::new(0);
    let err = with_retries(OP, || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err::<(), _>(Error::DateParse("garbage".into())) }
    })
    .await
    .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(matches!(err, Error::Failed { attempts: 1, .. }));
  }
}
