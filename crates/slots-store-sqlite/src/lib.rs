//! SQLite persistence gateway for the timeslots scheduler.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every operation goes through a small
//! retry loop that only retries transient driver failures.

mod encode;
mod schema;
mod store;

pub mod error;
pub mod retry;

pub use error::{Error, Op, Result};
pub use store::SqliteStore;
