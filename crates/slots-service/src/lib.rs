//! Orchestration for the timeslots scheduler.
//!
//! [`ScheduleService`] fronts any [`slots_core::store::ScheduleStore`] for
//! request/response callers. [`Worker`] is the long-lived background loop
//! that delivers meeting reminders through a
//! [`slots_core::notify::Notifier`].

pub mod error;
pub mod notifier;
pub mod service;
pub mod worker;

pub use error::{Error, Operation, Result};
pub use notifier::LogNotifier;
pub use service::{CreateUser, ScheduleService, UserUpdate};
pub use worker::{TickReport, Worker, WorkerConfig, reminder_message};

#[cfg(test)]
mod tests;
