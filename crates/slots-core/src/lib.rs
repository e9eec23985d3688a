//! Core types and trait definitions for the timeslots scheduler.
//!
//! This crate is deliberately free of database and crypto dependencies.
//! Every other crate depends on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod changes;
pub mod claims;
pub mod clock;
pub mod error;
pub mod meeting;
pub mod notify;
pub mod store;
pub mod user;

pub use error::{Classify, Error, ErrorKind, Result};
