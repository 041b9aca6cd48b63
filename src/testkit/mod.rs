//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`doubles`] - Scripted port implementations: `ScriptedSource`,
//!   `ScriptedPaymentProcessor`, `RecordingNotifier`, `FlakyQueue`.
//! - [`domain`] - Builders for listings, transactions, and queue drafts.
//! - [`config`] - Router and SLA configs with zero delays.
//! - [`harness`] - A fully wired in-memory router.

pub mod config;
pub mod domain;
pub mod doubles;
pub mod harness;
