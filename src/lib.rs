//! Arbfill - fulfillment orchestration for arbitrage listings.
//!
//! A buyer pays for a listing; the service sources it from a third-party
//! platform and keeps the margin. Automated platforms are called over HTTP.
//! Manual platforms go to a durable work queue for a human operator. Any
//! failure after payment ends in a full refund.
//!
//! # Modules
//!
//! - [`domain`] - Profit math, the transaction state machine, listings, tasks
//! - [`port`] - Traits for sources, the queue, the store, payments, alerts
//! - [`application`] - Router, refund coordinator, SLA monitor, stats
//! - [`adapter`] - HTTP sources, JSONL queue, SQLite store, operator CLI
//! - [`infrastructure`] - Configuration and service wiring
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```
//! use arbfill::domain::{ProfitCalculator, SourcePlatform};
//!
//! let breakdown = ProfitCalculator::default()
//!     .compute(5000, 2000, SourcePlatform::Fiverr)
//!     .unwrap();
//! assert_eq!(breakdown.net_profit, 2275);
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
