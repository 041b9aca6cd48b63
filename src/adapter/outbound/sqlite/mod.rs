//! SQLite persistence adapters.
//!
//! Provides the SQLite-backed transaction store using Diesel ORM.

pub mod database;
pub mod store;

pub use store::SqliteTransactionStore;
