//! Outbound adapters: implementations of the outbound ports.

pub mod catalog;
pub mod memory;
pub mod notifier;
pub mod payment;
pub mod queue;
pub mod secret;
pub mod source;
pub mod sqlite;
