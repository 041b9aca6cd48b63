//! Notification adapters.
//!
//! Implements the `port::outbound::notifier::Notifier` trait for alert
//! backends beyond the logging notifier.

pub mod webhook;

pub use webhook::WebhookNotifier;
