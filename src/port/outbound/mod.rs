//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe infrastructure dependencies: source platforms,
//! the manual queue, transaction storage, the payment processor, secret
//! resolution, the listing catalog, and notifications.

pub mod catalog;
pub mod notifier;
pub mod payment;
pub mod queue;
pub mod secret;
pub mod source;
pub mod store;
