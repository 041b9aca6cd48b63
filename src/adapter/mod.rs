//! Implementations of ports (hexagonal adapters).
//!
//! - [`outbound`] - sources, queue, stores, payment processor, alert sinks
//! - [`inbound`] - the operator CLI

pub mod inbound;
pub mod outbound;
