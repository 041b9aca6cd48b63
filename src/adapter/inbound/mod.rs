//! Inbound adapters: the ways operators drive the service.

pub mod cli;
