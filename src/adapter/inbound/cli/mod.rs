//! CLI module graph.

pub mod command;
pub mod diagnostic;
pub mod dispatch;
pub mod output;
pub mod profit;
pub mod queue;
pub mod sla;
pub mod stats;
pub mod transaction;
