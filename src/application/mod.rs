//! Application services (use cases).
//!
//! These services orchestrate domain logic and coordinate adapters
//! to implement fulfillment, refunds, SLA monitoring, and reporting.

pub mod dispatch;
pub mod refund;
pub mod router;
pub mod sla;
pub mod stats;

pub use dispatch::{Route, SourceRegistry};
pub use refund::{RefundCoordinator, RefundPolicy};
pub use router::{
    FulfillmentRouter, FulfillmentStatus, NewSale, ProcessOutcome, RouterConfig, RouterPorts,
};
pub use sla::{SlaConfig, SlaMonitor, SweepReport};
pub use stats::StatsAggregator;
