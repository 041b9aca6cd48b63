//! Pure domain types and rules. No I/O.
//!
//! - [`profit`] - fee breakdown for a sale
//! - [`platform`] / [`listing`] - source platforms and the sourcing contract
//! - [`transaction`] - the fulfillment state machine
//! - [`task`] - manual queue entries
//! - [`delivery`] - what the buyer receives

pub mod delivery;
pub mod error;
pub mod id;
pub mod listing;
pub mod money;
pub mod platform;
pub mod profit;
pub mod stats;
pub mod task;
pub mod transaction;

pub use delivery::{DeliveryPayload, DeliveryRecord};
pub use error::DomainError;
pub use id::{BuyerId, CredentialRef, ListingId, PaymentReference, TaskNumber, TransactionId};
pub use listing::{ArbitrageListing, Capability, EndpointConfig, HttpMethod, ListingRecord};
pub use money::{format_cents, Cents, Rate};
pub use platform::{AccessKind, SourcePlatform};
pub use profit::{FeeSchedule, ProfitBreakdown, ProfitCalculator};
pub use stats::{PlatformStats, StatsSummary};
pub use task::{ManualTask, TaskDraft, TaskStatus};
pub use transaction::{Transaction, TransactionState, TransactionUpdate};
