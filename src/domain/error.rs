//! Domain validation errors for core domain types.
//!
//! These errors are returned when domain invariants are violated: bad profit
//! arguments, listings referencing unknown platforms, automated listings
//! without an endpoint, and illegal state transitions.
//!
//! # Examples
//!
//! ```
//! use arbfill::domain::error::DomainError;
//! use arbfill::domain::platform::SourcePlatform;
//!
//! let result: Result<SourcePlatform, DomainError> = "etsy".parse();
//! assert!(matches!(result, Err(DomainError::UnsupportedPlatform { .. })));
//! ```

use thiserror::Error;

use super::money::Cents;
use super::transaction::TransactionState;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Buyer-paid amount was negative.
    #[error("invalid input: buyer paid must be non-negative, got {buyer_paid}")]
    NegativeBuyerPaid {
        /// The invalid amount.
        buyer_paid: Cents,
    },

    /// Source cost was negative.
    #[error("invalid input: source cost must be non-negative, got {source_cost}")]
    NegativeSourceCost {
        /// The invalid amount.
        source_cost: Cents,
    },

    /// Source cost exceeds what the buyer paid, so there is no markup.
    #[error("invalid input: source cost {source_cost} exceeds buyer paid {buyer_paid}")]
    SourceCostExceedsPaid {
        /// The buyer-paid amount.
        buyer_paid: Cents,
        /// The source cost.
        source_cost: Cents,
    },

    /// Fees on this amount do not fit in 64-bit cents.
    #[error("invalid input: amount too large: {buyer_paid}")]
    AmountTooLarge {
        /// The buyer-paid amount.
        buyer_paid: Cents,
    },

    /// Listing metadata references a platform with no adapter.
    #[error("unsupported platform: {tag}")]
    UnsupportedPlatform {
        /// The raw platform tag.
        tag: String,
    },

    /// An automated platform listing is missing its API endpoint.
    #[error("automated platform {platform} requires a non-empty API endpoint")]
    MissingEndpoint {
        /// The platform tag.
        platform: String,
    },

    /// The state machine rejected a transition.
    #[error("illegal transition {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: TransactionState,
        /// Requested state.
        to: TransactionState,
    },

    /// A manual completion used a delivery kind reserved for automated sources.
    #[error("delivery kind {kind} cannot complete a manual task")]
    InvalidManualDelivery {
        /// The rejected delivery kind.
        kind: &'static str,
    },
}

impl DomainError {
    /// Whether this error belongs to the `InvalidInput` class of the profit
    /// calculator.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::NegativeBuyerPaid { .. }
                | Self::NegativeSourceCost { .. }
                | Self::SourceCostExceedsPaid { .. }
                | Self::AmountTooLarge { .. }
        )
    }
}
