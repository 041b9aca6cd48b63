//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams between the fulfillment core and everything it talks
//! to. Adapters in [`crate::adapter`] implement them; the application layer
//! only ever holds trait objects.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!                    │  router / refund / sla  │
//!                    └────────────┬────────────┘
//!        ┌──────────────┬─────────┼──────────┬──────────────┐
//!        ▼              ▼         ▼          ▼              ▼
//!   ┌─────────┐   ┌──────────┐ ┌───────┐ ┌─────────┐  ┌──────────┐
//!   │ Source  │   │  Queue   │ │ Store │ │ Payment │  │ Notifier │
//!   └─────────┘   └──────────┘ └───────┘ └─────────┘  └──────────┘
//! ```

pub mod outbound;
