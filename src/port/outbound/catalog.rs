//! Listing catalog port. Read-only from the core's point of view.

use async_trait::async_trait;

use crate::domain::{ListingId, ListingRecord};
use crate::error::Error;

/// Source of arbitrage listing metadata.
///
/// Returns raw records; validation into [`crate::domain::ArbitrageListing`]
/// happens in the router so a bad record fails its transaction instead of
/// the whole catalog.
#[async_trait]
pub trait ListingCatalog: Send + Sync {
    async fn get(&self, id: &ListingId) -> Result<Option<ListingRecord>, Error>;
}
