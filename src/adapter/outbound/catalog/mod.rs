//! Listing catalog adapters.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::domain::{ListingId, ListingRecord};
use crate::error::{ConfigError, Error};
use crate::port::outbound::catalog::ListingCatalog;

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    listings: Vec<ListingRecord>,
}

/// Catalog loaded once from a TOML file of `[[listings]]` tables.
///
/// ```toml
/// [[listings]]
/// id = "logo-design"
/// name = "Logo design"
/// platform = "fiverr"
/// source_url = "https://www.fiverr.com/acme/logo"
/// source_cost = 2500
/// ```
#[derive(Debug)]
pub struct FileCatalog {
    listings: HashMap<ListingId, ListingRecord>,
}

impl FileCatalog {
    /// Read and parse the catalog. Records are validated when routed, not here.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file is unreadable or not valid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    /// Parse catalog TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed input.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = toml::from_str(content).map_err(ConfigError::Parse)?;
        Ok(Self {
            listings: file
                .listings
                .into_iter()
                .map(|record| (record.id.clone(), record))
                .collect(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

#[async_trait]
impl ListingCatalog for FileCatalog {
    async fn get(&self, id: &ListingId) -> Result<Option<ListingRecord>, Error> {
        Ok(self.listings.get(id).cloned())
    }
}

/// Mutable in-memory catalog.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    listings: RwLock<HashMap<ListingId, ListingRecord>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a listing.
    pub fn insert(&self, record: ListingRecord) {
        self.listings.write().insert(record.id.clone(), record);
    }

    /// Delist `id`. Sales already recorded against it will fail to resolve.
    pub fn remove(&self, id: &ListingId) -> Option<ListingRecord> {
        self.listings.write().remove(id)
    }
}

#[async_trait]
impl ListingCatalog for MemoryCatalog {
    async fn get(&self, id: &ListingId) -> Result<Option<ListingRecord>, Error> {
        Ok(self.listings.read().get(id).cloned())
    }
}
