//! Source adapter registry.
//!
//! Maps each listing to the adapter that fulfills it: one automated adapter per
//! API-backed platform, and a single manual adapter shared by every
//! marketplace platform.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::adapter::outbound::source::ManualSource;
use crate::domain::{AccessKind, ArbitrageListing, DomainError, SourcePlatform};
use crate::port::outbound::source::AutomatedSource;

/// Where a listing gets fulfilled.
pub enum Route<'a> {
    Automated(&'a dyn AutomatedSource),
    Manual(&'a ManualSource),
}

impl fmt::Debug for Route<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Automated(_) => f.write_str("Route::Automated"),
            Self::Manual(_) => f.write_str("Route::Manual"),
        }
    }
}

/// Registry of source adapters, keyed by platform.
///
/// Use [`SourceRegistry::builder`] to register automated adapters.
pub struct SourceRegistry {
    automated: HashMap<SourcePlatform, Arc<dyn AutomatedSource>>,
    manual: ManualSource,
}

impl SourceRegistry {
    /// Create a registry with only the manual adapter.
    #[must_use]
    pub fn new(manual: ManualSource) -> Self {
        Self {
            automated: HashMap::new(),
            manual,
        }
    }

    /// Create a builder around the manual adapter.
    #[must_use]
    pub fn builder(manual: ManualSource) -> SourceRegistryBuilder {
        SourceRegistryBuilder {
            registry: Self::new(manual),
        }
    }

    /// Register the adapter for an automated platform, replacing any previous one.
    pub fn register(&mut self, platform: SourcePlatform, source: Arc<dyn AutomatedSource>) {
        self.automated.insert(platform, source);
    }

    /// Platforms with an automated adapter.
    #[must_use]
    pub fn automated_platforms(&self) -> Vec<SourcePlatform> {
        let mut platforms: Vec<_> = self.automated.keys().copied().collect();
        platforms.sort();
        platforms
    }

    /// The manual adapter.
    #[must_use]
    pub const fn manual(&self) -> &ManualSource {
        &self.manual
    }

    /// Pick the adapter for a listing.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnsupportedPlatform`] when the listing is on an
    /// automated platform nobody registered an adapter for.
    pub fn select(&self, listing: &ArbitrageListing) -> Result<Route<'_>, DomainError> {
        let platform = listing.platform();
        match platform.access() {
            AccessKind::Manual => Ok(Route::Manual(&self.manual)),
            AccessKind::Automated => self
                .automated
                .get(&platform)
                .map(|source| Route::Automated(source.as_ref()))
                .ok_or_else(|| DomainError::UnsupportedPlatform {
                    tag: platform.as_str().to_string(),
                }),
        }
    }
}

/// Builder for [`SourceRegistry`].
pub struct SourceRegistryBuilder {
    registry: SourceRegistry,
}

impl SourceRegistryBuilder {
    /// Register an automated adapter.
    #[must_use]
    pub fn automated(mut self, platform: SourcePlatform, source: Arc<dyn AutomatedSource>) -> Self {
        self.registry.register(platform, source);
        self
    }

    #[must_use]
    pub fn build(self) -> SourceRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::queue::MemoryQueueStore;
    use crate::testkit::domain::listing;
    use crate::testkit::doubles::ScriptedSource;

    fn manual() -> ManualSource {
        ManualSource::new(Arc::new(MemoryQueueStore::new()))
    }

    #[test]
    fn marketplace_listings_route_to_the_manual_adapter() {
        let registry = SourceRegistry::new(manual());
        let route = registry.select(&listing(SourcePlatform::Fiverr, 1500)).unwrap();
        assert!(matches!(route, Route::Manual(_)));
    }

    #[test]
    fn automated_listing_without_adapter_is_unsupported() {
        let registry = SourceRegistry::new(manual());
        let err = registry
            .select(&listing(SourcePlatform::RapidApi, 100))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::UnsupportedPlatform {
                tag: "rapidapi".into()
            }
        );
    }

    #[test]
    fn registered_automated_adapter_is_selected() {
        let registry = SourceRegistry::builder(manual())
            .automated(SourcePlatform::HuggingFace, Arc::new(ScriptedSource::ok_json(serde_json::json!({}))))
            .build();
        let route = registry
            .select(&listing(SourcePlatform::HuggingFace, 0))
            .unwrap();
        assert!(matches!(route, Route::Automated(_)));
        assert_eq!(registry.automated_platforms(), vec![SourcePlatform::HuggingFace]);
    }
}
