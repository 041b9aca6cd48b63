//! Credential resolvers.

use std::collections::HashMap;

use crate::domain::CredentialRef;
use crate::port::outbound::secret::{CredentialResolver, Secret};

/// Resolves a credential handle as the name of an environment variable.
///
/// `.env` files are loaded into the environment at startup, so handles can
/// live there too.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentialResolver;

impl CredentialResolver for EnvCredentialResolver {
    fn resolve(&self, reference: &CredentialRef) -> Option<Secret> {
        std::env::var(reference.as_str())
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(Secret::new)
    }
}

/// Fixed handle-to-secret map.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentialResolver {
    secrets: HashMap<String, String>,
}

impl StaticCredentialResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, reference: impl Into<String>, secret: impl Into<String>) -> Self {
        self.secrets.insert(reference.into(), secret.into());
        self
    }
}

impl CredentialResolver for StaticCredentialResolver {
    fn resolve(&self, reference: &CredentialRef) -> Option<Secret> {
        self.secrets
            .get(reference.as_str())
            .filter(|v| !v.is_empty())
            .map(|v| Secret::new(v.clone()))
    }
}
