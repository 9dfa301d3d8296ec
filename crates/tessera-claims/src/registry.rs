//! Provider lookup by identifier.

use std::collections::HashMap;
use std::sync::Arc;

use crate::provider::{ClaimProvider, Shortcode};

/// Providers keyed by their stable identifier.
///
/// Built at startup (or per request for tenant-specific providers) and then
/// only read.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ClaimProvider>>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the builtin shortcode catalogue.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for shortcode in Shortcode::ALL {
            registry.register(Arc::new(shortcode));
        }
        registry
    }

    /// Register a provider, returning the one it replaced.
    pub fn register(&mut self, provider: Arc<dyn ClaimProvider>) -> Option<Arc<dyn ClaimProvider>> {
        let identifier = provider.identifier().to_string();
        tracing::debug!(identifier = %identifier, "Registered claim provider");
        self.providers.insert(identifier, provider)
    }

    pub fn get(&self, identifier: &str) -> Option<&Arc<dyn ClaimProvider>> {
        self.providers.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.providers.contains_key(identifier)
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.identifiers())
            .finish()
    }
}
