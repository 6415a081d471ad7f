//! Provider registry.

use crate::error::{ProviderError, ProviderResult};
use crate::google_analytics::{GoogleAnalyticsEndpoints, GoogleAnalyticsFactory};
use crate::ProviderFactory;
use std::sync::Arc;
use std::time::Duration;

/// Separator between provider id and tool name in a namespaced tool name.
pub const NAMESPACE_SEPARATOR: &str = "__";

/// Build a namespaced tool name.
pub fn namespaced(provider_id: &str, tool_name: &str) -> String {
    format!("{provider_id}{NAMESPACE_SEPARATOR}{tool_name}")
}

/// Split a namespaced tool name on the first separator.
///
/// The tool part may itself contain further separators.
pub fn split_namespaced(name: &str) -> Option<(&str, &str)> {
    name.split_once(NAMESPACE_SEPARATOR)
}

/// Settings shared by the built-in providers.
#[derive(Debug, Clone)]
pub struct ProvidersConfig {
    /// Timeout applied to every upstream API request.
    pub http_timeout: Duration,
    /// Google Analytics API base URLs.
    pub google_analytics: GoogleAnalyticsEndpoints,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
            google_analytics: GoogleAnalyticsEndpoints::default(),
        }
    }
}

/// Registry of available providers, in registration order.
///
/// Built once at startup and shared read-only afterwards.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with all built-in providers.
    pub fn with_builtins(config: &ProvidersConfig) -> ProviderResult<Self> {
        let mut registry = Self::new();

        registry.register(Arc::new(GoogleAnalyticsFactory::new(
            config.google_analytics.clone(),
            config.http_timeout,
        )?))?;

        Ok(registry)
    }

    /// Register a provider factory.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) -> ProviderResult<()> {
        let id = factory.info().id;
        if id.is_empty() || id.contains(NAMESPACE_SEPARATOR) {
            return Err(ProviderError::InvalidId(id.to_string()));
        }
        if self.get(id).is_some() {
            return Err(ProviderError::DuplicateId(id.to_string()));
        }
        self.providers.push(factory);
        Ok(())
    }

    /// Get a provider factory by id.
    pub fn get(&self, id: &str) -> Option<&Arc<dyn ProviderFactory>> {
        self.providers.iter().find(|p| p.info().id == id)
    }

    /// List all provider ids.
    pub fn list(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.info().id).collect()
    }

    /// Get all provider factories.
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn ProviderFactory>> {
        self.providers.iter()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
