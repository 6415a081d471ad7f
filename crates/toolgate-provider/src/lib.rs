//! Provider abstraction for toolgate.
//!
//! A provider is one integration (an analytics platform, a store, ...) that
//! exposes a fixed set of callable tools. The gateway never talks to a
//! provider directly; it goes through the [`ProviderRegistry`], which hands
//! out a fresh provider instance per request via a [`ProviderFactory`].
//!
//! # Adding a provider
//!
//! Implement [`Provider`] (only [`Provider::tools`] is required) and a
//! [`ProviderFactory`] for it, then register the factory when building the
//! registry. Nothing else in the gateway changes.

pub mod credentials;
pub mod error;
pub mod google_analytics;
pub mod registry;

pub use credentials::{AuthType, Credentials, CredentialsError, OAuth2Credentials};
pub use error::{ProviderError, ProviderResult, ToolError, ToolResult};
pub use registry::{
    namespaced, split_namespaced, ProviderRegistry, ProvidersConfig, NAMESPACE_SEPARATOR,
};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Static metadata describing a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    /// Stable id, used as the namespace prefix for its tools.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Display description.
    pub description: &'static str,
    /// Which credentials a caller has to supply.
    pub auth_type: AuthType,
}

/// Invokes a tool with the call's arguments object.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool. `args` is the `arguments` object from the request; each
    /// key is one named parameter from the tool's input schema.
    async fn call(&self, args: Value) -> ToolResult<Value>;
}

/// One invocable operation of a provider.
#[derive(Clone)]
pub struct ToolDefinition {
    /// Name, unique within the owning provider.
    pub name: String,
    /// Human-readable summary.
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub input_schema: Value,
    /// Handler bound to the provider instance that produced this definition.
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler,
        }
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// The capability set every provider exposes.
pub trait Provider: Send + Sync {
    /// Provider metadata.
    fn info(&self) -> &ProviderInfo;

    /// All tools of this provider, in a stable order.
    fn tools(&self) -> Vec<ToolDefinition>;

    /// Find a tool by name.
    fn tool_by_name(&self, name: &str) -> Option<ToolDefinition> {
        self.tools().into_iter().find(|tool| tool.name == name)
    }
}

/// A boxed provider for dynamic dispatch.
pub type BoxedProvider = Box<dyn Provider>;

/// Builds provider instances.
///
/// `create` is called once per request. Listing passes `None`; calls pass the
/// caller's credentials for that request only.
pub trait ProviderFactory: Send + Sync {
    /// Metadata of the providers this factory builds.
    fn info(&self) -> &ProviderInfo;

    /// Build a new provider instance.
    fn create(&self, credentials: Option<Credentials>) -> BoxedProvider;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn call(&self, args: Value) -> ToolResult<Value> {
            Ok(args)
        }
    }

    static INFO: ProviderInfo = ProviderInfo {
        id: "demo",
        name: "Demo",
        description: "Demo provider",
        auth_type: AuthType::None,
    };

    struct Demo;

    impl Provider for Demo {
        fn info(&self) -> &ProviderInfo {
            &INFO
        }

        fn tools(&self) -> Vec<ToolDefinition> {
            vec![
                ToolDefinition::new("first", "First tool", json!({"type": "object"}), Arc::new(Echo)),
                ToolDefinition::new("second", "Second tool", json!({"type": "object"}), Arc::new(Echo)),
                ToolDefinition::new("second", "Shadowed", json!({"type": "object"}), Arc::new(Echo)),
            ]
        }
    }

    #[test]
    fn test_tool_by_name_finds_first_match() {
        let provider = Demo;
        let tool = provider.tool_by_name("second").unwrap();
        assert_eq!(tool.description, "Second tool");
    }

    #[test]
    fn test_tool_by_name_missing() {
        assert!(Demo.tool_by_name("third").is_none());
    }

    #[test]
    fn test_tool_definition_debug_omits_handler() {
        let tool = ToolDefinition::new("echo", "Echo", json!({}), Arc::new(Echo));
        let debug = format!("{tool:?}");
        assert!(debug.contains("echo"));
        assert!(!debug.contains("handler"));
    }

    #[tokio::test]
    async fn test_handler_receives_arguments() {
        let tool = Demo.tool_by_name("first").unwrap();
        let out = tool.handler.call(json!({"x": 1})).await.unwrap();
        assert_eq!(out, json!({"x": 1}));
    }
}
