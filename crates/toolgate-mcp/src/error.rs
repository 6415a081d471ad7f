//! Tool call error types.

use crate::protocol::JsonRpcError;
use thiserror::Error;
use toolgate_provider::{CredentialsError, ToolError};

/// Result type for tool call dispatch.
pub type McpResult<T> = Result<T, McpError>;

/// Reasons a `tools/call` request fails.
#[derive(Debug, Error)]
pub enum McpError {
    /// `params` could not be read as call parameters.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// No tool name was given.
    #[error("Tool name is required")]
    MissingToolName,

    /// Tool name lacks the provider prefix.
    #[error("Invalid tool name format: {0}. Expected 'provider__tool_name'")]
    InvalidToolName(String),

    /// No provider is registered under the prefix.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// The call carried no access token.
    #[error("No access_token provided for {0}")]
    MissingAccessToken(String),

    /// The credential bag does not fit the provider's auth type.
    #[error("Invalid credentials for {provider}: {source}")]
    InvalidCredentials {
        provider: String,
        #[source]
        source: CredentialsError,
    },

    /// The provider has no tool with that name.
    #[error("Unknown tool: {tool} for provider {provider}")]
    UnknownTool { provider: String, tool: String },

    /// The tool ran and failed.
    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl McpError {
    /// Create an unknown tool error.
    pub fn unknown_tool(provider: impl Into<String>, tool: impl Into<String>) -> Self {
        Self::UnknownTool {
            provider: provider.into(),
            tool: tool.into(),
        }
    }

    /// The JSON-RPC error reported to the caller.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        match self {
            McpError::InvalidParams(detail) => JsonRpcError::invalid_params(detail.clone()),
            other => JsonRpcError::tool_call_failed(other.to_string()),
        }
    }
}
