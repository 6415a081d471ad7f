//! Provider and tool error types.

use thiserror::Error;

/// Result type for tool handler operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Result type for registry operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while a tool handler runs.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments did not match the tool's input schema.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The call needs credentials the caller did not supply.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// The upstream API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Execution failed for another reason.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// HTTP transport error.
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ToolError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an execution failed error.
    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed(message.into())
    }

    /// Create an API error from a status code and response body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}

/// Errors raised while building the provider registry.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider id contains the namespace separator or is empty.
    #[error("Invalid provider id '{0}': must be non-empty and must not contain '__'")]
    InvalidId(String),

    /// A provider with the same id is already registered.
    #[error("Provider '{0}' is already registered")]
    DuplicateId(String),

    /// The provider could not build its HTTP client.
    #[error("Failed to initialize provider '{provider}': {message}")]
    Init { provider: String, message: String },
}
