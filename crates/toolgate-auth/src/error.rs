//! Error types for the OAuth flow.

use axum::http::StatusCode;
use thiserror::Error;

/// Result type for flow operations.
pub type FlowResult<T> = Result<T, FlowError>;

/// Why a flow state token was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// Not `<payload>.<signature>` or not decodable.
    #[error("malformed state token")]
    Malformed,

    /// Signature does not match the payload.
    #[error("state signature mismatch")]
    BadSignature,

    /// Issued too long ago or too far in the future.
    #[error("state token expired")]
    Expired,

    /// The signing key could not be used.
    #[error("state key error: {0}")]
    Key(String),
}

/// Errors that end an OAuth flow.
#[derive(Debug, Error)]
pub enum FlowError {
    /// `workspace_id` missing or empty on init.
    #[error("workspace_id is required")]
    MissingWorkspace,

    /// No scope set is known for the provider.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// The caller's return URL is not an absolute http(s) URL.
    #[error("Invalid redirect_uri: {0}")]
    InvalidRedirectUri(String),

    /// The callback URL could not be derived from the request.
    #[error("Cannot determine callback URL: {0}")]
    CallbackUrl(String),

    /// A required setting is absent.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// The identity provider reported an error to the callback.
    #[error("Authorization denied: {0}")]
    Denied(String),

    /// `code` or `state` absent on the callback.
    #[error("Missing parameters")]
    MissingParameters,

    /// The state token failed verification.
    #[error("Invalid state: {0}")]
    InvalidState(#[from] StateError),

    /// The code-for-token exchange failed.
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// The bridge did not accept the tokens.
    #[error("Failed to save credentials: {0}")]
    Bridge(String),

    /// The outbound HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl FlowError {
    /// Create a token exchange error.
    pub fn token_exchange(message: impl Into<String>) -> Self {
        Self::TokenExchange(message.into())
    }

    /// Create a bridge error.
    pub fn bridge(message: impl Into<String>) -> Self {
        Self::Bridge(message.into())
    }

    /// HTTP status reported for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            FlowError::NotConfigured(_) | FlowError::Bridge(_) | FlowError::Client(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
