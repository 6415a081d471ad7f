//! HTTP transport for the JSON-RPC endpoint.
//!
//! # Endpoints
//!
//! - `POST /mcp` - JSON-RPC 2.0 request, always answered with HTTP 200
//! - `OPTIONS /mcp` - CORS preflight, answered with `{}`
//!
//! When a gateway secret is configured, callers present it as
//! `Authorization: Bearer <secret>` or `X-API-Key: <secret>`. A mismatch is
//! logged; it is only rejected when enforcement is switched on.

use crate::dispatch::Dispatcher;
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde_json::json;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Path of the JSON-RPC endpoint.
pub const MCP_PATH: &str = "/mcp";

/// State for the JSON-RPC HTTP endpoint.
#[derive(Clone)]
pub struct McpHttpState {
    dispatcher: Dispatcher,
    secret: Option<Arc<str>>,
    require_auth: bool,
}

impl McpHttpState {
    /// Create a new state without a gateway secret.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            secret: None,
            require_auth: false,
        }
    }

    /// Set the shared secret callers are expected to present.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        self.secret = (!secret.is_empty()).then(|| Arc::from(secret));
        self
    }

    /// Reject requests with a missing or wrong secret instead of only
    /// logging them.
    pub fn require_auth(mut self, require: bool) -> Self {
        self.require_auth = require;
        self
    }

    /// Check if a gateway secret is configured.
    pub fn has_auth(&self) -> bool {
        self.secret.is_some()
    }

    /// The dispatcher serving requests.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Extract the presented secret from request headers.
///
/// Supports both `X-API-Key` header and `Authorization: Bearer <key>` format.
fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(key);
    }

    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        if let Some(key) = auth.strip_prefix("Bearer ") {
            return Some(key.trim());
        }
    }

    None
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Middleware checking the gateway secret.
async fn gateway_secret_auth(
    State(state): State<McpHttpState>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<serde_json::Value>)> {
    let Some(expected) = state.secret.as_deref() else {
        return Ok(next.run(request).await);
    };
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let problem = match extract_api_key(request.headers()) {
        Some(key) if constant_time_eq(key.as_bytes(), expected.as_bytes()) => {
            return Ok(next.run(request).await);
        }
        Some(_) => "Invalid API key",
        None => "Authentication required",
    };

    if state.require_auth {
        warn!(reason = problem, "Rejecting JSON-RPC request");
        return Err((StatusCode::UNAUTHORIZED, Json(json!({ "error": problem }))));
    }

    warn!(reason = problem, "Missing or invalid authorization on JSON-RPC request");
    Ok(next.run(request).await)
}

// ============================================================================
// Router
// ============================================================================

/// Create the JSON-RPC router.
///
/// Every response carries permissive CORS headers.
pub fn create_mcp_router(state: McpHttpState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new().route(MCP_PATH, post(mcp_message).options(mcp_preflight));

    let router = if state.has_auth() {
        info!(enforced = state.require_auth, "Gateway secret check enabled");
        router.route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            gateway_secret_auth,
        ))
    } else {
        router
    };

    router.layer(cors).with_state(state)
}

/// JSON-RPC request handler.
///
/// Takes the raw body so unparseable JSON can be reported as a JSON-RPC
/// parse error rather than an HTTP rejection.
async fn mcp_message(State(state): State<McpHttpState>, body: Bytes) -> impl IntoResponse {
    Json(state.dispatcher.handle(&body).await)
}

async fn mcp_preflight() -> impl IntoResponse {
    Json(json!({}))
}
