//! Server assembly.

use crate::config::AppConfig;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use toolgate_auth::{create_auth_router, FlowController, FlowError, StateCodec};
use toolgate_mcp::{create_mcp_router, Dispatcher, McpHttpState};
use toolgate_provider::{ProviderError, ProviderRegistry};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Errors raised while assembling the server.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Flow(#[from] FlowError),
}

#[derive(Debug, Clone, Serialize)]
struct Endpoints {
    mcp: &'static str,
    auth_init: &'static str,
    auth_callback: &'static str,
    health: &'static str,
}

/// Body of `GET /`.
#[derive(Debug, Clone, Serialize)]
struct ServerInfo {
    name: &'static str,
    version: &'static str,
    protocol: &'static str,
    endpoints: Endpoints,
    providers: Vec<String>,
}

/// Build the full router: `/`, `/health`, `/mcp` and `/auth/*`.
pub fn build_router(config: AppConfig) -> Result<Router, StartupError> {
    let registry = Arc::new(ProviderRegistry::with_builtins(&config.providers)?);
    info!(providers = ?registry.list(), "Registered providers");

    let server_info = Arc::new(ServerInfo {
        name: "toolgate",
        version: env!("CARGO_PKG_VERSION"),
        protocol: "JSON-RPC 2.0",
        endpoints: Endpoints {
            mcp: "/mcp (POST)",
            auth_init: "/auth/init (GET)",
            auth_callback: "/auth/callback (GET)",
            health: "/health (GET)",
        },
        providers: registry.list().into_iter().map(str::to_string).collect(),
    });

    let mut mcp_state =
        McpHttpState::new(Dispatcher::new(registry)).require_auth(config.require_auth);
    if let Some(secret) = config.gateway_secret {
        mcp_state = mcp_state.with_secret(secret);
    } else if config.require_auth {
        warn!("--require-auth has no effect without MCP_BRIDGE_SECRET");
    }

    let codec = match config.state_secret {
        Some(secret) => StateCodec::new(secret.into_bytes()),
        None => {
            warn!("TOOLGATE_STATE_SECRET not set; OAuth state is signed with a per-process key");
            StateCodec::random()
        }
    };
    if config.oauth.client_id.is_none() || config.oauth.client_secret.is_none() {
        warn!("Google OAuth client is not configured; /auth endpoints will fail");
    }
    if config.bridge.url.is_none() {
        warn!("MCP_BRIDGE_URL not set; OAuth callbacks cannot store tokens");
    }
    let controller = Arc::new(FlowController::new(config.oauth, config.bridge, codec)?);

    let base = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(server_info);

    Ok(base
        .merge(create_mcp_router(mcp_state))
        .merge(create_auth_router(controller))
        .layer(TraceLayer::new_for_http()))
}

/// Serve `router` on `address` until Ctrl+C.
pub async fn serve(address: SocketAddr, router: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn root(State(info): State<Arc<ServerInfo>>) -> impl IntoResponse {
    Json(info.as_ref().clone())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}
