//! Client for the external credential bridge.

use crate::error::{FlowError, FlowResult};
use crate::oauth::OAuthTokens;
use serde::Serialize;
use tracing::{error, info};

/// Header carrying the shared bridge secret.
pub const BRIDGE_SECRET_HEADER: &str = "x-mcp-secret";

const STORE_TOKENS_ACTION: &str = "store_oauth_tokens";

/// Bridge connection settings.
#[derive(Debug, Clone, Default)]
pub struct BridgeConfig {
    /// Endpoint tokens are posted to.
    pub url: Option<String>,
    /// Shared secret sent in [`BRIDGE_SECRET_HEADER`].
    pub secret: Option<String>,
}

#[derive(Debug, Serialize)]
struct StoreTokensRequest<'a> {
    action: &'static str,
    provider: &'a str,
    workspace_id: &'a str,
    credentials: StoredCredentials<'a>,
}

/// Token bundle as stored by the bridge, including what a refresh needs.
#[derive(Debug, Serialize)]
struct StoredCredentials<'a> {
    access_token: &'a str,
    refresh_token: Option<&'a str>,
    expires_in: Option<u64>,
    token_type: Option<&'a str>,
    scope: Option<&'a str>,
    client_id: &'a str,
    client_secret: &'a str,
}

/// Hands tokens to the bridge.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    config: BridgeConfig,
}

impl BridgeClient {
    pub fn new(http: reqwest::Client, config: BridgeConfig) -> Self {
        Self { http, config }
    }

    /// Store a workspace's tokens for a provider.
    pub async fn store_oauth_tokens(
        &self,
        provider: &str,
        workspace_id: &str,
        tokens: &OAuthTokens,
        client_id: &str,
        client_secret: &str,
    ) -> FlowResult<()> {
        let url = self
            .config
            .url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or(FlowError::NotConfigured("MCP_BRIDGE_URL"))?;

        let body = StoreTokensRequest {
            action: STORE_TOKENS_ACTION,
            provider,
            workspace_id,
            credentials: StoredCredentials {
                access_token: &tokens.access_token,
                refresh_token: tokens.refresh_token.as_deref(),
                expires_in: tokens.expires_in,
                token_type: tokens.token_type.as_deref(),
                scope: tokens.scope.as_deref(),
                client_id,
                client_secret,
            },
        };

        let mut request = self.http.post(url).json(&body);
        if let Some(secret) = self.config.secret.as_deref() {
            request = request.header(BRIDGE_SECRET_HEADER, secret);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Bridge request failed");
            FlowError::bridge(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %text, "Failed to store tokens");
            return Err(FlowError::bridge(format!("bridge returned {status}")));
        }

        info!(provider, workspace_id, "Stored OAuth tokens");
        Ok(())
    }
}
