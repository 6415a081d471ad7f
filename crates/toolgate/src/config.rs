//! Command line and environment configuration.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use toolgate_auth::{BridgeConfig, OAuthConfig};
use toolgate_provider::ProvidersConfig;

#[derive(Debug, Clone, Parser)]
#[command(name = "toolgate")]
#[command(author, version, about = "JSON-RPC tool gateway with OAuth onboarding", long_about = None)]
pub struct Cli {
    /// Address to bind to (overrides --port)
    #[arg(long, env = "ADDRESS")]
    pub address: Option<SocketAddr>,

    /// Port to listen on, on all interfaces
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// OAuth client id registered with Google
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    /// OAuth client secret registered with Google
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub google_client_secret: Option<String>,

    /// Credential bridge endpoint that stores OAuth tokens
    #[arg(long, env = "MCP_BRIDGE_URL")]
    pub bridge_url: Option<String>,

    /// Secret shared with the bridge; also expected from JSON-RPC callers
    #[arg(long, env = "MCP_BRIDGE_SECRET", hide_env_values = true)]
    pub bridge_secret: Option<String>,

    /// Key used to sign OAuth state (random per process when unset)
    #[arg(long, env = "TOOLGATE_STATE_SECRET", hide_env_values = true)]
    pub state_secret: Option<String>,

    /// Externally visible base URL, used to build the OAuth callback URL
    #[arg(long, env = "TOOLGATE_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Reject JSON-RPC requests without the bridge secret instead of logging
    #[arg(long, env = "TOOLGATE_REQUIRE_AUTH")]
    pub require_auth: bool,

    /// Timeout for outbound HTTP requests, in seconds
    #[arg(long, env = "TOOLGATE_HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The socket address to listen on.
    pub fn bind_address(&self) -> SocketAddr {
        self.address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], self.port)))
    }

    /// Build the application configuration.
    pub fn app_config(&self) -> AppConfig {
        let http_timeout = Duration::from_secs(self.http_timeout_secs);
        AppConfig {
            providers: ProvidersConfig {
                http_timeout,
                ..ProvidersConfig::default()
            },
            oauth: OAuthConfig {
                client_id: non_empty(&self.google_client_id),
                client_secret: non_empty(&self.google_client_secret),
                public_url: non_empty(&self.public_url),
                http_timeout,
                ..OAuthConfig::default()
            },
            bridge: BridgeConfig {
                url: non_empty(&self.bridge_url),
                secret: non_empty(&self.bridge_secret),
            },
            state_secret: non_empty(&self.state_secret),
            gateway_secret: non_empty(&self.bridge_secret),
            require_auth: self.require_auth,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

/// Everything needed to assemble the server.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub providers: ProvidersConfig,
    pub oauth: OAuthConfig,
    pub bridge: BridgeConfig,
    /// Key for signing OAuth state.
    pub state_secret: Option<String>,
    /// Secret JSON-RPC callers present.
    pub gateway_secret: Option<String>,
    /// Reject JSON-RPC requests with a missing or wrong secret.
    pub require_auth: bool,
}
