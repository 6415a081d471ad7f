//! OAuth flow controller.
//!
//! A flow moves through four steps: initiated (authorization URL issued),
//! callback received, token exchanged, credentials stored. Nothing is kept
//! between requests; everything the callback needs rides in the signed
//! state. Any failure ends the flow without leaving anything behind.

use crate::bridge::{BridgeClient, BridgeConfig};
use crate::error::{FlowError, FlowResult};
use crate::oauth::{build_auth_url, exchange_code, OAuthEndpoints};
use crate::pages::success_page;
use crate::state::{FlowState, StateCodec};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Provider used when `/auth/init` names none.
pub const DEFAULT_PROVIDER: &str = "google_analytics";

/// Path of the callback route.
pub const CALLBACK_PATH: &str = "/auth/callback";

/// OAuth scopes requested for a provider, if it supports the flow.
pub fn provider_scopes(provider: &str) -> Option<&'static [&'static str]> {
    match provider {
        "google_analytics" => Some(toolgate_provider::google_analytics::SCOPES),
        _ => None,
    }
}

/// OAuth client settings.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub endpoints: OAuthEndpoints,
    /// Externally visible base URL of this server. When unset, the callback
    /// URL is derived from the request's host.
    pub public_url: Option<String>,
    /// Timeout for token endpoint and bridge requests.
    pub http_timeout: Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            endpoints: OAuthEndpoints::default(),
            public_url: None,
            http_timeout: Duration::from_secs(30),
        }
    }
}

/// Query of `/auth/init`.
#[derive(Debug, Clone, Default)]
pub struct InitRequest {
    pub provider: Option<String>,
    pub workspace_id: Option<String>,
    pub redirect_uri: Option<String>,
}

impl InitRequest {
    /// Build from raw query pairs. A repeated key keeps its first value.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            provider: first_value(pairs, "provider"),
            workspace_id: first_value(pairs, "workspace_id"),
            redirect_uri: first_value(pairs, "redirect_uri"),
        }
    }
}

/// Query of `/auth/callback`.
#[derive(Debug, Clone, Default)]
pub struct CallbackRequest {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackRequest {
    /// Build from raw query pairs. A repeated key keeps its first value.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            code: first_value(pairs, "code"),
            state: first_value(pairs, "state"),
            error: first_value(pairs, "error"),
        }
    }
}

fn first_value(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

/// A callback whose state verified; ready for the token exchange.
#[derive(Debug, Clone)]
pub struct VerifiedCallback {
    code: String,
    state: FlowState,
}

impl VerifiedCallback {
    /// The flow state carried through the identity provider.
    pub fn state(&self) -> &FlowState {
        &self.state
    }
}

/// How a successful callback answers the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Send the browser back to the caller's page.
    Redirect(String),
    /// Show a page that notifies the opener window and closes.
    Page(String),
}

/// Drives the authorization-code flow.
pub struct FlowController {
    config: OAuthConfig,
    codec: StateCodec,
    bridge: BridgeClient,
    http: reqwest::Client,
}

impl FlowController {
    /// Create a controller.
    pub fn new(config: OAuthConfig, bridge: BridgeConfig, codec: StateCodec) -> FlowResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| FlowError::Client(e.to_string()))?;
        Ok(Self {
            bridge: BridgeClient::new(http.clone(), bridge),
            config,
            codec,
            http,
        })
    }

    /// The configured public base URL, if any.
    pub fn public_url(&self) -> Option<&str> {
        self.config.public_url.as_deref()
    }

    /// Start a flow and return the authorization URL.
    ///
    /// `callback_url` is this server's callback, registered with the
    /// identity provider.
    pub fn initiate(&self, request: InitRequest, callback_url: &str, now: i64) -> FlowResult<String> {
        let workspace_id = non_empty(request.workspace_id).ok_or(FlowError::MissingWorkspace)?;
        let provider = non_empty(request.provider).unwrap_or_else(|| DEFAULT_PROVIDER.to_string());
        let scopes =
            provider_scopes(&provider).ok_or_else(|| FlowError::UnknownProvider(provider.clone()))?;

        let redirect_uri = non_empty(request.redirect_uri);
        if let Some(uri) = redirect_uri.as_deref() {
            validate_redirect_uri(uri)?;
        }

        let client_id = self
            .config
            .client_id
            .as_deref()
            .ok_or(FlowError::NotConfigured("GOOGLE_CLIENT_ID"))?;

        let state = FlowState::new(&provider, &workspace_id, redirect_uri, now);
        let token = self.codec.encode(&state)?;
        let scope = scopes.join(" ");

        let auth_url = build_auth_url(
            &self.config.endpoints.auth_url,
            &[
                ("client_id", client_id),
                ("redirect_uri", callback_url),
                ("response_type", "code"),
                ("scope", &scope),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", &token),
            ],
        );

        info!(provider = %provider, workspace_id = %workspace_id, "OAuth flow initiated");
        Ok(auth_url)
    }

    /// Finish a flow: verify state, exchange the code, store the tokens.
    pub async fn callback(
        &self,
        request: CallbackRequest,
        callback_url: &str,
        now: i64,
    ) -> FlowResult<CallbackOutcome> {
        let verified = self.verify_callback(request, now)?;
        self.complete(verified, callback_url).await
    }

    /// Check the callback parameters and the state token.
    ///
    /// Makes no outbound requests.
    pub fn verify_callback(&self, request: CallbackRequest, now: i64) -> FlowResult<VerifiedCallback> {
        if let Some(error) = non_empty(request.error) {
            warn!(error = %error, "Identity provider reported an error");
            return Err(FlowError::Denied(error));
        }

        let (Some(code), Some(token)) = (non_empty(request.code), non_empty(request.state)) else {
            return Err(FlowError::MissingParameters);
        };

        let state = self.codec.decode(&token, now).map_err(|e| {
            warn!(error = %e, "Rejected OAuth state");
            FlowError::from(e)
        })?;
        debug!(provider = %state.provider, workspace_id = %state.workspace_id, "OAuth callback received");

        Ok(VerifiedCallback { code, state })
    }

    /// Exchange the code and store the tokens.
    ///
    /// `callback_url` must be the redirect URI used when the flow started.
    pub async fn complete(
        &self,
        verified: VerifiedCallback,
        callback_url: &str,
    ) -> FlowResult<CallbackOutcome> {
        let VerifiedCallback { code, state } = verified;
        let (client_id, client_secret) = self.client_credentials()?;
        let tokens = exchange_code(
            &self.http,
            &self.config.endpoints.token_url,
            client_id,
            client_secret,
            &code,
            callback_url,
        )
        .await?;
        debug!(provider = %state.provider, "Authorization code exchanged");

        self.bridge
            .store_oauth_tokens(
                &state.provider,
                &state.workspace_id,
                &tokens,
                client_id,
                client_secret,
            )
            .await?;

        info!(provider = %state.provider, workspace_id = %state.workspace_id, "OAuth flow completed");

        let outcome = state
            .redirect_uri
            .as_deref()
            .and_then(|uri| success_redirect(uri, &state.provider))
            .map(CallbackOutcome::Redirect)
            .unwrap_or_else(|| CallbackOutcome::Page(success_page(&state.provider)));
        Ok(outcome)
    }

    fn client_credentials(&self) -> FlowResult<(&str, &str)> {
        let client_id = self
            .config
            .client_id
            .as_deref()
            .ok_or(FlowError::NotConfigured("GOOGLE_CLIENT_ID"))?;
        let client_secret = self
            .config
            .client_secret
            .as_deref()
            .ok_or(FlowError::NotConfigured("GOOGLE_CLIENT_SECRET"))?;
        Ok((client_id, client_secret))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn validate_redirect_uri(uri: &str) -> FlowResult<()> {
    let parsed = Url::parse(uri).map_err(|e| FlowError::InvalidRedirectUri(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FlowError::InvalidRedirectUri(format!(
            "unsupported scheme '{other}'"
        ))),
    }
}

/// Append `success=true&provider=<id>` to the caller's return URL.
fn success_redirect(redirect_uri: &str, provider: &str) -> Option<String> {
    let mut url = Url::parse(redirect_uri).ok()?;
    url.query_pairs_mut()
        .append_pair("success", "true")
        .append_pair("provider", provider);
    Some(url.into())
}
