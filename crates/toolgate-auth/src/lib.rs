//! OAuth authorization-code flow for toolgate.
//!
//! Obtains per-workspace provider credentials and hands them to the external
//! credential bridge, which supplies them to later `tools/call` requests.
//!
//! ```text
//! browser ── GET /auth/init ──▶ toolgate ──▶ {auth_url}
//! browser ──────────────▶ identity provider (consent)
//! browser ◀── redirect ── identity provider
//! browser ── GET /auth/callback ──▶ toolgate ── exchange code ──▶ token endpoint
//!                                   toolgate ── store tokens ───▶ bridge
//! ```
//!
//! The flow is stateless on the server: the workspace and return URL travel
//! in an HMAC-signed `state` parameter (see [`state`]).

pub mod bridge;
mod error;
pub mod flow;
pub mod oauth;
pub mod pages;
pub mod routes;
pub mod state;

pub use bridge::{BridgeClient, BridgeConfig};
pub use error::{FlowError, FlowResult, StateError};
pub use flow::{
    CallbackOutcome, CallbackRequest, FlowController, InitRequest, OAuthConfig, VerifiedCallback,
};
pub use oauth::{OAuthEndpoints, OAuthTokens};
pub use routes::create_auth_router;
pub use state::{FlowState, StateCodec};
