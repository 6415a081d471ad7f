//! Signed flow state.
//!
//! The flow state travels through the identity provider inside the OAuth
//! `state` parameter instead of living in a server-side session. The token
//! is `base64url(json) "." base64url(hmac_sha256(key, json))`, so a callback
//! can only carry state this server issued.

use crate::error::StateError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// How long a state token is accepted after issue, in seconds.
pub const STATE_TTL_SECS: i64 = 10 * 60;

/// Tolerated clock skew for tokens issued "in the future", in seconds.
pub const STATE_CLOCK_SKEW_SECS: i64 = 60;

/// Everything the callback needs to finish a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    pub provider: String,
    pub workspace_id: String,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// Random per flow.
    pub nonce: String,
    /// Unix seconds.
    pub issued_at: i64,
}

impl FlowState {
    /// Start a new flow issued at `now` (unix seconds).
    pub fn new(
        provider: impl Into<String>,
        workspace_id: impl Into<String>,
        redirect_uri: Option<String>,
        now: i64,
    ) -> Self {
        Self {
            provider: provider.into(),
            workspace_id: workspace_id.into(),
            redirect_uri,
            nonce: generate_nonce(),
            issued_at: now,
        }
    }
}

/// Generate a random URL-safe nonce.
pub fn generate_nonce() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..16).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// Signs and verifies flow state tokens.
#[derive(Clone)]
pub struct StateCodec {
    key: Vec<u8>,
}

impl fmt::Debug for StateCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCodec").finish_non_exhaustive()
    }
}

impl StateCodec {
    /// Create a codec with a fixed signing key.
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// Create a codec with a random key.
    ///
    /// Tokens only verify within the same process.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let key: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
        Self { key }
    }

    fn mac(&self) -> Result<HmacSha256, StateError> {
        HmacSha256::new_from_slice(&self.key).map_err(|e| StateError::Key(e.to_string()))
    }

    /// Serialize and sign a flow state.
    pub fn encode(&self, state: &FlowState) -> Result<String, StateError> {
        let payload = serde_json::to_vec(state).map_err(|_| StateError::Malformed)?;
        let signature = self.mac()?.chain_update(&payload).finalize().into_bytes();
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Verify a token and return its flow state.
    ///
    /// `now` is unix seconds.
    pub fn decode(&self, token: &str, now: i64) -> Result<FlowState, StateError> {
        let (payload, signature) = token.split_once('.').ok_or(StateError::Malformed)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| StateError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| StateError::Malformed)?;

        self.mac()?
            .chain_update(&payload)
            .verify_slice(&signature)
            .map_err(|_| StateError::BadSignature)?;

        let state: FlowState =
            serde_json::from_slice(&payload).map_err(|_| StateError::Malformed)?;

        let age = now - state.issued_at;
        if age > STATE_TTL_SECS || age < -STATE_CLOCK_SKEW_SECS {
            return Err(StateError::Expired);
        }

        Ok(state)
    }
}
