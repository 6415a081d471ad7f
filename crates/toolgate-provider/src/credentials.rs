//! Per-call credentials.
//!
//! Callers send an open-ended `_credentials` object with every `tools/call`.
//! It is turned into a [`Credentials`] value at the boundary, shaped by the
//! target provider's [`AuthType`]. Keys the shape does not know about are
//! kept in `extra` so providers can still read them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// How a provider authenticates against its upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthType {
    #[serde(rename = "oauth2")]
    OAuth2,
    #[serde(rename = "api_key")]
    ApiKey,
    #[serde(rename = "none")]
    None,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::OAuth2 => "oauth2",
            AuthType::ApiKey => "api_key",
            AuthType::None => "none",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A credential bag that does not fit the provider's auth type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    /// A required field is absent or empty.
    #[error("missing credential field '{0}'")]
    Missing(&'static str),

    /// A known field holds something other than a string.
    #[error("credential field '{0}' must be a string")]
    NotAString(String),
}

/// OAuth 2.0 bearer credentials plus what is needed to refresh them.
#[derive(Clone, PartialEq)]
pub struct OAuth2Credentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Any other keys the caller sent.
    pub extra: Map<String, Value>,
}

impl fmt::Debug for OAuth2Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Credentials")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("client_id", &self.client_id)
            .field("extra_keys", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Credentials for a single provider call.
#[derive(Clone, PartialEq)]
pub enum Credentials {
    OAuth2(OAuth2Credentials),
    ApiKey {
        api_key: String,
        extra: Map<String, Value>,
    },
    None,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::OAuth2(creds) => f.debug_tuple("OAuth2").field(creds).finish(),
            Credentials::ApiKey { .. } => f.write_str("ApiKey(<redacted>)"),
            Credentials::None => f.write_str("None"),
        }
    }
}

const OAUTH2_FIELDS: [&str; 4] = ["access_token", "refresh_token", "client_id", "client_secret"];

impl Credentials {
    /// Build typed credentials from a raw `_credentials` object.
    ///
    /// For `api_key` providers the key is read from `api_key`, falling back to
    /// `access_token`.
    pub fn from_bag(auth_type: AuthType, bag: &Map<String, Value>) -> Result<Self, CredentialsError> {
        match auth_type {
            AuthType::OAuth2 => {
                let access_token =
                    string_field(bag, "access_token")?.ok_or(CredentialsError::Missing("access_token"))?;
                let extra = bag
                    .iter()
                    .filter(|(k, _)| !OAUTH2_FIELDS.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Ok(Credentials::OAuth2(OAuth2Credentials {
                    access_token,
                    refresh_token: string_field(bag, "refresh_token")?,
                    client_id: string_field(bag, "client_id")?,
                    client_secret: string_field(bag, "client_secret")?,
                    extra,
                }))
            }
            AuthType::ApiKey => {
                let api_key = match string_field(bag, "api_key")? {
                    Some(key) => key,
                    None => string_field(bag, "access_token")?
                        .ok_or(CredentialsError::Missing("api_key"))?,
                };
                let extra = bag
                    .iter()
                    .filter(|(k, _)| k.as_str() != "api_key")
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Ok(Credentials::ApiKey { api_key, extra })
            }
            AuthType::None => Ok(Credentials::None),
        }
    }

    /// The bearer token, if these are OAuth 2.0 credentials.
    pub fn access_token(&self) -> Option<&str> {
        match self {
            Credentials::OAuth2(creds) => Some(&creds.access_token),
            _ => None,
        }
    }

    /// The auth type these credentials satisfy.
    pub fn auth_type(&self) -> AuthType {
        match self {
            Credentials::OAuth2(_) => AuthType::OAuth2,
            Credentials::ApiKey { .. } => AuthType::ApiKey,
            Credentials::None => AuthType::None,
        }
    }
}

/// Read an optional string field; empty strings count as absent.
fn string_field(bag: &Map<String, Value>, key: &str) -> Result<Option<String>, CredentialsError> {
    match bag.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(CredentialsError::NotAString(key.to_string())),
    }
}
