//! Thin REST client for the GA4 Admin and Data APIs.

use super::GoogleAnalyticsEndpoints;
use crate::error::{ToolError, ToolResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Page size requested from list endpoints.
const PAGE_SIZE: &str = "200";

/// Which GA4 API a request goes to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Api {
    Admin,
    Data,
}

/// HTTP client bound to one caller's access token.
pub(crate) struct AnalyticsClient {
    http: reqwest::Client,
    endpoints: GoogleAnalyticsEndpoints,
    access_token: Option<String>,
}

impl AnalyticsClient {
    pub(crate) fn new(
        http: reqwest::Client,
        endpoints: GoogleAnalyticsEndpoints,
        access_token: Option<String>,
    ) -> Self {
        Self {
            http,
            endpoints,
            access_token,
        }
    }

    fn url(&self, api: Api, path: &str) -> String {
        let base = match api {
            Api::Admin => &self.endpoints.admin_url,
            Api::Data => &self.endpoints.data_url,
        };
        format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn token(&self) -> ToolResult<&str> {
        self.access_token
            .as_deref()
            .ok_or_else(|| ToolError::MissingCredentials("no access token provided".to_string()))
    }

    /// GET a resource and decode it.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        api: Api,
        path: &str,
        query: &[(&str, &str)],
    ) -> ToolResult<T> {
        let url = self.url(api, path);
        debug!(url = %url, "GA GET");
        let request = self.http.get(&url).bearer_auth(self.token()?).query(query);
        decode(request.send().await?).await
    }

    /// POST a JSON body and decode the response.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        api: Api,
        path: &str,
        body: &Value,
    ) -> ToolResult<T> {
        let url = self.url(api, path);
        debug!(url = %url, "GA POST");
        let request = self.http.post(&url).bearer_auth(self.token()?).json(body);
        decode(request.send().await?).await
    }

    /// Collect every item under `key` across all pages of a list endpoint.
    pub(crate) async fn list_all<T: DeserializeOwned>(
        &self,
        api: Api,
        path: &str,
        key: &str,
    ) -> ToolResult<Vec<T>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        loop {
            let mut query = vec![("pageSize", PAGE_SIZE)];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let mut page: Value = self.get(api, path, &query).await?;
            if let Some(list) = page.get_mut(key).map(Value::take) {
                let batch: Vec<T> = serde_json::from_value(list)?;
                items.extend(batch);
            }

            match page.get("nextPageToken").and_then(Value::as_str) {
                Some(next) if !next.is_empty() => {
                    if !seen_tokens.insert(next.to_string()) {
                        warn!(path, page_token = next, "Page token repeated; stopping pagination");
                        break;
                    }
                    page_token = Some(next.to_string());
                }
                _ => break,
            }
        }

        Ok(items)
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ToolResult<T> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "GA API request failed");
        return Err(ToolError::api(status.as_u16(), text));
    }
    Ok(response.json().await?)
}
