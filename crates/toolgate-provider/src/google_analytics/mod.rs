//! Google Analytics 4 provider.
//!
//! Tools run against the GA4 Admin and Data REST APIs using the caller's
//! OAuth access token.

mod client;
pub mod report;

use crate::credentials::{AuthType, Credentials};
use crate::error::{ProviderError, ProviderResult, ToolError, ToolResult};
use crate::{BoxedProvider, Provider, ProviderFactory, ProviderInfo, ToolDefinition, ToolHandler};
use async_trait::async_trait;
use client::{AnalyticsClient, Api};
use report::{format_rows, normalize_property_id, parse_date_range, ReportResponse};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Provider metadata.
pub static INFO: ProviderInfo = ProviderInfo {
    id: "google_analytics",
    name: "Google Analytics",
    description: "Access Google Analytics 4 data and reports",
    auth_type: AuthType::OAuth2,
};

/// OAuth scopes the provider's tools need.
pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/analytics.readonly"];

const DEFAULT_REPORT_LIMIT: u64 = 100;
const DEFAULT_DATE_RANGE: &str = "30d";

/// Base URLs of the GA4 APIs.
#[derive(Debug, Clone)]
pub struct GoogleAnalyticsEndpoints {
    /// Admin API, e.g. `https://analyticsadmin.googleapis.com/v1beta`.
    pub admin_url: String,
    /// Data API, e.g. `https://analyticsdata.googleapis.com/v1beta`.
    pub data_url: String,
}

impl Default for GoogleAnalyticsEndpoints {
    fn default() -> Self {
        Self {
            admin_url: "https://analyticsadmin.googleapis.com/v1beta".to_string(),
            data_url: "https://analyticsdata.googleapis.com/v1beta".to_string(),
        }
    }
}

/// Builds [`GoogleAnalyticsProvider`] instances.
///
/// The HTTP connection pool is shared; tokens are not.
pub struct GoogleAnalyticsFactory {
    http: reqwest::Client,
    endpoints: GoogleAnalyticsEndpoints,
}

impl GoogleAnalyticsFactory {
    /// Create a factory for the given endpoints.
    pub fn new(endpoints: GoogleAnalyticsEndpoints, timeout: Duration) -> ProviderResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("toolgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Init {
                provider: INFO.id.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { http, endpoints })
    }
}

impl ProviderFactory for GoogleAnalyticsFactory {
    fn info(&self) -> &ProviderInfo {
        &INFO
    }

    fn create(&self, credentials: Option<Credentials>) -> BoxedProvider {
        let access_token = credentials
            .as_ref()
            .and_then(Credentials::access_token)
            .map(str::to_string);
        Box::new(GoogleAnalyticsProvider {
            client: Arc::new(AnalyticsClient::new(
                self.http.clone(),
                self.endpoints.clone(),
                access_token,
            )),
        })
    }
}

/// Google Analytics 4 provider instance.
pub struct GoogleAnalyticsProvider {
    client: Arc<AnalyticsClient>,
}

impl GoogleAnalyticsProvider {
    fn tool(&self, op: Operation, name: &str, description: &str, schema: Value) -> ToolDefinition {
        ToolDefinition::new(
            name,
            description,
            schema,
            Arc::new(AnalyticsTool {
                op,
                client: self.client.clone(),
            }),
        )
    }
}

fn property_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "property_id": {
                "type": "string",
                "description": description
            }
        },
        "required": ["property_id"]
    })
}

impl Provider for GoogleAnalyticsProvider {
    fn info(&self) -> &ProviderInfo {
        &INFO
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![
            self.tool(
                Operation::AccountSummaries,
                "get_account_summaries",
                "List all Google Analytics 4 accounts and properties the user has access to. \
                 Returns account IDs, names, and their associated properties.",
                json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            ),
            self.tool(
                Operation::PropertyDetails,
                "get_property_details",
                "Get detailed information about a specific GA4 property including its \
                 configuration, data retention settings, and linked services.",
                property_schema("The GA4 property ID (e.g., 'properties/123456789')"),
            ),
            self.tool(
                Operation::RunReport,
                "run_report",
                "Run a Google Analytics 4 report with custom dimensions, metrics, and date \
                 ranges. Use this to get traffic, user behavior, conversions, and other \
                 analytics data.",
                json!({
                    "type": "object",
                    "properties": {
                        "property_id": {
                            "type": "string",
                            "description": "The GA4 property ID (e.g., 'properties/123456789' or just '123456789')"
                        },
                        "dimensions": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Dimensions to include (e.g., ['date', 'country', 'deviceCategory', 'sessionDefaultChannelGroup'])"
                        },
                        "metrics": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Metrics to include (e.g., ['activeUsers', 'sessions', 'screenPageViews', 'conversions'])"
                        },
                        "date_range": {
                            "type": "string",
                            "description": "Date range: '7d', '30d', '90d', or 'YYYY-MM-DD,YYYY-MM-DD' for custom range"
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of rows to return (default: 100)"
                        }
                    },
                    "required": ["property_id"]
                }),
            ),
            self.tool(
                Operation::RunRealtimeReport,
                "run_realtime_report",
                "Run a realtime report showing current active users and their activity in \
                 the last 30 minutes.",
                json!({
                    "type": "object",
                    "properties": {
                        "property_id": {
                            "type": "string",
                            "description": "The GA4 property ID"
                        },
                        "dimensions": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Realtime dimensions (e.g., ['country', 'city', 'unifiedScreenName'])"
                        },
                        "metrics": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Realtime metrics (e.g., ['activeUsers', 'screenPageViews'])"
                        }
                    },
                    "required": ["property_id"]
                }),
            ),
            self.tool(
                Operation::CustomDefinitions,
                "get_custom_dimensions_and_metrics",
                "Get the custom dimensions and metrics configured for a GA4 property.",
                property_schema("The GA4 property ID"),
            ),
            self.tool(
                Operation::GoogleAdsLinks,
                "list_google_ads_links",
                "List Google Ads account links for a GA4 property.",
                property_schema("The GA4 property ID"),
            ),
        ]
    }
}

// ============================================================================
// Tool handlers
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Operation {
    AccountSummaries,
    PropertyDetails,
    RunReport,
    RunRealtimeReport,
    CustomDefinitions,
    GoogleAdsLinks,
}

struct AnalyticsTool {
    op: Operation,
    client: Arc<AnalyticsClient>,
}

#[async_trait]
impl ToolHandler for AnalyticsTool {
    async fn call(&self, args: Value) -> ToolResult<Value> {
        debug!(operation = ?self.op, "Running Google Analytics tool");
        let client = self.client.as_ref();
        match self.op {
            Operation::AccountSummaries => account_summaries(client).await,
            Operation::PropertyDetails => property_details(client, parse_args(args)?).await,
            Operation::RunReport => run_report(client, parse_args(args)?).await,
            Operation::RunRealtimeReport => run_realtime_report(client, parse_args(args)?).await,
            Operation::CustomDefinitions => custom_definitions(client, parse_args(args)?).await,
            Operation::GoogleAdsLinks => google_ads_links(client, parse_args(args)?).await,
        }
    }
}

fn parse_args<T: DeserializeOwned>(args: Value) -> ToolResult<T> {
    serde_json::from_value(args).map_err(|e| ToolError::validation(format!("Invalid arguments: {e}")))
}

#[derive(Debug, Deserialize)]
struct PropertyArgs {
    property_id: String,
}

impl PropertyArgs {
    fn property(&self) -> ToolResult<String> {
        property(&self.property_id)
    }
}

fn property(property_id: &str) -> ToolResult<String> {
    if property_id.trim().is_empty() {
        return Err(ToolError::validation("property_id must not be empty"));
    }
    Ok(normalize_property_id(property_id))
}

#[derive(Debug, Deserialize)]
struct ReportArgs {
    property_id: String,
    #[serde(default)]
    dimensions: Option<Vec<String>>,
    #[serde(default)]
    metrics: Option<Vec<String>>,
    #[serde(default)]
    date_range: Option<String>,
    #[serde(default)]
    limit: Option<u64>,
}

/// Use `fallback` when the caller sent nothing or an empty list.
fn names_or(names: Option<Vec<String>>, fallback: &[&str]) -> Vec<String> {
    match names {
        Some(names) if !names.is_empty() => names,
        _ => fallback.iter().map(|s| s.to_string()).collect(),
    }
}

fn named(names: &[String]) -> Vec<Value> {
    names.iter().map(|name| json!({ "name": name })).collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountSummary {
    #[serde(default)]
    account: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    property_summaries: Vec<PropertySummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropertySummary {
    #[serde(default)]
    property: String,
    #[serde(default)]
    display_name: String,
}

async fn account_summaries(client: &AnalyticsClient) -> ToolResult<Value> {
    let summaries: Vec<AccountSummary> = client
        .list_all(Api::Admin, "accountSummaries", "accountSummaries")
        .await?;

    let accounts: Vec<Value> = summaries
        .into_iter()
        .map(|summary| {
            let properties: Vec<Value> = summary
                .property_summaries
                .into_iter()
                .map(|p| json!({ "property_id": p.property, "display_name": p.display_name }))
                .collect();
            json!({
                "account_id": summary.account,
                "display_name": summary.display_name,
                "properties": properties,
            })
        })
        .collect();

    Ok(json!({ "accounts": accounts }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropertyResource {
    #[serde(default)]
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    time_zone: String,
    #[serde(default)]
    currency_code: String,
    #[serde(default)]
    industry_category: String,
    create_time: Option<String>,
    update_time: Option<String>,
}

async fn property_details(client: &AnalyticsClient, args: PropertyArgs) -> ToolResult<Value> {
    let property_id = args.property()?;
    let resource: PropertyResource = client.get(Api::Admin, &property_id, &[]).await?;

    Ok(json!({
        "property_id": resource.name,
        "display_name": resource.display_name,
        "time_zone": resource.time_zone,
        "currency_code": resource.currency_code,
        "industry_category": resource.industry_category,
        "create_time": resource.create_time,
        "update_time": resource.update_time,
    }))
}

async fn run_report(client: &AnalyticsClient, args: ReportArgs) -> ToolResult<Value> {
    let property_id = property(&args.property_id)?;
    let date_range = args.date_range.as_deref().unwrap_or(DEFAULT_DATE_RANGE);
    let (start_date, end_date) = parse_date_range(date_range, chrono::Local::now().date_naive());
    let dimensions = names_or(args.dimensions, &["date"]);
    let metrics = names_or(args.metrics, &["activeUsers", "sessions"]);
    let limit = args.limit.unwrap_or(DEFAULT_REPORT_LIMIT);

    let body = json!({
        "dimensions": named(&dimensions),
        "metrics": named(&metrics),
        "dateRanges": [{ "startDate": start_date, "endDate": end_date }],
        "limit": limit,
    });
    let response: ReportResponse = client
        .post(Api::Data, &format!("{property_id}:runReport"), &body)
        .await?;

    let rows = format_rows(&response.rows, &dimensions, &metrics);
    Ok(json!({
        "property_id": property_id,
        "date_range": { "start": start_date, "end": end_date },
        "row_count": rows.len(),
        "rows": rows,
    }))
}

async fn run_realtime_report(client: &AnalyticsClient, args: ReportArgs) -> ToolResult<Value> {
    let property_id = property(&args.property_id)?;
    let dimensions = names_or(args.dimensions, &["country"]);
    let metrics = names_or(args.metrics, &["activeUsers"]);

    let body = json!({
        "dimensions": named(&dimensions),
        "metrics": named(&metrics),
    });
    let response: ReportResponse = client
        .post(Api::Data, &format!("{property_id}:runRealtimeReport"), &body)
        .await?;

    let rows = format_rows(&response.rows, &dimensions, &metrics);
    Ok(json!({
        "property_id": property_id,
        "row_count": rows.len(),
        "rows": rows,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomDimension {
    #[serde(default)]
    parameter_name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    scope: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomMetric {
    #[serde(default)]
    parameter_name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    measurement_unit: String,
    #[serde(default)]
    scope: String,
}

async fn custom_definitions(client: &AnalyticsClient, args: PropertyArgs) -> ToolResult<Value> {
    let property_id = args.property()?;

    let dimensions: Vec<CustomDimension> = client
        .list_all(
            Api::Admin,
            &format!("{property_id}/customDimensions"),
            "customDimensions",
        )
        .await?;
    let metrics: Vec<CustomMetric> = client
        .list_all(Api::Admin, &format!("{property_id}/customMetrics"), "customMetrics")
        .await?;

    let custom_dimensions: Vec<Value> = dimensions
        .into_iter()
        .map(|d| {
            json!({
                "name": d.parameter_name,
                "display_name": d.display_name,
                "description": d.description,
                "scope": d.scope,
            })
        })
        .collect();
    let custom_metrics: Vec<Value> = metrics
        .into_iter()
        .map(|m| {
            json!({
                "name": m.parameter_name,
                "display_name": m.display_name,
                "description": m.description,
                "measurement_unit": m.measurement_unit,
                "scope": m.scope,
            })
        })
        .collect();

    Ok(json!({
        "property_id": property_id,
        "custom_dimensions": custom_dimensions,
        "custom_metrics": custom_metrics,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleAdsLink {
    #[serde(default)]
    name: String,
    #[serde(default)]
    customer_id: String,
    #[serde(default)]
    can_manage_clients: bool,
    ads_personalization_enabled: Option<bool>,
}

async fn google_ads_links(client: &AnalyticsClient, args: PropertyArgs) -> ToolResult<Value> {
    let property_id = args.property()?;
    let links: Vec<GoogleAdsLink> = client
        .list_all(Api::Admin, &format!("{property_id}/googleAdsLinks"), "googleAdsLinks")
        .await?;

    let links: Vec<Value> = links
        .into_iter()
        .map(|link| {
            json!({
                "name": link.name,
                "customer_id": link.customer_id,
                "can_manage_clients": link.can_manage_clients,
                "ads_personalization_enabled": link.ads_personalization_enabled,
            })
        })
        .collect();

    Ok(json!({
        "property_id": property_id,
        "google_ads_links": links,
    }))
}
