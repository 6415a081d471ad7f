//! End-to-end tests of the assembled router.
//!
//! Upstream services (Google APIs, token endpoint, bridge) are mocked with
//! wiremock; requests are driven through the router with `oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use toolgate::{build_router, AppConfig};
use toolgate_auth::{BridgeConfig, OAuthConfig, OAuthEndpoints};
use toolgate_provider::google_analytics::GoogleAnalyticsEndpoints;
use toolgate_provider::ProvidersConfig;
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{any, body_partial_json, header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GA_TOOLS: [&str; 6] = [
    "google_analytics__get_account_summaries",
    "google_analytics__get_property_details",
    "google_analytics__run_report",
    "google_analytics__run_realtime_report",
    "google_analytics__get_custom_dimensions_and_metrics",
    "google_analytics__list_google_ads_links",
];

fn config(server: &MockServer) -> AppConfig {
    AppConfig {
        providers: ProvidersConfig {
            google_analytics: GoogleAnalyticsEndpoints {
                admin_url: format!("{}/admin/v1beta", server.uri()),
                data_url: format!("{}/data/v1beta", server.uri()),
            },
            ..ProvidersConfig::default()
        },
        oauth: OAuthConfig {
            client_id: Some("client-id".to_string()),
            client_secret: Some("client-secret".to_string()),
            endpoints: OAuthEndpoints {
                auth_url: format!("{}/o/oauth2/v2/auth", server.uri()),
                token_url: format!("{}/token", server.uri()),
            },
            ..OAuthConfig::default()
        },
        bridge: BridgeConfig {
            url: Some(format!("{}/bridge", server.uri())),
            secret: Some("bridge-secret".to_string()),
        },
        state_secret: Some("state-key".to_string()),
        gateway_secret: None,
        require_auth: false,
    }
}

fn app(server: &MockServer) -> Router {
    build_router(config(server)).unwrap()
}

fn rpc(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/mcp")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, "gateway.test")
        .body(Body::empty())
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_health() {
    let server = MockServer::start().await;
    let response = app(&server).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_root_lists_providers() {
    let server = MockServer::start().await;
    let response = app(&server).oneshot(get("/")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["protocol"], "JSON-RPC 2.0");
    assert_eq!(body["providers"], json!(["google_analytics"]));
    assert_eq!(body["endpoints"]["mcp"], "/mcp (POST)");
}

#[tokio::test]
async fn test_tools_list() {
    let server = MockServer::start().await;
    let response = app(&server)
        .oneshot(rpc(json!({"jsonrpc": "2.0", "method": "tools/list", "id": 1})))
        .await
        .unwrap();

    let body = body_json(response).await;
    let tools = body["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, GA_TOOLS);
    for tool in tools {
        assert!(tool["description"]
            .as_str()
            .unwrap()
            .starts_with("[Google Analytics] "));
        assert_eq!(tool["inputSchema"]["type"], "object");
    }
}

#[tokio::test]
async fn test_tools_list_twice_is_identical() {
    let server = MockServer::start().await;
    let router = app(&server);
    let request = json!({"jsonrpc": "2.0", "method": "tools/list", "id": "x"});

    let first = body_bytes(router.clone().oneshot(rpc(request.clone())).await.unwrap()).await;
    let second = body_bytes(router.oneshot(rpc(request)).await.unwrap()).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_missing_version_is_invalid_request() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(rpc(json!({
            "method": "tools/call",
            "params": {
                "name": "google_analytics__get_account_summaries",
                "_credentials": {"access_token": "t"}
            },
            "id": 5
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["id"], 5);
}

#[tokio::test]
async fn test_tool_name_without_separator() {
    let server = MockServer::start().await;
    let response = app(&server)
        .oneshot(rpc(json!({
            "jsonrpc": "2.0",
            "method": "tools/call",
            "params": {"name": "run_report", "_credentials": {"access_token": "t"}},
            "id": 2
        })))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], -32000);
    assert!(body["error"]["data"]
        .as_str()
        .unwrap()
        .contains("Invalid tool name format"));
}

#[tokio::test]
async fn test_run_report_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/data/v1beta/properties/123456789:runReport"))
        .and(header_eq("authorization", "Bearer ya29.caller"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rows": [{
                "dimensionValues": [{"value": "20240301"}],
                "metricValues": [{"value": "42"}, {"value": "50"}]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(rpc(json!({
            "jsonrpc": "2.0",
            "method": "tools/call",
            "params": {
                "name": "google_analytics__run_report",
                "arguments": {"property_id": "123456789", "date_range": "7d"},
                "_credentials": {"access_token": "ya29.caller", "refresh_token": "1//r"}
            },
            "id": 10
        })))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert!(body.get("error").is_none(), "unexpected error: {body}");
    let result = &body["result"];
    assert_eq!(result["property_id"], "properties/123456789");
    assert!(result["date_range"]["start"].is_string());
    assert!(result["date_range"]["end"].is_string());
    assert_eq!(result["row_count"], 1);
    assert_eq!(
        result["rows"][0],
        json!({"date": "20240301", "activeUsers": "42", "sessions": "50"})
    );
}

#[tokio::test]
async fn test_auth_init() {
    let server = MockServer::start().await;
    let response = app(&server)
        .oneshot(get("/auth/init?provider=google_analytics&workspace_id=w1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let auth_url = Url::parse(body["auth_url"].as_str().unwrap()).unwrap();
    let param = |key: &str| {
        auth_url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    };
    assert_eq!(param("client_id").as_deref(), Some("client-id"));
    assert_eq!(
        param("redirect_uri").as_deref(),
        Some("http://gateway.test/auth/callback")
    );
    assert_eq!(param("response_type").as_deref(), Some("code"));
    assert!(param("scope").unwrap().contains("analytics.readonly"));
    assert!(param("state").is_some());
}

#[tokio::test]
async fn test_auth_init_requires_workspace() {
    let server = MockServer::start().await;
    let response = app(&server).oneshot(get("/auth/init")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_callback_error_makes_no_upstream_calls() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(get("/auth/callback?error=access_denied"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("access_denied"));
}

#[tokio::test]
async fn test_full_oauth_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.fresh",
            "refresh_token": "1//fresh",
            "expires_in": 3599,
            "token_type": "Bearer",
            "scope": "https://www.googleapis.com/auth/analytics.readonly"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bridge"))
        .and(header_eq("x-mcp-secret", "bridge-secret"))
        .and(body_partial_json(json!({
            "action": "store_oauth_tokens",
            "provider": "google_analytics",
            "workspace_id": "w42",
            "credentials": {
                "access_token": "ya29.fresh",
                "refresh_token": "1//fresh",
                "client_id": "client-id",
                "client_secret": "client-secret"
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let router = app(&server);
    let response = router
        .clone()
        .oneshot(get(
            "/auth/init?workspace_id=w42&redirect_uri=https%3A%2F%2Fapp.example.com%2Fintegrations",
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    let auth_url = Url::parse(body["auth_url"].as_str().unwrap()).unwrap();
    let state = auth_url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();

    let mut callback = Url::parse("http://gateway.test/auth/callback").unwrap();
    callback
        .query_pairs_mut()
        .append_pair("code", "4/auth-code")
        .append_pair("state", &state);
    let uri = format!("{}?{}", callback.path(), callback.query().unwrap());

    let response = router.oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://app.example.com/integrations?success=true&provider=google_analytics"
    );
}
