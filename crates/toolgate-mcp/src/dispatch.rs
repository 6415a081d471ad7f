//! JSON-RPC dispatch over the provider registry.

use crate::error::{McpError, McpResult};
use crate::protocol::{
    CallToolParams, JsonRpcError, JsonRpcResponse, ListToolsResult, McpTool, JSONRPC_VERSION,
    METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use toolgate_provider::{namespaced, split_namespaced, Credentials, ProviderRegistry};
use tracing::{debug, warn};

/// Routes JSON-RPC requests to providers.
///
/// Holds nothing but the shared registry, so it is cheap to clone and every
/// request is handled independently.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher over `registry`.
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this dispatcher routes to.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Handle one raw request body.
    ///
    /// Always produces a response; protocol and call failures are reported
    /// as JSON-RPC errors.
    pub async fn handle(&self, body: &[u8]) -> JsonRpcResponse {
        let request: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "Unparseable JSON-RPC body");
                return JsonRpcResponse::failure(Value::Null, JsonRpcError::parse_error(e.to_string()));
            }
        };

        let Value::Object(mut request) = request else {
            return JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::invalid_request("request must be a JSON object"),
            );
        };

        let id = request.remove("id").unwrap_or(Value::Null);

        if request.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return JsonRpcResponse::failure(id, JsonRpcError::invalid_request("jsonrpc must be '2.0'"));
        }

        let method = match request.get("method").and_then(Value::as_str) {
            Some(method) if !method.is_empty() => method.to_string(),
            _ => {
                return JsonRpcResponse::failure(id, JsonRpcError::invalid_request("method is required"));
            }
        };

        debug!(method = %method, id = %id, "Handling JSON-RPC request");

        match method.as_str() {
            METHOD_TOOLS_LIST => JsonRpcResponse::success(id, self.list_tools()),
            METHOD_TOOLS_CALL => {
                let params = request.remove("params").unwrap_or(Value::Null);
                match self.call_tool(params).await {
                    Ok(result) => JsonRpcResponse::success(id, result),
                    Err(e) => {
                        warn!(error = %e, "Tool call failed");
                        JsonRpcResponse::failure(id, e.to_rpc_error())
                    }
                }
            }
            other => JsonRpcResponse::failure(id, JsonRpcError::method_not_found(other)),
        }
    }

    /// Every tool of every provider, in registry order.
    pub fn tools(&self) -> Vec<McpTool> {
        let mut tools = Vec::new();
        for factory in self.registry.all() {
            let provider = factory.create(None);
            let info = provider.info();
            for tool in provider.tools() {
                tools.push(McpTool {
                    name: namespaced(info.id, &tool.name),
                    description: format!("[{}] {}", info.name, tool.description),
                    input_schema: tool.input_schema,
                });
            }
        }
        tools
    }

    fn list_tools(&self) -> Value {
        let tools = self.tools();
        debug!(count = tools.len(), "Listing tools");
        serde_json::to_value(ListToolsResult { tools }).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Resolve and run one namespaced tool.
    pub async fn call_tool(&self, params: Value) -> McpResult<Value> {
        let params: CallToolParams = match params {
            Value::Null => CallToolParams::default(),
            params => serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))?,
        };

        let name = params
            .name
            .filter(|name| !name.is_empty())
            .ok_or(McpError::MissingToolName)?;
        let (provider_id, tool_name) =
            split_namespaced(&name).ok_or_else(|| McpError::InvalidToolName(name.clone()))?;

        let factory = self
            .registry
            .get(provider_id)
            .ok_or_else(|| McpError::UnknownProvider(provider_id.to_string()))?;

        let bag = params.credentials.unwrap_or_default();
        let has_token = matches!(bag.get("access_token"), Some(Value::String(token)) if !token.is_empty());
        if !has_token {
            return Err(McpError::MissingAccessToken(provider_id.to_string()));
        }

        let credentials = Credentials::from_bag(factory.info().auth_type, &bag).map_err(|source| {
            McpError::InvalidCredentials {
                provider: provider_id.to_string(),
                source,
            }
        })?;

        let provider = factory.create(Some(credentials));
        let tool = provider
            .tool_by_name(tool_name)
            .ok_or_else(|| McpError::unknown_tool(provider_id, tool_name))?;

        debug!(provider = provider_id, tool = tool_name, "Calling tool");
        let arguments = params
            .arguments
            .filter(|args| !args.is_null())
            .unwrap_or_else(|| Value::Object(Map::new()));
        Ok(tool.handler.call(arguments).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, TOOL_CALL_FAILED};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use toolgate_provider::{
        AuthType, BoxedProvider, Provider, ProviderFactory, ProviderInfo, ToolDefinition,
        ToolError, ToolHandler, ToolResult,
    };

    static WEATHER: ProviderInfo = ProviderInfo {
        id: "weather",
        name: "Weather",
        description: "Forecasts",
        auth_type: AuthType::OAuth2,
    };

    static NOTES: ProviderInfo = ProviderInfo {
        id: "notes",
        name: "Notes",
        description: "Notebook",
        auth_type: AuthType::ApiKey,
    };

    /// Echoes its arguments plus the credentials it was built with.
    struct Echo {
        token: Option<String>,
    }

    #[async_trait]
    impl ToolHandler for Echo {
        async fn call(&self, args: Value) -> ToolResult<Value> {
            Ok(json!({"args": args, "token": self.token}))
        }
    }

    struct Fail;

    #[async_trait]
    impl ToolHandler for Fail {
        async fn call(&self, _args: Value) -> ToolResult<Value> {
            Err(ToolError::api(500, "upstream exploded"))
        }
    }

    struct Stub {
        info: &'static ProviderInfo,
        token: Option<String>,
    }

    impl Provider for Stub {
        fn info(&self) -> &ProviderInfo {
            self.info
        }

        fn tools(&self) -> Vec<ToolDefinition> {
            vec![
                ToolDefinition::new(
                    "echo",
                    "Echo arguments",
                    json!({"type": "object", "properties": {}}),
                    Arc::new(Echo {
                        token: self.token.clone(),
                    }),
                ),
                ToolDefinition::new("fail", "Always fails", json!({"type": "object"}), Arc::new(Fail)),
            ]
        }
    }

    struct StubFactory {
        info: &'static ProviderInfo,
        created: Arc<AtomicUsize>,
    }

    impl ProviderFactory for StubFactory {
        fn info(&self) -> &ProviderInfo {
            self.info
        }

        fn create(&self, credentials: Option<Credentials>) -> BoxedProvider {
            self.created.fetch_add(1, Ordering::SeqCst);
            let token = match credentials {
                Some(Credentials::OAuth2(c)) => Some(c.access_token),
                Some(Credentials::ApiKey { api_key, .. }) => Some(api_key),
                _ => None,
            };
            Box::new(Stub {
                info: self.info,
                token,
            })
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<AtomicUsize>) {
        let created = Arc::new(AtomicUsize::new(0));
        let mut registry = ProviderRegistry::new();
        registry
            .register(Arc::new(StubFactory {
                info: &WEATHER,
                created: created.clone(),
            }))
            .unwrap();
        registry
            .register(Arc::new(StubFactory {
                info: &NOTES,
                created: created.clone(),
            }))
            .unwrap();
        (Dispatcher::new(Arc::new(registry)), created)
    }

    async fn send(dispatcher: &Dispatcher, body: Value) -> JsonRpcResponse {
        dispatcher.handle(body.to_string().as_bytes()).await
    }

    fn error_code(response: &JsonRpcResponse) -> i64 {
        response.error.as_ref().map(|e| e.code).unwrap_or_default()
    }

    fn error_data(response: &JsonRpcResponse) -> String {
        response
            .error
            .as_ref()
            .and_then(|e| e.data.as_ref())
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    #[tokio::test]
    async fn test_parse_error() {
        let (dispatcher, _) = dispatcher();
        let response = dispatcher.handle(b"{not json").await;
        assert_eq!(error_code(&response), PARSE_ERROR);
        assert_eq!(response.id, Value::Null);
    }

    #[tokio::test]
    async fn test_non_object_body_is_invalid_request() {
        let (dispatcher, _) = dispatcher();
        for body in [json!([{"jsonrpc": "2.0", "method": "tools/list", "id": 1}]), json!(42)] {
            let response = send(&dispatcher, body).await;
            assert_eq!(error_code(&response), INVALID_REQUEST);
            assert_eq!(response.id, Value::Null);
        }
    }

    #[tokio::test]
    async fn test_wrong_version_never_reaches_providers() {
        let (dispatcher, created) = dispatcher();
        let response = send(&dispatcher, json!({"method": "tools/list", "id": "abc"})).await;
        assert_eq!(error_code(&response), INVALID_REQUEST);
        assert_eq!(response.id, json!("abc"));

        let response = send(&dispatcher, json!({"jsonrpc": "1.0", "method": "tools/list", "id": 2})).await;
        assert_eq!(error_code(&response), INVALID_REQUEST);
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_method() {
        let (dispatcher, _) = dispatcher();
        for body in [
            json!({"jsonrpc": "2.0", "id": 1}),
            json!({"jsonrpc": "2.0", "method": "", "id": 1}),
            json!({"jsonrpc": "2.0", "method": 5, "id": 1}),
        ] {
            let response = send(&dispatcher, body).await;
            assert_eq!(error_code(&response), INVALID_REQUEST);
            assert_eq!(error_data(&response), "method is required");
        }
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (dispatcher, _) = dispatcher();
        let response = send(&dispatcher, json!({"jsonrpc": "2.0", "method": "initialize", "id": 9})).await;
        assert_eq!(error_code(&response), METHOD_NOT_FOUND);
        assert_eq!(response.id, json!(9));
    }

    #[tokio::test]
    async fn test_tools_list_namespaces_in_registry_order() {
        let (dispatcher, _) = dispatcher();
        let response = send(&dispatcher, json!({"jsonrpc": "2.0", "method": "tools/list", "id": 1})).await;
        assert!(response.error.is_none());

        let result: ListToolsResult = serde_json::from_value(response.result.unwrap()).unwrap();
        let names: Vec<&str> = result.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["weather__echo", "weather__fail", "notes__echo", "notes__fail"]);
        assert_eq!(result.tools[0].description, "[Weather] Echo arguments");
        assert_eq!(result.tools[2].input_schema["type"], "object");
    }

    #[tokio::test]
    async fn test_tools_list_is_idempotent() {
        let (dispatcher, _) = dispatcher();
        let body = json!({"jsonrpc": "2.0", "method": "tools/list", "params": {"ignored": true}, "id": 1});
        let first = serde_json::to_vec(&send(&dispatcher, body.clone()).await).unwrap();
        let second = serde_json::to_vec(&send(&dispatcher, body).await).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_call_routes_with_credentials() {
        let (dispatcher, _) = dispatcher();
        let response = send(
            &dispatcher,
            json!({
                "jsonrpc": "2.0",
                "method": "tools/call",
                "params": {
                    "name": "weather__echo",
                    "arguments": {"city": "Oslo"},
                    "_credentials": {"access_token": "tok"}
                },
                "id": 3
            }),
        )
        .await;

        assert_eq!(response.id, json!(3));
        assert_eq!(
            response.result.unwrap(),
            json!({"args": {"city": "Oslo"}, "token": "tok"})
        );
    }

    #[tokio::test]
    async fn test_call_defaults_arguments_to_empty_object() {
        let (dispatcher, _) = dispatcher();
        let result = dispatcher
            .call_tool(json!({"name": "notes__echo", "_credentials": {"access_token": "k"}}))
            .await
            .unwrap();
        assert_eq!(result, json!({"args": {}, "token": "k"}));
    }

    #[tokio::test]
    async fn test_call_error_order() {
        let (dispatcher, created) = dispatcher();

        let err = dispatcher.call_tool(json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::MissingToolName));

        let err = dispatcher.call_tool(json!({"name": "echo"})).await.unwrap_err();
        assert!(matches!(err, McpError::InvalidToolName(_)));

        let err = dispatcher.call_tool(json!({"name": "shop__echo"})).await.unwrap_err();
        assert!(matches!(err, McpError::UnknownProvider(id) if id == "shop"));

        assert_eq!(created.load(Ordering::SeqCst), 0);

        let err = dispatcher.call_tool(json!({"name": "weather__nope"})).await.unwrap_err();
        assert!(matches!(err, McpError::MissingAccessToken(_)));
        assert_eq!(created.load(Ordering::SeqCst), 0);

        let err = dispatcher
            .call_tool(json!({"name": "weather__nope", "_credentials": {"access_token": "t"}}))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::UnknownTool { ref tool, .. } if tool == "nope"));
    }

    #[tokio::test]
    async fn test_tool_name_splits_on_first_separator() {
        let (dispatcher, _) = dispatcher();
        let err = dispatcher
            .call_tool(json!({"name": "weather__echo__extra", "_credentials": {"access_token": "t"}}))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::UnknownTool { ref tool, .. } if tool == "echo__extra"));
    }

    #[tokio::test]
    async fn test_call_failures_use_application_code() {
        let (dispatcher, _) = dispatcher();
        let response = send(
            &dispatcher,
            json!({
                "jsonrpc": "2.0",
                "method": "tools/call",
                "params": {"name": "weather__fail", "_credentials": {"access_token": "t"}},
                "id": 4
            }),
        )
        .await;
        assert_eq!(error_code(&response), TOOL_CALL_FAILED);
        assert!(error_data(&response).contains("upstream exploded"));
        assert!(response.result.is_none());

        let response = send(
            &dispatcher,
            json!({"jsonrpc": "2.0", "method": "tools/call", "params": {"name": "echo"}, "id": 5}),
        )
        .await;
        assert_eq!(error_code(&response), TOOL_CALL_FAILED);
        assert!(error_data(&response).starts_with("Invalid tool name format"));
    }

    #[tokio::test]
    async fn test_malformed_params() {
        let (dispatcher, _) = dispatcher();
        let response = send(
            &dispatcher,
            json!({"jsonrpc": "2.0", "method": "tools/call", "params": ["weather__echo"], "id": 6}),
        )
        .await;
        assert_eq!(error_code(&response), INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_non_string_credentials_rejected() {
        let (dispatcher, _) = dispatcher();
        let err = dispatcher
            .call_tool(json!({
                "name": "weather__echo",
                "_credentials": {"access_token": "t", "refresh_token": 12}
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::InvalidCredentials { .. }));
    }
}
