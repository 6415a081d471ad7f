//! HTTP routes for the OAuth flow.
//!
//! - `GET /auth/init?provider=&workspace_id=&redirect_uri=` - returns `{auth_url}`
//! - `GET /auth/callback?code=&state=` or `?error=` - HTML page or redirect

use crate::error::FlowError;
use crate::flow::{CallbackOutcome, CallbackRequest, FlowController, InitRequest, CALLBACK_PATH};
use crate::pages::failure_page;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Path of the flow initiation route.
pub const INIT_PATH: &str = "/auth/init";

/// Raw query pairs, in order. Kept as a list so repeated keys are not a
/// rejection.
type QueryPairs = Query<Vec<(String, String)>>;

#[derive(Debug, Serialize)]
struct InitResponse {
    auth_url: String,
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn from_flow(err: &FlowError) -> (StatusCode, Json<Self>) {
        (
            err.status(),
            Json(Self {
                error: err.to_string(),
            }),
        )
    }
}

/// Create the OAuth router.
pub fn create_auth_router(controller: Arc<FlowController>) -> Router {
    Router::new()
        .route(INIT_PATH, get(auth_init))
        .route(CALLBACK_PATH, get(auth_callback))
        .with_state(controller)
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// This server's callback URL.
///
/// Uses the configured public URL, else the request's `Host` and
/// `X-Forwarded-Proto` headers.
fn callback_url(controller: &FlowController, headers: &HeaderMap) -> Result<String, FlowError> {
    if let Some(base) = controller.public_url() {
        return Ok(format!("{}{}", base.trim_end_matches('/'), CALLBACK_PATH));
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| FlowError::CallbackUrl("missing Host header".to_string()))?;
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| *v == "http" || *v == "https")
        .unwrap_or("http");

    Ok(format!("{scheme}://{host}{CALLBACK_PATH}"))
}

async fn auth_init(
    State(controller): State<Arc<FlowController>>,
    headers: HeaderMap,
    Query(pairs): QueryPairs,
) -> Response {
    let request = InitRequest::from_pairs(&pairs);

    let result = callback_url(&controller, &headers)
        .and_then(|callback| controller.initiate(request, &callback, now()));

    match result {
        Ok(auth_url) => Json(InitResponse { auth_url }).into_response(),
        Err(e) => ApiError::from_flow(&e).into_response(),
    }
}

async fn auth_callback(
    State(controller): State<Arc<FlowController>>,
    headers: HeaderMap,
    Query(pairs): QueryPairs,
) -> Response {
    let request = CallbackRequest::from_pairs(&pairs);

    let result = match controller.verify_callback(request, now()) {
        Ok(verified) => match callback_url(&controller, &headers) {
            Ok(callback) => controller.complete(verified, &callback).await,
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(CallbackOutcome::Redirect(location)) => Redirect::to(&location).into_response(),
        Ok(CallbackOutcome::Page(html)) => Html(html).into_response(),
        Err(e) => (e.status(), Html(error_page(&e))).into_response(),
    }
}

fn error_page(err: &FlowError) -> String {
    match err {
        FlowError::Denied(reason) => failure_page("Authentication Failed", Some(reason)),
        FlowError::MissingParameters => failure_page("Missing parameters", None),
        FlowError::InvalidState(_) => failure_page("Invalid state", None),
        FlowError::TokenExchange(text) => failure_page("Token exchange failed", Some(text)),
        FlowError::Bridge(_) => failure_page("Failed to save credentials", None),
        other => failure_page("Authentication Failed", Some(&other.to_string())),
    }
}
