//! Request/response HTTP transport implementation
//!
//! A single POST endpoint accepts one JSON-RPC message per request and
//! returns the dispatcher's response as the body. JSON-RPC level errors
//! are returned with a 200 status per the MCP convention; only
//! transport-level envelope violations use 4xx.

use std::collections::HashMap;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response as HttpResponse},
    routing::{get, post},
    Json, Router,
};
use crate::app::context::ServerRuntime;
use crate::auth::AuthRequest;
use crate::error::{Error, ErrorCode};
use crate::types::{Message, RequestId, Response};

const DEFAULT_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_PATH: &str = "/mcp";

/// Request/response HTTP transport configuration
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub(crate) addr: String,
    pub(crate) path: String,
}

impl Default for HttpOptions {
    #[inline]
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.into(),
            path: DEFAULT_PATH.into(),
        }
    }
}

impl HttpOptions {
    /// Sets the socket address to listen on
    ///
    /// Default: `127.0.0.1:8080`
    pub fn with_addr(mut self, addr: &str) -> Self {
        self.addr = addr.into();
        self
    }

    /// Sets the endpoint path
    ///
    /// Default: `/mcp`
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = if path.starts_with('/') {
            path.into()
        } else {
            format!("/{path}")
        };
        self
    }
}

/// Serves the runtime over request/response HTTP
pub(crate) async fn serve(options: HttpOptions, runtime: ServerRuntime) {
    let endpoint = post(mcp_post)
        .get(mcp_get)
        .options(mcp_options);
    let mut router = Router::new()
        .route("/health", get(health))
        .route(&options.path, endpoint.clone());
    if options.path != "/" {
        router = router.route(&format!("{}/", options.path), endpoint);
    }
    let router = router.with_state(runtime);

    let listener = match tokio::net::TcpListener::bind(&options.addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(logger = "faro", "Failed to bind {}: {err:?}", options.addr);
            return;
        }
    };

    tracing::info!(logger = "faro", "Listening: http://{}{}", options.addr, options.path);

    if let Err(err) = axum::serve(listener, router).await {
        tracing::error!(logger = "faro", "HTTP server was shutdown: {err:?}");
    }
}

/// Builds an [`AuthRequest`] from the parts of an HTTP request
pub(crate) fn auth_request_from(
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    body: &Bytes,
) -> AuthRequest {
    let mut auth = AuthRequest::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            auth = auth.with_header(name.as_str(), value);
        }
    }
    for (name, value) in query {
        auth = auth.with_query(name.clone(), value.clone());
    }
    if !body.is_empty() {
        auth = auth.with_body(body.clone());
    }
    auth
}

async fn mcp_post(
    State(runtime): State<ServerRuntime>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResponse {
    if body.is_empty() {
        let error = Response::error(
            RequestId::Null,
            Error::new(ErrorCode::InvalidRequest, "Empty request body"));
        return (StatusCode::BAD_REQUEST, Json(error)).into_response();
    }
    let auth = auth_request_from(&headers, &query, &body);
    match Message::parse(&body) {
        Err(err) => {
            let error = Response::error(RequestId::Null, err);
            (StatusCode::OK, Json(error)).into_response()
        }
        Ok(msg) => match runtime.handle(msg, auth).await {
            Some(resp) => (StatusCode::OK, Json(resp)).into_response(),
            None => StatusCode::ACCEPTED.into_response(),
        },
    }
}

async fn mcp_get() -> StatusCode {
    StatusCode::METHOD_NOT_ALLOWED
}

async fn mcp_options() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, Authorization, X-API-TOKEN"),
        ],
    )
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
