//! Streaming-event HTTP (SSE) transport implementation
//!
//! `GET /sse` opens a long-lived event stream: the server generates a
//! session id, stores the request's credentials against it, and tells the
//! client where to POST subsequent messages through the `endpoint` event.
//! `POST /message?sessionId=…` re-associates a message with its stream's
//! credentials and returns the dispatcher's response as the body.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{sse::{Event, Sse}, IntoResponse, Response as HttpResponse},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::{stream, Stream, StreamExt};
use tokio_stream::wrappers::IntervalStream;
use uuid::Uuid;
use crate::app::context::ServerRuntime;
use crate::auth::AuthRequest;
use crate::transport::http::auth_request_from;
use crate::types::{Message, RequestId, Response};

const DEFAULT_ADDR: &str = "127.0.0.1:8080";
const PING_INTERVAL: Duration = Duration::from_secs(15);

/// Streaming-event HTTP transport configuration
#[derive(Debug, Clone)]
pub struct SseOptions {
    pub(crate) addr: String,
}

impl Default for SseOptions {
    #[inline]
    fn default() -> Self {
        Self { addr: DEFAULT_ADDR.into() }
    }
}

impl SseOptions {
    /// Sets the socket address to listen on
    ///
    /// Default: `127.0.0.1:8080`
    pub fn with_addr(mut self, addr: &str) -> Self {
        self.addr = addr.into();
        self
    }
}

/// A live SSE session: the credentials of the stream-opening request
/// plus its creation time
#[derive(Debug, Clone)]
struct Session {
    auth: AuthRequest,
    created_at: DateTime<Utc>,
}

type Sessions = Arc<DashMap<String, Session>>;

#[derive(Clone)]
struct SseState {
    runtime: ServerRuntime,
    sessions: Sessions,
}

/// Removes the session entry once its event stream closes
struct SessionGuard {
    id: String,
    sessions: Sessions,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.remove(&self.id);
        tracing::debug!(logger = "faro", "Session closed: {}", self.id);
    }
}

/// Serves the runtime over streaming-event HTTP
pub(crate) async fn serve(options: SseOptions, runtime: ServerRuntime) {
    let state = SseState {
        runtime,
        sessions: Arc::new(DashMap::new()),
    };
    let router = Router::new()
        .route("/sse", get(sse_open))
        .route("/message", post(sse_message))
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(&options.addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(logger = "faro", "Failed to bind {}: {err:?}", options.addr);
            return;
        }
    };

    tracing::info!(logger = "faro", "Listening: http://{}/sse", options.addr);

    if let Err(err) = axum::serve(listener, router).await {
        tracing::error!(logger = "faro", "SSE server was shutdown: {err:?}");
    }
}

async fn sse_open(
    State(state): State<SseState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let session_id = Uuid::new_v4().simple().to_string();
    let auth = auth_request_from(&headers, &query, &Bytes::new());
    state.sessions.insert(session_id.clone(), Session {
        auth,
        created_at: Utc::now(),
    });

    tracing::debug!(logger = "faro", "Session opened: {session_id}");

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    let endpoint = serde_json::json!({
        "uri": format!("http://{host}/message?sessionId={session_id}")
    });

    let guard = SessionGuard {
        id: session_id,
        sessions: state.sessions.clone(),
    };

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(event_stream(endpoint.to_string(), guard)),
    )
}

fn event_stream(
    endpoint: String,
    guard: SessionGuard,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let endpoint = stream::once(async move {
        Ok(Event::default().event("endpoint").data(endpoint))
    });
    let start = tokio::time::Instant::now() + PING_INTERVAL;
    let pings = IntervalStream::new(tokio::time::interval_at(start, PING_INTERVAL))
        .map(move |_| {
            let _ = &guard;
            let ping = serde_json::json!({ "time": Utc::now().timestamp() });
            Ok(Event::default().event("ping").data(ping.to_string()))
        });
    endpoint.chain(pings)
}

async fn sse_message(
    State(state): State<SseState>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> HttpResponse {
    let Some(session_id) = query.get("sessionId") else {
        return (StatusCode::BAD_REQUEST, "Missing sessionId").into_response();
    };
    let auth = match state.sessions.get(session_id) {
        Some(session) => {
            tracing::trace!(
                logger = "faro",
                "Message for session {session_id} (opened {})", session.created_at);
            session.auth.clone().with_body(body.clone())
        }
        None => return (StatusCode::BAD_REQUEST, "Unknown session").into_response(),
    };
    match Message::parse(&body) {
        Err(err) => {
            let error = Response::error(RequestId::Null, err);
            (StatusCode::OK, Json(error)).into_response()
        }
        Ok(msg) => match state.runtime.handle(msg, auth).await {
            Some(resp) => (StatusCode::OK, Json(resp)).into_response(),
            None => StatusCode::ACCEPTED.into_response(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> SseState {
        SseState {
            runtime: crate::App::new().into_test_runtime(),
            sessions: Arc::new(DashMap::new()),
        }
    }

    #[test]
    fn it_generates_hex_session_ids() {
        let id = Uuid::new_v4().simple().to_string();

        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn it_removes_sessions_when_the_guard_drops() {
        let sessions: Sessions = Arc::new(DashMap::new());
        sessions.insert("abc".into(), Session {
            auth: AuthRequest::new(),
            created_at: Utc::now(),
        });

        drop(SessionGuard { id: "abc".into(), sessions: sessions.clone() });

        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn it_rejects_unknown_sessions() {
        let state = test_state();

        let resp = sse_message(
            State(state),
            Query(HashMap::from([("sessionId".to_owned(), "missing".to_owned())])),
            Bytes::from_static(br#"{"jsonrpc":"2.0","id":1,"method":"ping","params":{}}"#)).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn it_dispatches_with_stored_session_credentials() {
        let state = test_state();
        state.sessions.insert("abc".into(), Session {
            auth: AuthRequest::new().with_header("x-api-token", "secret"),
            created_at: Utc::now(),
        });

        let resp = sse_message(
            State(state),
            Query(HashMap::from([("sessionId".to_owned(), "abc".to_owned())])),
            Bytes::from_static(br#"{"jsonrpc":"2.0","id":1,"method":"ping","params":{}}"#)).await;

        assert_eq!(resp.status(), StatusCode::OK);
    }
}
