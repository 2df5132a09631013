//! Transport protocols for communicating between server and client
//!
//! A transport's contract is small: read frames, hand each one to the
//! dispatcher together with an [`AuthRequest`](crate::auth::AuthRequest)
//! carrying the transport's credentials, and write back whatever response
//! the dispatcher produces.

use crate::app::context::ServerRuntime;

pub mod stdio;
pub mod http;
pub mod sse;

/// Holds all supported transport protocols
#[derive(Debug, Clone)]
pub(crate) enum TransportProto {
    /// Newline-delimited JSON over the process's stdin/stdout.
    Stdio,

    /// Plain request/response HTTP.
    Http(http::HttpOptions),

    /// Streaming-event HTTP (SSE).
    Sse(sse::SseOptions),
}

impl Default for TransportProto {
    #[inline]
    fn default() -> Self {
        TransportProto::Stdio
    }
}

impl TransportProto {
    /// Runs the server over this transport until the peer disconnects
    /// or the process is told to shut down
    pub(crate) async fn serve(self, runtime: ServerRuntime) {
        match self {
            TransportProto::Stdio => stdio::serve(runtime).await,
            TransportProto::Http(options) => http::serve(options, runtime).await,
            TransportProto::Sse(options) => sse::serve(options, runtime).await,
        }
    }
}
