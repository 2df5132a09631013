//! Server runtime and per-request context utilities

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use dashmap::DashMap;
use serde_json::Value;
use crate::auth::AuthenticatedUser;
use crate::app::handler::RequestHandler;
use crate::app::options::RuntimeMcpOptions;
use crate::types::{PropertyType, Request, Response};
use crate::types::schema::{sealed::TypeCategorySealed, TypeCategory};

pub(crate) type RequestHandlers = HashMap<String, RequestHandler<Response>>;

/// Represents a Server runtime: the frozen options plus the method table.
///
/// Cloning is cheap; every transport connection shares the same runtime.
#[derive(Clone)]
pub struct ServerRuntime {
    pub(crate) options: RuntimeMcpOptions,
    pub(crate) handlers: Arc<RequestHandlers>,
}

impl Debug for ServerRuntime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerRuntime")
            .field("options", &self.options)
            .finish()
    }
}

impl ServerRuntime {
    /// Creates a new server runtime
    pub(crate) fn new(options: RuntimeMcpOptions, handlers: RequestHandlers) -> Self {
        Self {
            options,
            handlers: Arc::new(handlers),
        }
    }

    /// Provides the runtime options
    pub(crate) fn options(&self) -> RuntimeMcpOptions {
        self.options.clone()
    }
}

/// Represents a per-invocation MCP request context.
///
/// A context is created for each request and never shared across requests.
/// Handlers receive it by declaring a `Context` parameter; it is filled by
/// the server and never appears in a tool's input schema.
#[derive(Clone)]
pub struct Context {
    /// The id of the request being served, as a string.
    pub request_id: String,

    /// The client identity, when the transport knows one.
    pub client_id: Option<String>,

    pub(crate) user: Option<Arc<AuthenticatedUser>>,
    pub(crate) workspace: Option<String>,
    pub(crate) options: RuntimeMcpOptions,
    span: tracing::Span,
    state: Arc<DashMap<String, Value>>,
}

impl Debug for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("client_id", &self.client_id)
            .field("workspace", &self.workspace)
            .finish()
    }
}

impl Context {
    /// Creates a new [`Context`] for a request
    pub(crate) fn new(
        req: &Request,
        user: Option<Arc<AuthenticatedUser>>,
        workspace: Option<String>,
        options: RuntimeMcpOptions,
    ) -> Self {
        let request_id = req.id().to_string();
        let span = tracing::info_span!(
            "request",
            logger = "faro",
            id = %request_id,
            method = %req.method);
        Self {
            request_id,
            client_id: user.as_ref().map(|user| user.id.clone()),
            user,
            workspace,
            options,
            span,
            state: Arc::new(DashMap::new()),
        }
    }

    /// Returns the authenticated user, if any
    #[inline]
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        self.user.as_deref()
    }

    /// Returns the caller's workspace, if any
    #[inline]
    pub fn workspace(&self) -> Option<&str> {
        self.workspace.as_deref()
    }

    /// Returns the tracing span of the request being served
    #[inline]
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Stores a value in the request-scoped transient state
    pub fn set_state(&self, key: impl Into<String>, value: Value) {
        self.state.insert(key.into(), value);
    }

    /// Reads a value from the request-scoped transient state
    pub fn get_state(&self, key: &str) -> Option<Value> {
        self.state
            .get(key)
            .map(|entry| entry.value().clone())
    }

    /// Creates a bare context for unit tests
    #[cfg(test)]
    pub(crate) fn test() -> Self {
        use crate::app::options::McpOptions;
        use crate::types::RequestId;

        let req = Request::new(Some(RequestId::String("test".into())), "test", None);
        Self::new(&req, None, None, McpOptions::default().into_runtime())
    }
}

// The context parameter is filled by the server per call; it is marked with
// the `None` category so it never reaches a generated input schema.
impl TypeCategorySealed for Context {}
impl TypeCategory for Context {
    #[inline]
    fn category() -> PropertyType {
        PropertyType::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_keeps_transient_state_per_context() {
        let ctx = Context::test();
        ctx.set_state("k", Value::from(1));

        assert_eq!(ctx.get_state("k"), Some(Value::from(1)));
        assert_eq!(ctx.get_state("missing"), None);
    }

    #[test]
    fn it_is_excluded_from_schemas() {
        assert_eq!(Context::category(), PropertyType::None);
    }
}
