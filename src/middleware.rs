//! MCP Server middleware utilities
//!
//! Each registered middleware contributes two layers per request: an
//! `on_request` outer layer and a method-specific inner layer. The chain is
//! composed innermost-first, so the first registered middleware runs first.

use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use serde_json::Value;
use crate::auth::{AuthRequest, AuthenticatedUser};
use crate::error::Error;
use crate::types::{Message, Request, RequestId, Response};
use crate::{commands, types::{prompt, resource, tool}};

const DEFAULT_MW_CAPACITY: usize = 8;

/// Current middleware operation context.
///
/// Identity fields are read-only; [`MwContext::with_user`] and
/// [`MwContext::with_workspace`] produce new instances. The attribute map is
/// the only mutable channel shared across the chain's layers.
#[derive(Debug, Clone)]
pub struct MwContext {
    pub(crate) msg: Message,
    method: String,
    timestamp: DateTime<Utc>,
    pub(crate) user: Option<Arc<AuthenticatedUser>>,
    pub(crate) workspace: Option<String>,
    attributes: Arc<DashMap<String, Value>>,
    auth_request: Arc<AuthRequest>,
}

/// A reference to the next layer in the chain
pub type Next = Arc<
    dyn Fn(MwContext) -> BoxFuture<'static, Result<Response, Error>>
    + Send
    + Sync
>;

/// The hook a request method routes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hook {
    Initialize,
    CallTool,
    ListTools,
    ReadResource,
    ListResources,
    GetPrompt,
    ListPrompts,
    Other,
}

/// Maps an MCP method to its middleware hook.
///
/// `resources/templates/list` shares the `on_list_resources` hook; any
/// method not in the table uses only `on_request`.
pub(crate) fn hook_for(method: &str) -> Hook {
    match method {
        commands::INIT => Hook::Initialize,
        tool::commands::CALL => Hook::CallTool,
        tool::commands::LIST => Hook::ListTools,
        resource::commands::READ => Hook::ReadResource,
        resource::commands::LIST |
        resource::commands::TEMPLATES_LIST => Hook::ListResources,
        prompt::commands::GET => Hook::GetPrompt,
        prompt::commands::LIST => Hook::ListPrompts,
        _ => Hook::Other,
    }
}

/// An interceptor in the server's middleware pipeline.
///
/// Every hook is optional and defaults to passing the context through.
/// A hook may mutate the context before calling `next`, rewrite the
/// returned response, or short-circuit by returning without calling `next`.
/// Errors propagate to the dispatcher boundary.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Catch-all hook; runs for every request method.
    async fn on_request(&self, ctx: MwContext, next: Next) -> Result<Response, Error> {
        next(ctx).await
    }

    /// Runs for `initialize` requests.
    async fn on_initialize(&self, ctx: MwContext, next: Next) -> Result<Response, Error> {
        next(ctx).await
    }

    /// Runs for `tools/call` requests.
    async fn on_call_tool(&self, ctx: MwContext, next: Next) -> Result<Response, Error> {
        next(ctx).await
    }

    /// Runs for `tools/list` requests.
    async fn on_list_tools(&self, ctx: MwContext, next: Next) -> Result<Response, Error> {
        next(ctx).await
    }

    /// Runs for `resources/read` requests.
    async fn on_read_resource(&self, ctx: MwContext, next: Next) -> Result<Response, Error> {
        next(ctx).await
    }

    /// Runs for `resources/list` and `resources/templates/list` requests.
    async fn on_list_resources(&self, ctx: MwContext, next: Next) -> Result<Response, Error> {
        next(ctx).await
    }

    /// Runs for `prompts/get` requests.
    async fn on_get_prompt(&self, ctx: MwContext, next: Next) -> Result<Response, Error> {
        next(ctx).await
    }

    /// Runs for `prompts/list` requests.
    async fn on_list_prompts(&self, ctx: MwContext, next: Next) -> Result<Response, Error> {
        next(ctx).await
    }
}

/// MCP middleware pipeline.
#[derive(Clone, Default)]
pub(crate) struct Middlewares {
    pipeline: Vec<Arc<dyn Middleware>>,
}

impl MwContext {
    /// Creates a new middleware context for a request
    pub(crate) fn new(
        req: Request,
        user: Option<Arc<AuthenticatedUser>>,
        workspace: Option<String>,
        auth_request: Arc<AuthRequest>,
    ) -> Self {
        Self {
            method: req.method.clone(),
            msg: Message::Request(req),
            timestamp: Utc::now(),
            user,
            workspace,
            attributes: Arc::new(DashMap::new()),
            auth_request,
        }
    }

    /// Returns current MCP [`Message`] ID
    #[inline]
    pub fn id(&self) -> RequestId {
        self.msg.id()
    }

    /// Returns the request method
    #[inline]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the moment the request entered the chain
    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
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

    /// Returns the transport's credential-carrying request
    #[inline]
    pub fn auth_request(&self) -> &AuthRequest {
        &self.auth_request
    }

    /// If the current message type is [`Request`] returns a reference to it,
    /// otherwise returns `None`
    #[inline]
    pub fn request(&self) -> Option<&Request> {
        if let Message::Request(req) = &self.msg {
            Some(req)
        } else {
            None
        }
    }

    /// If the current message type is [`Request`] returns a mutable reference to it,
    /// otherwise returns `None`
    #[inline]
    pub fn request_mut(&mut self) -> Option<&mut Request> {
        if let Message::Request(req) = &mut self.msg {
            Some(req)
        } else {
            None
        }
    }

    /// Returns a new context with the user attached
    pub fn with_user(mut self, user: AuthenticatedUser) -> Self {
        self.user = Some(Arc::new(user));
        self
    }

    /// Returns a new context with the workspace attached
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    /// Splits the context into the parts the terminal handler needs
    pub(crate) fn into_parts(self) -> (Message, Option<Arc<AuthenticatedUser>>, Option<String>) {
        (self.msg, self.user, self.workspace)
    }

    /// Stores a request-scoped attribute visible to all hooks
    pub fn set_attribute(&self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    /// Reads a request-scoped attribute
    pub fn get_attribute(&self, key: &str) -> Option<Value> {
        self.attributes
            .get(key)
            .map(|entry| entry.value().clone())
    }

    /// Returns `true` when the attribute is present
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }
}

impl Middlewares {
    /// Initializes a new middleware pipeline
    pub(crate) fn new() -> Self {
        Self { pipeline: Vec::with_capacity(DEFAULT_MW_CAPACITY) }
    }

    /// Adds middleware to the pipeline
    #[inline]
    pub(crate) fn add(&mut self, middleware: Arc<dyn Middleware>) {
        self.pipeline.push(middleware);
    }

    /// Wraps the terminal handler into the full chain for the given hook.
    ///
    /// The terminal is wrapped, innermost first, by each middleware's
    /// method-specific hook in reverse registration order, then by each
    /// middleware's `on_request` hook, likewise in reverse order; the first
    /// registered middleware therefore runs outermost.
    pub(crate) fn compose(&self, hook: Hook, terminal: Next) -> Next {
        let mut next = terminal;
        if hook != Hook::Other {
            for mw in self.pipeline.iter().rev() {
                let mw = mw.clone();
                let inner = next.clone();
                next = Arc::new(move |ctx: MwContext| {
                    let mw = mw.clone();
                    let inner = inner.clone();
                    Box::pin(async move {
                        match hook {
                            Hook::Initialize => mw.on_initialize(ctx, inner).await,
                            Hook::CallTool => mw.on_call_tool(ctx, inner).await,
                            Hook::ListTools => mw.on_list_tools(ctx, inner).await,
                            Hook::ReadResource => mw.on_read_resource(ctx, inner).await,
                            Hook::ListResources => mw.on_list_resources(ctx, inner).await,
                            Hook::GetPrompt => mw.on_get_prompt(ctx, inner).await,
                            Hook::ListPrompts => mw.on_list_prompts(ctx, inner).await,
                            Hook::Other => inner(ctx).await,
                        }
                    })
                });
            }
        }
        for mw in self.pipeline.iter().rev() {
            let mw = mw.clone();
            let inner = next.clone();
            next = Arc::new(move |ctx: MwContext| {
                let mw = mw.clone();
                let inner = inner.clone();
                Box::pin(async move { mw.on_request(ctx, inner).await })
            });
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use super::*;
    use crate::types::RequestId;

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Middleware for Recorder {
        async fn on_request(&self, ctx: MwContext, next: Next) -> Result<Response, Error> {
            self.log.lock().unwrap().push(format!("request-before-{}", self.label));
            let resp = next(ctx).await;
            self.log.lock().unwrap().push(format!("request-after-{}", self.label));
            resp
        }

        async fn on_call_tool(&self, ctx: MwContext, next: Next) -> Result<Response, Error> {
            self.log.lock().unwrap().push(format!("tool-before-{}", self.label));
            let resp = next(ctx).await;
            self.log.lock().unwrap().push(format!("tool-after-{}", self.label));
            resp
        }
    }

    struct ShortCircuit;

    #[async_trait]
    impl Middleware for ShortCircuit {
        async fn on_request(&self, ctx: MwContext, _next: Next) -> Result<Response, Error> {
            Ok(Response::empty(ctx.id()))
        }
    }

    fn ctx_for(method: &str) -> MwContext {
        let req = Request::new(Some(RequestId::Number(1)), method, None);
        MwContext::new(req, None, None, Arc::new(AuthRequest::new()))
    }

    fn terminal(log: Arc<Mutex<Vec<String>>>) -> Next {
        Arc::new(move |ctx: MwContext| {
            let log = log.clone();
            Box::pin(async move {
                log.lock().unwrap().push("handler".into());
                Ok(Response::empty(ctx.id()))
            })
        })
    }

    #[tokio::test]
    async fn it_runs_hooks_in_registration_order_outermost_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut middlewares = Middlewares::new();
        middlewares.add(Arc::new(Recorder { label: "1", log: log.clone() }));
        middlewares.add(Arc::new(Recorder { label: "2", log: log.clone() }));

        let chain = middlewares.compose(Hook::CallTool, terminal(log.clone()));
        chain(ctx_for("tools/call")).await.unwrap();

        let log = log.lock().unwrap();
        assert_eq!(*log, vec![
            "request-before-1",
            "request-before-2",
            "tool-before-1",
            "tool-before-2",
            "handler",
            "tool-after-2",
            "tool-after-1",
            "request-after-2",
            "request-after-1",
        ]);
    }

    #[tokio::test]
    async fn it_skips_method_hooks_for_unmapped_methods() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut middlewares = Middlewares::new();
        middlewares.add(Arc::new(Recorder { label: "1", log: log.clone() }));

        let chain = middlewares.compose(Hook::Other, terminal(log.clone()));
        chain(ctx_for("ping")).await.unwrap();

        let log = log.lock().unwrap();
        assert_eq!(*log, vec!["request-before-1", "handler", "request-after-1"]);
    }

    #[tokio::test]
    async fn it_short_circuits_without_running_the_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut middlewares = Middlewares::new();
        middlewares.add(Arc::new(ShortCircuit));

        let chain = middlewares.compose(Hook::CallTool, terminal(log.clone()));
        let resp = chain(ctx_for("tools/call")).await.unwrap();

        assert!(resp.result.is_some());
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn it_shares_attributes_across_layers() {
        struct Writer;
        struct Reader {
            seen: Arc<Mutex<Option<Value>>>,
        }

        #[async_trait]
        impl Middleware for Writer {
            async fn on_request(&self, ctx: MwContext, next: Next) -> Result<Response, Error> {
                ctx.set_attribute("trace", Value::from("abc"));
                next(ctx).await
            }
        }

        #[async_trait]
        impl Middleware for Reader {
            async fn on_request(&self, ctx: MwContext, next: Next) -> Result<Response, Error> {
                *self.seen.lock().unwrap() = ctx.get_attribute("trace");
                next(ctx).await
            }
        }

        let seen = Arc::new(Mutex::new(None));
        let mut middlewares = Middlewares::new();
        middlewares.add(Arc::new(Writer));
        middlewares.add(Arc::new(Reader { seen: seen.clone() }));

        let chain = middlewares.compose(
            Hook::Other,
            Arc::new(|ctx: MwContext| Box::pin(async move { Ok(Response::empty(ctx.id())) })));
        chain(ctx_for("ping")).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), Some(Value::from("abc")));
    }

    #[tokio::test]
    async fn it_attaches_users_by_copy() {
        struct Attach;

        #[async_trait]
        impl Middleware for Attach {
            async fn on_request(&self, ctx: MwContext, next: Next) -> Result<Response, Error> {
                assert!(ctx.user().is_none());
                let ctx = ctx.with_user(crate::auth::AuthenticatedUser::new("u1"));
                next(ctx).await
            }
        }

        let mut middlewares = Middlewares::new();
        middlewares.add(Arc::new(Attach));

        let chain = middlewares.compose(
            Hook::Other,
            Arc::new(|ctx: MwContext| Box::pin(async move {
                assert_eq!(ctx.user().map(|u| u.id.as_str()), Some("u1"));
                Ok(Response::empty(ctx.id()))
            })));
        chain(ctx_for("ping")).await.unwrap();
    }
}
