//! Represents an MCP application

use std::sync::Arc;
use self::{
    context::{Context, RequestHandlers, ServerRuntime},
    handler::{
        Arguments,
        FromArguments,
        FromHandlerParams,
        GenericHandler,
        HandlerParams,
        RequestFunc,
    },
    options::McpOptions,
};
use crate::commands;
use crate::auth::{AuthRequest, AuthResult};
use crate::error::{Error, ErrorCode};
use crate::middleware::{hook_for, Middleware, MwContext, Next};
use crate::types::{
    InitializeResult, InitializeRequestParams,
    IntoResponse, Response, Request, Message,
    ListToolsRequestParams, CallToolRequestParams, ListToolsResult, CallToolResponse, Tool, ToolHandler,
    ListResourceTemplatesRequestParams, ListResourceTemplatesResult, ResourceTemplate,
    ListResourcesRequestParams, ListResourcesResult, ReadResourceRequestParams, ReadResourceResult,
    Resource, ResourceHandler,
    ListPromptsRequestParams, ListPromptsResult, GetPromptRequestParams, GetPromptResult,
    Prompt, PromptHandler,
    notification::{commands as notifications, Notification},
};

pub mod options;
pub mod context;
pub mod handler;

/// Represents an MCP server application
pub struct App {
    options: McpOptions,
    handlers: RequestHandlers,
}

impl Default for App {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Initializes a new app
    pub fn new() -> Self {
        let mut app = Self {
            options: McpOptions::default(),
            handlers: RequestHandlers::new()
        };

        app.map_handler(commands::INIT, Self::init);
        app.map_handler(commands::INITIALIZED, Self::initialized);
        app.map_handler(commands::PING, Self::ping);

        app.map_handler(crate::types::tool::commands::LIST, Self::tools);
        app.map_handler(crate::types::tool::commands::CALL, Self::tool);

        app.map_handler(crate::types::resource::commands::LIST, Self::resources);
        app.map_handler(crate::types::resource::commands::TEMPLATES_LIST, Self::resource_templates);
        app.map_handler(crate::types::resource::commands::READ, Self::resource);

        app.map_handler(crate::types::prompt::commands::LIST, Self::prompts);
        app.map_handler(crate::types::prompt::commands::GET, Self::prompt);

        app
    }

    /// Run the MCP server
    ///
    /// # Example
    /// ```no_run
    /// use faro::App;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let mut app = App::new();
    ///
    /// // configure tools, resources, prompts
    ///
    /// app.run().await;
    /// # }
    /// ```
    pub async fn run(mut self) {
        let proto = self.options.transport();
        let runtime = ServerRuntime::new(self.options.into_runtime(), self.handlers);
        proto.serve(runtime).await
    }

    /// Configure MCP server options
    pub fn with_options<F>(mut self, config: F) -> Self
    where
        F: FnOnce(McpOptions) -> McpOptions
    {
        self.options = config(self.options);
        self
    }

    /// Registers a middleware in the pipeline.
    ///
    /// Middlewares run in registration order, outermost first.
    pub fn wrap(mut self, middleware: impl Middleware + 'static) -> Self {
        self.options.add_middleware(Arc::new(middleware));
        self
    }

    /// Maps an MCP client request to a specific function
    pub fn map_handler<F, R, Args>(&mut self, name: &str, handler: F) -> &mut Self
    where
        F: GenericHandler<Args, Output = R>,
        R: IntoResponse + Send + 'static,
        Args: FromHandlerParams + Send + Sync + 'static,
    {
        let handler = RequestFunc::new(handler);
        self.handlers.insert(name.into(), handler);
        self
    }

    /// Maps an MCP tool call request to a specific function and returns a
    /// mutable reference to the [`Tool`] for further configuration
    ///
    /// # Example
    /// ```no_run
    /// use faro::{App, types::ToolParam};
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let mut app = App::new();
    ///
    /// app.map_tool("hello", |name: String| async move {
    ///     format!("Hello, {name}")
    /// }).with_params([ToolParam::string("name")]);
    ///
    /// # app.run().await;
    /// # }
    /// ```
    pub fn map_tool<F, R, Args>(&mut self, name: &str, handler: F) -> &mut Tool
    where
        F: ToolHandler<Args, Output = R>,
        R: Into<CallToolResponse> + Send + 'static,
        Args: FromArguments + Send + Sync + 'static,
    {
        self.options.add_tool(Tool::new(name, handler))
    }

    /// Maps a read of an exact resource URI to a specific function
    ///
    /// # Example
    /// ```no_run
    /// use faro::App;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let mut app = App::new();
    ///
    /// app.map_resource("res://greeting", "greeting", || async {
    ///     "Hello!"
    /// });
    ///
    /// # app.run().await;
    /// # }
    /// ```
    pub fn map_resource<F, R, Args>(&mut self, uri: &str, name: &str, handler: F) -> &mut Resource
    where
        F: ResourceHandler<Args, Output = R>,
        R: TryInto<ReadResourceResult> + Send + 'static,
        R::Error: Into<Error>,
        Args: FromArguments + Send + Sync + 'static,
    {
        self.options.add_resource(Resource::new(uri, name, handler))
    }

    /// Maps reads of a URI template to a specific function; template
    /// variables bind positionally to the handler's parameters
    ///
    /// # Example
    /// ```no_run
    /// use faro::App;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let mut app = App::new();
    ///
    /// app.map_resource_template("res://{name}", "read_resource", |name: String| async move {
    ///     format!("Resource: {name} content")
    /// });
    ///
    /// # app.run().await;
    /// # }
    /// ```
    pub fn map_resource_template<F, R, Args>(
        &mut self,
        uri_template: &str,
        name: &str,
        handler: F
    ) -> &mut ResourceTemplate
    where
        F: ResourceHandler<Args, Output = R>,
        R: TryInto<ReadResourceResult> + Send + 'static,
        R::Error: Into<Error>,
        Args: FromArguments + Send + Sync + 'static,
    {
        self.options.add_resource_template(ResourceTemplate::new(uri_template, name, handler))
    }

    /// Maps an MCP get prompt request to a specific function
    ///
    /// # Example
    /// ```no_run
    /// use faro::{App, types::Role};
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let mut app = App::new();
    ///
    /// app.map_prompt("analyze-code", |lang: String| async move {
    ///     (format!("Language: {lang}"), Role::User)
    /// }).with_args([("lang", "The language to analyze")]);
    ///
    /// # app.run().await;
    /// # }
    /// ```
    pub fn map_prompt<F, R, Args>(&mut self, name: &str, handler: F) -> &mut Prompt
    where
        F: PromptHandler<Args, Output = R>,
        R: TryInto<GetPromptResult> + Send + 'static,
        R::Error: Into<Error>,
        Args: FromArguments + Send + Sync + 'static,
    {
        self.options.add_prompt(Prompt::new(name, handler))
    }

    /// Connection initialization handler
    async fn init(
        ctx: Context,
        _params: InitializeRequestParams
    ) -> Result<InitializeResult, Error> {
        ctx.options.set_initialized();
        Ok(InitializeResult::new(&ctx.options))
    }

    /// Post-handshake acknowledgment handler
    async fn initialized() {}

    /// Ping request handler
    async fn ping() -> serde_json::Value {
        serde_json::json!({ "pong": true })
    }

    /// Tools request handler
    async fn tools(
        ctx: Context,
        _params: ListToolsRequestParams
    ) -> ListToolsResult {
        ctx.options
            .tools(ctx.user.as_deref(), ctx.workspace.as_deref())
            .into()
    }

    /// A tool call request handler
    async fn tool(
        ctx: Context,
        params: CallToolRequestParams
    ) -> Result<CallToolResponse, Error> {
        let options = ctx.options.clone();
        let Some(tool) = options.get_tool(&params.name) else {
            return Err(Error::new(
                ErrorCode::NotFound,
                format!("Unknown tool: {}", params.name)));
        };
        tool.authorize(ctx.user.as_deref(), ctx.workspace.as_deref(), params.args.as_ref())?;
        let values = tool.bind(params.args.as_ref())?;
        tool.call(Arguments::new(values, ctx)).await
    }

    /// Resources request handler
    async fn resources(
        ctx: Context,
        _params: ListResourcesRequestParams
    ) -> ListResourcesResult {
        ctx.options
            .resources(ctx.user.as_deref(), ctx.workspace.as_deref())
            .into()
    }

    /// Resource templates request handler
    async fn resource_templates(
        ctx: Context,
        _params: ListResourceTemplatesRequestParams
    ) -> ListResourceTemplatesResult {
        ctx.options
            .resource_templates(ctx.user.as_deref(), ctx.workspace.as_deref())
            .into()
    }

    /// A read resource request handler.
    ///
    /// An exact resource wins; otherwise the templates are consulted in
    /// registration order and the first match serves the read.
    async fn resource(
        ctx: Context,
        params: ReadResourceRequestParams
    ) -> Result<ReadResourceResult, Error> {
        let options = ctx.options.clone();
        if let Some(resource) = options.get_resource(&params.uri) {
            resource.authorize(ctx.user.as_deref(), ctx.workspace.as_deref())?;
            let result = resource.call(Arguments::new(Vec::new(), ctx)).await?;
            return Ok(result.fill_missing(&params.uri, resource.mime.as_deref()));
        }
        let matched = options
            .templates()
            .iter()
            .find_map(|template| template
                .matches(&params.uri)
                .map(|vars| (template, vars)));
        let Some((template, vars)) = matched else {
            return Err(Error::new(
                ErrorCode::NotFound,
                format!("Unknown resource: {}", params.uri)));
        };
        template.authorize(ctx.user.as_deref(), ctx.workspace.as_deref())?;
        let values = template.bind(&vars)?;
        let result = template.call(Arguments::new(values, ctx)).await?;
        Ok(result.fill_missing(&params.uri, template.mime.as_deref()))
    }

    /// Prompts request handler
    async fn prompts(
        ctx: Context,
        _params: ListPromptsRequestParams
    ) -> ListPromptsResult {
        ctx.options
            .prompts(ctx.user.as_deref(), ctx.workspace.as_deref())
            .into()
    }

    /// A get prompt request handler
    async fn prompt(
        ctx: Context,
        params: GetPromptRequestParams
    ) -> Result<GetPromptResult, Error> {
        let options = ctx.options.clone();
        let Some(prompt) = options.get_prompt(&params.name) else {
            return Err(Error::new(
                ErrorCode::NotFound,
                format!("Unknown prompt: {}", params.name)));
        };
        prompt.authorize(ctx.user.as_deref(), ctx.workspace.as_deref(), params.args.as_ref())?;
        let values = prompt.bind(params.args.as_ref())?;
        prompt.call(Arguments::new(values, ctx)).await
    }

    /// Freezes the app into a runtime without starting a transport
    #[cfg(test)]
    pub(crate) fn into_test_runtime(mut self) -> ServerRuntime {
        let _ = self.options.transport();
        ServerRuntime::new(self.options.into_runtime(), self.handlers)
    }
}

impl ServerRuntime {
    /// Handles a single decoded message.
    ///
    /// Requests produce a response; notifications produce none.
    pub(crate) async fn handle(&self, msg: Message, auth_request: AuthRequest) -> Option<Response> {
        match msg {
            Message::Request(req) => Some(self.handle_request(req, auth_request).await),
            Message::Notification(notification) => {
                self.handle_notification(notification).await;
                None
            }
        }
    }

    async fn handle_request(&self, req: Request, auth_request: AuthRequest) -> Response {
        let req_id = req.id();

        tracing::trace!(logger = "faro", "Received: {:?}", req);

        match self.dispatch(req, auth_request).await {
            Ok(resp) => resp,
            Err(err) => Response::error(req_id, err),
        }
    }

    /// The per-request dispatch flow: authentication, the pre-init gate,
    /// the middleware chain and the terminal handler. This is the single
    /// place where raised errors become JSON-RPC error envelopes (one
    /// level up, in [`handle_request`](Self::handle_request)).
    async fn dispatch(&self, req: Request, auth_request: AuthRequest) -> Result<Response, Error> {
        let method = req.method.clone();
        let options = self.options();

        let mut user = None;
        let mut workspace = None;
        if let Some(provider) = options.auth_provider() {
            if !commands::PUBLIC.contains(&method.as_str()) {
                match provider.authenticate(&auth_request).await {
                    AuthResult::Success { user: authenticated, workspace: scope } => {
                        workspace = scope.or_else(|| authenticated.workspace.clone());
                        user = Some(Arc::new(authenticated));
                    }
                    AuthResult::Failed(reason) => {
                        return Err(Error::new(ErrorCode::Unauthorized, reason));
                    }
                    AuthResult::Unauthenticated if options.auth_required() => {
                        return Err(Error::new(ErrorCode::Unauthorized, "Authentication required"));
                    }
                    AuthResult::Unauthenticated => (),
                }
            }
        }

        if !options.is_initialized() && !commands::PRE_INIT.contains(&method.as_str()) {
            return Err(Error::new(ErrorCode::InvalidRequest, "Server not initialized"));
        }

        let Some(handler) = self.handlers.get(&method) else {
            return Err(ErrorCode::MethodNotFound.into());
        };

        let ctx = MwContext::new(req, user, workspace, Arc::new(auth_request));

        let handler = handler.clone();
        let terminal_options = options.clone();
        let terminal: Next = Arc::new(move |ctx: MwContext| {
            let handler = handler.clone();
            let options = terminal_options.clone();
            Box::pin(async move {
                let (msg, user, workspace) = ctx.into_parts();
                let Message::Request(req) = msg else {
                    return Err(Error::new(ErrorCode::InternalError, "Invalid middleware message"));
                };
                let context = Context::new(&req, user, workspace, options);
                handler.call(HandlerParams::Request(context, req)).await
            })
        });

        let chain = options
            .middlewares()
            .compose(hook_for(&method), terminal);
        chain(ctx).await
    }

    async fn handle_notification(&self, notification: Notification) {
        match notification.method.as_str() {
            notifications::INITIALIZED | commands::INITIALIZED => (),
            notifications::CANCELLED => tracing::debug!(
                logger = "faro",
                "Request cancelled: {:?}", notification.params),
            notifications::PROGRESS => tracing::debug!(
                logger = "faro",
                "Progress: {:?}", notification.params),
            method => tracing::trace!(
                logger = "faro",
                "Unhandled notification: {method}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use super::*;
    use crate::auth::{AuthProvider, AuthenticatedUser};
    use crate::types::{Json, RequestId, ToolParam};

    struct StaticAuth {
        user: Option<AuthenticatedUser>,
    }

    #[async_trait]
    impl AuthProvider for StaticAuth {
        async fn authenticate(&self, request: &AuthRequest) -> AuthResult {
            match (&self.user, request.token()) {
                (Some(user), Some(_)) => AuthResult::Success {
                    user: user.clone(),
                    workspace: None,
                },
                (Some(_), None) => AuthResult::Unauthenticated,
                (None, Some(_)) => AuthResult::Failed("Invalid token".into()),
                (None, None) => AuthResult::Unauthenticated,
            }
        }
    }

    fn echo_app() -> App {
        let mut app = App::new().with_options(|opt| opt
            .with_name("Test")
            .with_version("1.0.0"));
        app.map_tool("echo", |text: String| async move { text })
            .with_params([ToolParam::string("text")]);
        app
    }

    async fn send(runtime: &ServerRuntime, json: &str) -> Response {
        send_with(runtime, json, AuthRequest::new()).await
    }

    async fn send_with(runtime: &ServerRuntime, json: &str, auth: AuthRequest) -> Response {
        let msg = Message::parse(json.as_bytes()).unwrap();
        runtime.handle(msg, auth).await.unwrap()
    }

    async fn init(runtime: &ServerRuntime) {
        let resp = send(runtime, r#"{"jsonrpc":"2.0","id":"init","method":"initialize","params":{}}"#).await;
        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn it_performs_the_initialize_handshake() {
        let runtime = echo_app().into_test_runtime();

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#).await;

        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"Test","version":"1.0.0"}}}"#);
    }

    #[tokio::test]
    async fn it_calls_a_registered_tool() {
        let runtime = echo_app().into_test_runtime();
        init(&runtime).await;

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"echo","arguments":{"text":"hi"}}}"#).await;

        assert_eq!(resp.result.unwrap(), json!({ "content": [{ "type": "text", "text": "hi" }] }));
    }

    #[tokio::test]
    async fn it_reads_through_a_resource_template() {
        let mut app = App::new();
        app.map_resource_template("users://{id}", "user", |id: i64| async move {
            Json(json!({ "id": id, "name": format!("User {id}") }))
        });
        let runtime = app.into_test_runtime();
        init(&runtime).await;

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":3,"method":"resources/read","params":{"uri":"users://42"}}"#).await;

        let result = resp.result.unwrap();
        let text = result["contents"][0]["text"].as_str().unwrap();
        let parsed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(parsed, json!({ "id": 42, "name": "User 42" }));
        assert_eq!(result["contents"][0]["uri"], "users://42");
    }

    #[tokio::test]
    async fn it_filters_discovery_and_refuses_calls_consistently() {
        let mut app = echo_app().with_options(|opt| opt
            .with_auth(StaticAuth {
                user: Some(AuthenticatedUser::new("u1").with_level(100)),
            }));
        app.map_tool("admin_tool", || async { "secret" })
            .with_predicate(|ctx| ctx.user.has_level(50));
        let runtime = app.into_test_runtime();
        init(&runtime).await;

        let auth = AuthRequest::new().with_header("x-api-token", "token");
        let resp = send_with(&runtime, r#"{"jsonrpc":"2.0","id":4,"method":"tools/list","params":{}}"#, auth.clone()).await;

        let tools = resp.result.unwrap();
        let names: Vec<&str> = tools["tools"]
            .as_array().unwrap()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["echo"]);

        let resp = send_with(&runtime, r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"admin_tool"}}"#, auth).await;

        let error = resp.error.unwrap();
        assert_eq!(error.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn it_denies_out_of_scope_tool_calls() {
        let mut app = echo_app().with_options(|opt| opt
            .with_auth(StaticAuth {
                user: Some(AuthenticatedUser::new("u1").with_scopes(["tools:echo"])),
            }));
        app.map_tool("special_tool", || async { "special" });
        let runtime = app.into_test_runtime();
        init(&runtime).await;

        let auth = AuthRequest::new().with_header("x-api-token", "token");
        let resp = send_with(&runtime, r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"special_tool"}}"#, auth.clone()).await;
        assert_eq!(resp.error.unwrap().code, ErrorCode::Forbidden);

        let resp = send_with(&runtime, r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"echo","arguments":{"text":"hi"}}}"#, auth).await;
        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn it_encodes_parse_failures_with_a_null_id() {
        let err = Message::parse(b"not json").unwrap_err();
        let resp = Response::error(RequestId::Null, err);

        let json = serde_json::to_string(&resp).unwrap();

        assert!(json.starts_with(r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"Parse error"#));
    }

    #[tokio::test]
    async fn it_gates_non_whitelisted_methods_before_initialization() {
        let runtime = echo_app().into_test_runtime();

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"echo","arguments":{"text":"hi"}}}"#).await;

        let error = resp.error.unwrap();
        assert_eq!(error.code, ErrorCode::InvalidRequest);
        assert_eq!(error.message, "Server not initialized");
    }

    #[tokio::test]
    async fn it_allows_discovery_before_initialization() {
        let runtime = echo_app().into_test_runtime();

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}}"#).await;

        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn it_fails_unknown_methods() {
        let runtime = echo_app().into_test_runtime();
        init(&runtime).await;

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":1,"method":"does/not/exist","params":{}}"#).await;

        assert_eq!(resp.error.unwrap().code, ErrorCode::MethodNotFound);
    }

    #[tokio::test]
    async fn it_responds_to_ping() {
        let runtime = echo_app().into_test_runtime();

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":1,"method":"ping","params":{}}"#).await;

        assert_eq!(resp.result.unwrap(), json!({ "pong": true }));
    }

    #[tokio::test]
    async fn it_accepts_initialized_as_request_and_notification() {
        let runtime = echo_app().into_test_runtime();

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":1,"method":"initialized","params":{}}"#).await;
        assert_eq!(resp.result.unwrap(), json!({}));

        let msg = Message::parse(br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(runtime.handle(msg, AuthRequest::new()).await.is_none());
    }

    #[tokio::test]
    async fn it_rejects_unauthenticated_requests_when_auth_is_required() {
        let app = echo_app().with_options(|opt| opt
            .with_auth_required(StaticAuth {
                user: Some(AuthenticatedUser::new("u1")),
            }));
        let runtime = app.into_test_runtime();
        init(&runtime).await;

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}}"#).await;

        assert_eq!(resp.error.unwrap().code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn it_surfaces_authentication_failures() {
        let app = echo_app().with_options(|opt| opt
            .with_auth(StaticAuth { user: None }));
        let runtime = app.into_test_runtime();
        init(&runtime).await;

        let auth = AuthRequest::new().with_header("x-api-token", "bad");
        let resp = send_with(&runtime, r#"{"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}}"#, auth).await;

        let error = resp.error.unwrap();
        assert_eq!(error.code, ErrorCode::Unauthorized);
        assert_eq!(error.message, "Invalid token");
    }

    #[tokio::test]
    async fn it_keeps_public_methods_open_under_required_auth() {
        let app = echo_app().with_options(|opt| opt
            .with_auth_required(StaticAuth { user: None }));
        let runtime = app.into_test_runtime();

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":1,"method":"ping","params":{}}"#).await;

        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn it_hides_predicate_tools_from_anonymous_callers() {
        let mut app = echo_app();
        app.map_tool("admin_tool", || async { "secret" })
            .with_predicate(|ctx| ctx.user.has_level(50));
        let runtime = app.into_test_runtime();
        init(&runtime).await;

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}}"#).await;
        let tools = resp.result.unwrap();
        let names: Vec<&str> = tools["tools"]
            .as_array().unwrap()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["echo"]);

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"admin_tool"}}"#).await;
        assert_eq!(resp.error.unwrap().code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn it_reports_tool_failures_as_results_not_protocol_errors() {
        let mut app = echo_app();
        app.map_tool("fail", || async {
            Err::<String, _>(Error::new(ErrorCode::InternalError, "boom"))
        });
        let runtime = app.into_test_runtime();
        init(&runtime).await;

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"fail"}}"#).await;

        assert!(resp.error.is_none());
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "boom");
    }

    #[tokio::test]
    async fn it_fails_tool_calls_with_missing_name() {
        let runtime = echo_app().into_test_runtime();
        init(&runtime).await;

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{}}"#).await;

        assert_eq!(resp.error.unwrap().code, ErrorCode::InvalidParams);
    }

    #[tokio::test]
    async fn it_fails_reads_of_unknown_resources() {
        let runtime = echo_app().into_test_runtime();
        init(&runtime).await;

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":1,"method":"resources/read","params":{"uri":"res://missing"}}"#).await;

        assert_eq!(resp.error.unwrap().code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn it_prefers_exact_resources_over_templates() {
        let mut app = App::new();
        app.map_resource_template("res://{name}", "by-name", |name: String| async move {
            format!("template {name}")
        });
        app.map_resource("res://fixed", "fixed", || async { "exact" });
        let runtime = app.into_test_runtime();
        init(&runtime).await;

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":1,"method":"resources/read","params":{"uri":"res://fixed"}}"#).await;

        let result = resp.result.unwrap();
        assert_eq!(result["contents"][0]["text"], "exact");
    }

    #[tokio::test]
    async fn it_serves_prompts() {
        let mut app = App::new();
        app.map_prompt("analyze", |lang: String| async move {
            (format!("Language: {lang}"), crate::types::Role::User)
        }).with_args([("lang", "The language to analyze")]);
        let runtime = app.into_test_runtime();
        init(&runtime).await;

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":1,"method":"prompts/get","params":{"name":"analyze","arguments":{"lang":"rust"}}}"#).await;

        let result = resp.result.unwrap();
        assert_eq!(result["messages"][0]["role"], "user");
        assert_eq!(result["messages"][0]["content"]["text"], "Language: rust");
    }

    #[tokio::test]
    async fn it_runs_middleware_around_the_terminal_handler() {
        struct Tagger;

        #[async_trait]
        impl Middleware for Tagger {
            async fn on_request(&self, ctx: MwContext, next: Next) -> Result<Response, Error> {
                let mut resp = next(ctx).await?;
                if let Some(result) = resp.result.as_mut().and_then(Value::as_object_mut) {
                    result.insert("tagged".into(), Value::Bool(true));
                }
                Ok(resp)
            }
        }

        let runtime = echo_app().wrap(Tagger).into_test_runtime();

        let resp = send(&runtime, r#"{"jsonrpc":"2.0","id":1,"method":"ping","params":{}}"#).await;

        assert_eq!(resp.result.unwrap(), json!({ "pong": true, "tagged": true }));
    }

    #[tokio::test]
    async fn it_lets_middleware_attach_users() {
        struct HeaderAuth;

        #[async_trait]
        impl Middleware for HeaderAuth {
            async fn on_request(&self, ctx: MwContext, next: Next) -> Result<Response, Error> {
                let ctx = match ctx.auth_request().header("x-user") {
                    Some(id) => {
                        let user = AuthenticatedUser::new(id).with_level(0);
                        ctx.with_user(user)
                    }
                    None => ctx,
                };
                next(ctx).await
            }
        }

        let mut app = App::new().wrap(HeaderAuth);
        app.map_tool("admin_tool", || async { "secret" })
            .with_predicate(|ctx| ctx.user.has_level(50));
        let runtime = app.into_test_runtime();
        init(&runtime).await;

        let auth = AuthRequest::new().with_header("x-user", "admin");
        let resp = send_with(&runtime, r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"admin_tool"}}"#, auth).await;

        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn it_ignores_cancellation_notifications() {
        let runtime = echo_app().into_test_runtime();

        let msg = Message::parse(br#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":1}}"#).unwrap();

        assert!(runtime.handle(msg, AuthRequest::new()).await.is_none());
    }
}
