//! Represents an MCP tool

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::error::{Error, ErrorCode};
use crate::auth::{authorize, AuthAction, AuthenticatedUser, AuthorizationContext, ComponentKind, Predicate};
use crate::app::handler::{Arguments, ArgsHandler, BoundHandler, FromArguments, FromHandlerParams, GenericHandler, HandlerParams};
use crate::types::{
    FromRequest, InputSchema, PropertyType, Request, ToolParam,
    schema::TypeCategory,
};

pub use call_tool_response::CallToolResponse;

pub mod call_tool_response;

/// List of commands for Tools
pub mod commands {
    /// Command name that returns a list of tools the server has.
    pub const LIST: &str = "tools/list";

    /// Command name that invokes a tool provided by the server.
    pub const CALL: &str = "tools/call";
}

/// Represents a tool that the server is capable of calling. Part of the [`ListToolsResult`].
///
/// See the [schema](https://github.com/modelcontextprotocol/specification/blob/main/schema/) for details
#[derive(Clone, Serialize)]
pub struct Tool {
    /// The name of the tool.
    pub name: String,

    /// A human-readable description of the tool.
    #[serde(rename = "description", skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,

    /// A JSON Schema object defining the expected parameters for the tool.
    ///
    /// > Note: Needs to be a valid JSON schema object that additionally is of a type object.
    #[serde(rename = "inputSchema")]
    pub input_schema: InputSchema,

    /// Advisory labels for the tool; never sent to clients.
    #[serde(skip)]
    pub tags: Vec<String>,

    /// Advisory execution timeout; not enforced by the framework.
    #[serde(skip)]
    pub timeout: Option<Duration>,

    /// The declared parameter list, in call-binding order
    #[serde(skip)]
    params: Vec<ToolParam>,

    /// A tool call handler
    #[serde(skip)]
    handler: Option<BoundHandler<CallToolResponse>>,

    /// An optional authorization predicate
    #[serde(skip)]
    predicate: Option<Predicate>,
}

/// Sent from the client to request a list of tools the server has.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListToolsRequestParams {
    /// Metadata related to the request.
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// A response to a request to list the tools available on the server.
#[derive(Debug, Default, Serialize)]
pub struct ListToolsResult {
    /// The server's response to a tools/list request from the client.
    pub tools: Vec<Tool>,
}

/// Used by the client to invoke a tool provided by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolRequestParams {
    /// Tool name.
    pub name: String,

    /// Optional arguments to pass to the tool.
    #[serde(rename = "arguments", skip_serializing_if = "Option::is_none")]
    pub args: Option<HashMap<String, Value>>,

    /// Metadata related to the request that provides additional protocol-level information.
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl crate::types::IntoResponse for ListToolsResult {
    #[inline]
    fn into_response(self, req_id: crate::types::RequestId) -> crate::types::Response {
        match serde_json::to_value(self) {
            Ok(v) => crate::types::Response::success(req_id, v),
            Err(err) => crate::types::Response::error(req_id, err.into()),
        }
    }
}

impl From<Vec<Tool>> for ListToolsResult {
    #[inline]
    fn from(tools: Vec<Tool>) -> Self {
        Self { tools }
    }
}

impl FromHandlerParams for CallToolRequestParams {
    #[inline]
    fn from_params(params: &HandlerParams) -> Result<Self, Error> {
        let req = Request::from_params(params)?;
        Self::from_request(req)
    }
}

impl FromHandlerParams for ListToolsRequestParams {
    #[inline]
    fn from_params(params: &HandlerParams) -> Result<Self, Error> {
        let req = Request::from_params(params)?;
        Self::from_request(req)
    }
}

/// Describes a generic MCP Tool handler
pub trait ToolHandler<Args>: GenericHandler<Args> {
    /// Returns the parameter skeleton derived from the handler's signature
    #[inline]
    fn params() -> Vec<ToolParam> {
        Vec::new()
    }
}

pub(crate) struct ToolFunc<F, R, Args>
where
    F: ToolHandler<Args, Output = R>,
    R: Into<CallToolResponse>,
    Args: FromArguments,
{
    func: F,
    _marker: std::marker::PhantomData<Args>,
}

impl<F, R, Args> ToolFunc<F, R, Args>
where
    F: ToolHandler<Args, Output = R>,
    R: Into<CallToolResponse>,
    Args: FromArguments,
{
    /// Creates a new [`ToolFunc`] wrapped into [`Arc`]
    pub(crate) fn new(func: F) -> Arc<Self> {
        let func = Self { func, _marker: std::marker::PhantomData };
        Arc::new(func)
    }
}

impl<F, R, Args> ArgsHandler<CallToolResponse> for ToolFunc<F, R, Args>
where
    F: ToolHandler<Args, Output = R>,
    R: Into<CallToolResponse> + Send + 'static,
    Args: FromArguments + Send + Sync,
{
    #[inline]
    fn call(&self, args: Arguments) -> BoxFuture<'_, Result<CallToolResponse, Error>> {
        Box::pin(async move {
            let args = Args::from_args(args)?;
            Ok(self.func
                .call(args)
                .await
                .into())
        })
    }
}

impl Debug for Tool {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("descr", &self.descr)
            .field("input_schema", &self.input_schema)
            .field("tags", &self.tags)
            .finish()
    }
}

impl Tool {
    /// Initializes a new [`Tool`]
    pub fn new<F, Args, R>(name: &str, handler: F) -> Self
    where
        F: ToolHandler<Args, Output = R>,
        R: Into<CallToolResponse> + Send + 'static,
        Args: FromArguments + Send + Sync + 'static,
    {
        let handler = ToolFunc::new(handler);
        let params = F::params();
        Self {
            name: name.into(),
            descr: None,
            input_schema: InputSchema::from_params(&params),
            tags: Vec::new(),
            timeout: None,
            params,
            handler: Some(handler),
            predicate: None,
        }
    }

    /// Sets a description for a tool
    pub fn with_description(&mut self, description: &str) -> &mut Self {
        self.descr = Some(description.into());
        self
    }

    /// Declares the tool's parameter list and regenerates its input schema.
    ///
    /// Parameters bind positionally to the handler's non-context arguments,
    /// in declaration order.
    pub fn with_params<T>(&mut self, params: T) -> &mut Self
    where
        T: IntoIterator<Item = ToolParam>,
    {
        self.params = params.into_iter().collect();
        self.input_schema = InputSchema::from_params(&self.params);
        self
    }

    /// Sets advisory tags
    pub fn with_tags<T, I>(&mut self, tags: T) -> &mut Self
    where
        T: IntoIterator<Item = I>,
        I: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets an advisory execution timeout
    pub fn with_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    /// Registers an authorization predicate that gates both discovery
    /// and invocation of this tool
    pub fn with_predicate<P>(&mut self, predicate: P) -> &mut Self
    where
        P: Fn(&AuthorizationContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Returns `true` when the tool may be shown to the caller
    pub(crate) fn is_visible(
        &self,
        user: Option<&AuthenticatedUser>,
        workspace: Option<&str>,
    ) -> bool {
        authorize::is_allowed(
            self.predicate.as_ref(),
            user,
            ComponentKind::Tool,
            &self.name,
            AuthAction::Call,
            None,
            workspace)
    }

    /// Applies the predicate and scope gates for an invocation.
    ///
    /// The two gates are independent: the predicate runs first when present,
    /// then the scope gate runs when the user carries any scopes at all.
    pub(crate) fn authorize(
        &self,
        user: Option<&AuthenticatedUser>,
        workspace: Option<&str>,
        arguments: Option<&HashMap<String, Value>>,
    ) -> Result<(), Error> {
        let allowed = authorize::is_allowed(
            self.predicate.as_ref(),
            user,
            ComponentKind::Tool,
            &self.name,
            AuthAction::Call,
            arguments,
            workspace);
        if !allowed {
            return Err(Error::new(
                ErrorCode::Forbidden,
                format!("Access to tool '{}' denied", self.name)));
        }
        if let Some(user) = user {
            if !user.scopes.is_empty() && !user.has_scope(&format!("tools:{}", self.name)) {
                return Err(Error::new(
                    ErrorCode::Forbidden,
                    format!("Missing scope for tool '{}'", self.name)));
            }
        }
        Ok(())
    }

    /// Binds the call arguments to the declared parameter list.
    ///
    /// Each declared parameter takes, in order: the matching argument value
    /// (string-sourced values coerced to the declared numeric or boolean
    /// type), its default, `null` when nullable, or fails as missing.
    pub(crate) fn bind(&self, args: Option<&HashMap<String, Value>>) -> Result<Vec<Value>, Error> {
        let empty = HashMap::new();
        let args = args.unwrap_or(&empty);
        self.params
            .iter()
            .map(|param| match args.get(&param.name) {
                Some(value) => param.coerce(value.clone()),
                None => match &param.default {
                    Some(default) => Ok(default.clone()),
                    None if param.nullable => Ok(Value::Null),
                    None if !param.required => Ok(Value::Null),
                    None => Err(Error::new(
                        ErrorCode::InvalidParams,
                        format!("Missing required argument: {}", param.name))
                        .with_data(serde_json::json!({ "argument": param.name }))),
                },
            })
            .collect()
    }

    /// Invoke a tool with already-bound argument values
    #[inline]
    pub(crate) async fn call(&self, args: Arguments) -> Result<CallToolResponse, Error> {
        match self.handler {
            Some(ref handler) => handler.call(args).await,
            None => Err(Error::new(ErrorCode::InternalError, "Tool handler not specified"))
        }
    }
}

macro_rules! impl_generic_tool_handler ({ $($param:ident)* } => {
    impl<Func, Fut: Send, $($param: TypeCategory,)*> ToolHandler<($($param,)*)> for Func
    where
        Func: Fn($($param),*) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future + 'static,
    {
        #[inline]
        #[allow(unused_mut)]
        fn params() -> Vec<ToolParam> {
            let mut params = Vec::new();
            $(
            {
                let category = <$param as TypeCategory>::category();
                if category != PropertyType::None {
                    params.push(ToolParam::of(format!("arg{}", params.len()), category));
                }
            }
            )*
            params
        }
    }
});

impl_generic_tool_handler! {}
impl_generic_tool_handler! { T1 }
impl_generic_tool_handler! { T1 T2 }
impl_generic_tool_handler! { T1 T2 T3 }
impl_generic_tool_handler! { T1 T2 T3 T4 }
impl_generic_tool_handler! { T1 T2 T3 T4 T5 }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::context::Context;

    fn call_params(args: &[(&str, Value)]) -> Option<HashMap<String, Value>> {
        Some(args
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect())
    }

    #[tokio::test]
    async fn it_creates_and_calls_tool() {
        let mut tool = Tool::new("sum", |a: i64, b: i64| async move { (a + b).to_string() });
        tool.with_params([ToolParam::integer("a"), ToolParam::integer("b")]);

        let args = call_params(&[("a", Value::from(5)), ("b", Value::from(2))]);
        let values = tool.bind(args.as_ref()).unwrap();
        let resp = tool.call(Arguments::new(values, Context::test())).await.unwrap();

        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"content":[{"type":"text","text":"7"}]}"#);
    }

    #[tokio::test]
    async fn it_coerces_string_sourced_arguments() {
        let mut tool = Tool::new("double", |n: i64| async move { (n * 2).to_string() });
        tool.with_params([ToolParam::integer("n")]);

        let args = call_params(&[("n", Value::from("21"))]);
        let values = tool.bind(args.as_ref()).unwrap();
        let resp = tool.call(Arguments::new(values, Context::test())).await.unwrap();

        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"content":[{"type":"text","text":"42"}]}"#);
    }

    #[test]
    fn it_binds_defaults_for_absent_arguments() {
        let mut tool = Tool::new("greet", |name: String| async move { name });
        tool.with_params([ToolParam::string("name").with_default("world")]);

        let values = tool.bind(None).unwrap();

        assert_eq!(values, vec![Value::from("world")]);
    }

    #[test]
    fn it_binds_null_for_absent_nullable_arguments() {
        let mut tool = Tool::new("find", |q: Option<String>| async move { q.unwrap_or_default() });
        tool.with_params([ToolParam::string("q").nullable()]);

        let values = tool.bind(None).unwrap();

        assert_eq!(values, vec![Value::Null]);
    }

    #[test]
    fn it_fails_on_missing_required_argument() {
        let mut tool = Tool::new("echo", |text: String| async move { text });
        tool.with_params([ToolParam::string("text")]);

        let err = tool.bind(None).unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidParams);
        assert_eq!(err.message(), "Missing required argument: text");
        assert_eq!(err.data().unwrap()["argument"], "text");
    }

    #[tokio::test]
    async fn it_turns_handler_errors_into_tool_level_errors() {
        let tool = Tool::new("fail", || async {
            Err::<String, _>(Error::new(ErrorCode::InternalError, "boom"))
        });

        let resp = tool.call(Arguments::new(Vec::new(), Context::test())).await.unwrap();

        assert!(resp.is_error);
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"content":[{"type":"text","text":"boom"}],"isError":true}"#);
    }

    #[test]
    fn it_derives_schema_from_declared_params() {
        let mut tool = Tool::new("echo", |text: String| async move { text });
        tool.with_params([ToolParam::string("text")]);

        let json = serde_json::to_value(&tool).unwrap();

        assert_eq!(json["inputSchema"]["properties"]["text"]["type"], "string");
        assert_eq!(json["inputSchema"]["required"][0], "text");
    }

    #[test]
    fn it_omits_the_context_parameter_from_the_schema() {
        let tool = Tool::new("ctx_tool", |_ctx: Context, text: String| async move { text });

        assert_eq!(tool.params.len(), 1);
    }

    #[test]
    fn it_denies_predicate_tools_without_a_user() {
        let mut tool = Tool::new("admin", || async { "ok" });
        tool.with_predicate(|ctx| ctx.user.has_level(50));

        assert!(!tool.is_visible(None, None));
        assert!(tool.authorize(None, None, None).is_err());
    }

    #[test]
    fn it_applies_the_scope_gate_only_when_scopes_are_present() {
        let tool = Tool::new("special_tool", || async { "ok" });

        let scoped = AuthenticatedUser::new("u1").with_scopes(["tools:echo"]);
        let err = tool.authorize(Some(&scoped), None, None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let unscoped = AuthenticatedUser::new("u2");
        assert!(tool.authorize(Some(&unscoped), None, None).is_ok());
    }
}
