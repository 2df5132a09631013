//! Represents an MCP prompt

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::sync::Arc;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::error::{Error, ErrorCode};
use crate::auth::{authorize, AuthAction, AuthenticatedUser, AuthorizationContext, ComponentKind, Predicate};
use crate::app::handler::{Arguments, ArgsHandler, BoundHandler, FromArguments, FromHandlerParams, GenericHandler, HandlerParams};
use crate::types::{
    FromRequest, PropertyType, Request,
    schema::TypeCategory,
};

pub use get_prompt_result::{GetPromptResult, PromptMessage};

pub mod get_prompt_result;

/// List of commands for Prompts
pub mod commands {
    /// Command name that returns a list of prompts the server has.
    pub const LIST: &str = "prompts/list";

    /// Command name that returns a prompt provided by the server.
    pub const GET: &str = "prompts/get";
}

/// A prompt or prompt template that the server offers.
///
/// See the [schema](https://github.com/modelcontextprotocol/specification/blob/main/schema/) for details
#[derive(Clone, Serialize)]
pub struct Prompt {
    /// The name of the prompt or prompt template.
    pub name: String,

    /// An optional description of what this prompt provides
    #[serde(rename = "description", skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,

    /// A list of arguments to use for templating the prompt.
    #[serde(rename = "arguments", skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<PromptArgument>>,

    /// A get prompt handler
    #[serde(skip)]
    handler: Option<BoundHandler<GetPromptResult>>,

    /// An optional authorization predicate
    #[serde(skip)]
    predicate: Option<Predicate>,
}

/// Describes an argument that a prompt can accept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    /// The name of the argument.
    pub name: String,

    /// A human-readable description of the argument.
    #[serde(rename = "description", skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,

    /// Whether this argument must be provided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

/// Sent from the client to request a list of prompts and prompt templates the server has.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListPromptsRequestParams {
    /// Metadata related to the request.
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// Used by the client to get a prompt provided by the server.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetPromptRequestParams {
    /// The name of the prompt or prompt template.
    pub name: String,

    /// Arguments to use for templating the prompt.
    #[serde(rename = "arguments", skip_serializing_if = "Option::is_none")]
    pub args: Option<HashMap<String, Value>>,

    /// Metadata related to the request.
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// The server's response to a prompts/list request from the client.
#[derive(Debug, Default, Serialize)]
pub struct ListPromptsResult {
    /// A list of prompts or prompt templates that the server offers.
    pub prompts: Vec<Prompt>,
}

impl crate::types::IntoResponse for ListPromptsResult {
    #[inline]
    fn into_response(self, req_id: crate::types::RequestId) -> crate::types::Response {
        match serde_json::to_value(self) {
            Ok(v) => crate::types::Response::success(req_id, v),
            Err(err) => crate::types::Response::error(req_id, err.into()),
        }
    }
}

impl From<Vec<Prompt>> for ListPromptsResult {
    #[inline]
    fn from(prompts: Vec<Prompt>) -> Self {
        Self { prompts }
    }
}

impl FromHandlerParams for ListPromptsRequestParams {
    #[inline]
    fn from_params(params: &HandlerParams) -> Result<Self, Error> {
        let req = Request::from_params(params)?;
        Self::from_request(req)
    }
}

impl FromHandlerParams for GetPromptRequestParams {
    #[inline]
    fn from_params(params: &HandlerParams) -> Result<Self, Error> {
        let req = Request::from_params(params)?;
        Self::from_request(req)
    }
}

impl From<&str> for PromptArgument {
    #[inline]
    fn from(name: &str) -> Self {
        Self {
            name: name.into(),
            descr: None,
            required: Some(true)
        }
    }
}

impl From<String> for PromptArgument {
    #[inline]
    fn from(name: String) -> Self {
        Self {
            name,
            descr: None,
            required: Some(true),
        }
    }
}

impl<T: Into<String>> From<(T, T)> for PromptArgument {
    #[inline]
    fn from((name, description): (T, T)) -> Self {
        Self::required(name, description)
    }
}

impl<T: Into<String>> From<(T, T, bool)> for PromptArgument {
    #[inline]
    fn from((name, description, required): (T, T, bool)) -> Self {
        Self {
            name: name.into(),
            descr: Some(description.into()),
            required: Some(required),
        }
    }
}

impl PromptArgument {
    /// Creates a new required [`PromptArgument`]
    pub fn required<T: Into<String>>(name: T, descr: T) -> Self {
        Self {
            name: name.into(),
            descr: Some(descr.into()),
            required: Some(true),
        }
    }

    /// Creates a new optional [`PromptArgument`]
    pub fn optional<T: Into<String>>(name: T, descr: T) -> Self {
        Self {
            name: name.into(),
            descr: Some(descr.into()),
            required: Some(false),
        }
    }
}

/// Describes a generic get prompt handler
pub trait PromptHandler<Args>: GenericHandler<Args> {
    /// Returns a prompt arguments skeleton derived from the handler's signature
    #[inline]
    fn args() -> Vec<PromptArgument> {
        Vec::new()
    }
}

pub(crate) struct PromptFunc<F, R, Args>
where
    F: PromptHandler<Args, Output = R>,
    R: TryInto<GetPromptResult>,
    R::Error: Into<Error>,
    Args: FromArguments,
{
    func: F,
    _marker: std::marker::PhantomData<Args>,
}

impl<F, R, Args> PromptFunc<F, R, Args>
where
    F: PromptHandler<Args, Output = R>,
    R: TryInto<GetPromptResult>,
    R::Error: Into<Error>,
    Args: FromArguments,
{
    /// Creates a new [`PromptFunc`] wrapped into [`Arc`]
    pub(crate) fn new(func: F) -> Arc<Self> {
        let func = Self { func, _marker: std::marker::PhantomData };
        Arc::new(func)
    }
}

impl<F, R, Args> ArgsHandler<GetPromptResult> for PromptFunc<F, R, Args>
where
    F: PromptHandler<Args, Output = R>,
    R: TryInto<GetPromptResult>,
    R::Error: Into<Error>,
    Args: FromArguments + Send + Sync,
{
    #[inline]
    fn call(&self, args: Arguments) -> BoxFuture<'_, Result<GetPromptResult, Error>> {
        Box::pin(async move {
            let args = Args::from_args(args)?;
            self.func
                .call(args)
                .await
                .try_into()
                .map_err(Into::into)
        })
    }
}

impl Debug for Prompt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prompt")
            .field("name", &self.name)
            .field("descr", &self.descr)
            .field("args", &self.args)
            .finish()
    }
}

impl Prompt {
    /// Creates a new [`Prompt`]
    #[inline]
    pub fn new<F, R, Args>(name: impl Into<String>, handler: F) -> Self
    where
        F: PromptHandler<Args, Output = R>,
        R: TryInto<GetPromptResult> + Send + 'static,
        R::Error: Into<Error>,
        Args: FromArguments + Send + Sync + 'static,
    {
        let handler = PromptFunc::new(handler);
        let args = F::args();
        Self {
            name: name.into(),
            descr: None,
            args: if args.is_empty() { None } else { Some(args) },
            handler: Some(handler),
            predicate: None,
        }
    }

    /// Sets a [`Prompt`] description
    pub fn with_description(&mut self, descr: impl Into<String>) -> &mut Self {
        self.descr = Some(descr.into());
        self
    }

    /// Sets arguments for the [`Prompt`].
    ///
    /// Arguments bind positionally to the handler's non-context parameters,
    /// in declaration order.
    pub fn with_args<T, A>(&mut self, args: T) -> &mut Self
    where
        T: IntoIterator<Item = A>,
        A: Into<PromptArgument>,
    {
        self.args = Some(args
            .into_iter()
            .map(Into::into)
            .collect());
        self
    }

    /// Registers an authorization predicate that gates both discovery
    /// and invocation of this prompt
    pub fn with_predicate<P>(&mut self, predicate: P) -> &mut Self
    where
        P: Fn(&AuthorizationContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Returns `true` when the prompt may be shown to the caller
    pub(crate) fn is_visible(
        &self,
        user: Option<&AuthenticatedUser>,
        workspace: Option<&str>,
    ) -> bool {
        authorize::is_allowed(
            self.predicate.as_ref(),
            user,
            ComponentKind::Prompt,
            &self.name,
            AuthAction::Get,
            None,
            workspace)
    }

    /// Applies the predicate gate for an invocation
    pub(crate) fn authorize(
        &self,
        user: Option<&AuthenticatedUser>,
        workspace: Option<&str>,
        arguments: Option<&HashMap<String, Value>>,
    ) -> Result<(), Error> {
        let allowed = authorize::is_allowed(
            self.predicate.as_ref(),
            user,
            ComponentKind::Prompt,
            &self.name,
            AuthAction::Get,
            arguments,
            workspace);
        if allowed {
            Ok(())
        } else {
            Err(Error::new(
                ErrorCode::Forbidden,
                format!("Access to prompt '{}' denied", self.name)))
        }
    }

    /// Binds the call arguments to the declared argument list, in order.
    ///
    /// A missing required argument fails; a missing optional one binds `null`.
    pub(crate) fn bind(&self, args: Option<&HashMap<String, Value>>) -> Result<Vec<Value>, Error> {
        let empty = HashMap::new();
        let args = args.unwrap_or(&empty);
        self.args
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|arg| match args.get(&arg.name) {
                Some(value) => Ok(value.clone()),
                None if arg.required == Some(true) => Err(Error::new(
                    ErrorCode::InvalidParams,
                    format!("Missing required argument: {}", arg.name))),
                None => Ok(Value::Null),
            })
            .collect()
    }

    /// Get prompt result
    #[inline]
    pub(crate) async fn call(&self, args: Arguments) -> Result<GetPromptResult, Error> {
        match self.handler {
            Some(ref handler) => handler.call(args).await,
            None => Err(Error::new(ErrorCode::InternalError, "Prompt handler not specified"))
        }
    }
}

macro_rules! impl_generic_prompt_handler ({ $($param:ident)* } => {
    impl<Func, Fut: Send, $($param: TypeCategory,)*> PromptHandler<($($param,)*)> for Func
    where
        Func: Fn($($param),*) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future + 'static,
    {
        #[inline]
        #[allow(unused_mut)]
        fn args() -> Vec<PromptArgument> {
            let mut args = Vec::new();
            $(
            {
                if <$param as TypeCategory>::category() != PropertyType::None {
                    args.push(PromptArgument::from(format!("arg{}", args.len())));
                }
            }
            )*
            args
        }
    }
});

impl_generic_prompt_handler! {}
impl_generic_prompt_handler! { T1 }
impl_generic_prompt_handler! { T1 T2 }
impl_generic_prompt_handler! { T1 T2 T3 }
impl_generic_prompt_handler! { T1 T2 T3 T4 }
impl_generic_prompt_handler! { T1 T2 T3 T4 T5 }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::context::Context;
    use crate::types::Role;

    #[tokio::test]
    async fn it_creates_and_calls_prompt() {
        let mut prompt = Prompt::new("analyze", |lang: String| async move {
            (format!("Language: {lang}"), Role::User)
        });
        prompt.with_args([("lang", "The language to analyze")]);

        let args = HashMap::from([("lang".to_owned(), Value::from("rust"))]);
        let values = prompt.bind(Some(&args)).unwrap();
        let result = prompt.call(Arguments::new(values, Context::test())).await.unwrap();

        let msg = result.messages.first().unwrap();
        assert_eq!(msg.role, Role::User);
    }

    #[test]
    fn it_fails_on_missing_required_argument() {
        let mut prompt = Prompt::new("analyze", |lang: String| async move { (lang, Role::User) });
        prompt.with_args([("lang", "The language to analyze")]);

        let err = prompt.bind(None).unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidParams);
    }

    #[test]
    fn it_binds_null_for_missing_optional_arguments() {
        let mut prompt = Prompt::new("analyze", |lang: Option<String>| async move {
            (lang.unwrap_or_default(), Role::User)
        });
        prompt.with_args([PromptArgument::optional("lang", "The language to analyze")]);

        let values = prompt.bind(None).unwrap();

        assert_eq!(values, vec![Value::Null]);
    }

    #[test]
    fn it_serializes_declared_arguments() {
        let mut prompt = Prompt::new("analyze", |lang: String| async move { (lang, Role::User) });
        prompt.with_args([PromptArgument::required("lang", "The language to analyze")]);

        let json = serde_json::to_value(&prompt).unwrap();

        assert_eq!(json["arguments"][0]["name"], "lang");
        assert_eq!(json["arguments"][0]["required"], true);
    }
}
