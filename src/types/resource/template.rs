//! Utilities for resource templates and URI template matching

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::sync::Arc;
use futures_util::future::BoxFuture;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use crate::error::Error;
use crate::auth::{authorize, AuthAction, AuthenticatedUser, AuthorizationContext, ComponentKind, Predicate};
use crate::app::handler::{Arguments, ArgsHandler, BoundHandler, FromArguments, GenericHandler};
use crate::types::{
    resource::Uri, PropertyType, ReadResourceResult, ToolParam,
    schema::TypeCategory,
};

/// A compiled `scheme://host/segment/{var}/…` pattern.
///
/// `{var}` captures a single path segment, `{var*}` captures the rest of the
/// path. Template query parameters of the form `?name={var}` contribute
/// optional bindings. Captured values are URL-decoded.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    path: String,
    regex: Regex,
    path_vars: Vec<String>,
    query_vars: Vec<(String, String)>,
    vars: Vec<String>,
}

impl UriTemplate {
    /// Compiles a URI template
    pub fn new(template: &str) -> Self {
        let (path, query) = match template.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (template, None),
        };
        let (pattern, path_vars) = Self::compile(path);
        let regex = Regex::new(&pattern)
            .expect("UriTemplate: Incorrect URI template provided");
        let query_vars = query
            .map(Self::query_vars)
            .unwrap_or_default();
        let vars = path_vars
            .iter()
            .cloned()
            .chain(query_vars.iter().map(|(_, var)| var.clone()))
            .collect();
        Self {
            path: path.to_owned(),
            regex,
            path_vars,
            query_vars,
            vars,
        }
    }

    /// Returns `true` if the string contains a `{…}` placeholder
    pub fn is_template(value: &str) -> bool {
        value
            .find('{')
            .zip(value.rfind('}'))
            .is_some_and(|(open, close)| open < close)
    }

    /// Matches a concrete URI against this template.
    ///
    /// On success returns the captured variables, URL-decoded.
    pub fn matches(&self, uri: &str) -> Option<HashMap<String, String>> {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (uri, None),
        };
        let captures = self.regex.captures(path)?;
        let mut params = HashMap::new();
        for (index, name) in self.path_vars.iter().enumerate() {
            let raw = captures.get(index + 1)?.as_str();
            let value = urlencoding::decode(raw).ok()?;
            params.insert(name.clone(), value.into_owned());
        }
        if !self.query_vars.is_empty() {
            let pairs: HashMap<&str, &str> = query
                .unwrap_or_default()
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .collect();
            for (param, var) in &self.query_vars {
                if let Some(raw) = pairs.get(param.as_str()) {
                    let value = urlencoding::decode(raw).ok()?;
                    params.insert(var.clone(), value.into_owned());
                }
            }
        }
        Some(params)
    }

    /// Expands this template with the given parameters.
    ///
    /// Substitutions are URL-encoded; missing parameters substitute empty.
    pub fn expand(&self, params: &HashMap<String, String>) -> String {
        let encode = |name: &str| {
            let value = params
                .get(name)
                .map(String::as_str)
                .unwrap_or_default();
            urlencoding::encode(value).into_owned()
        };
        let mut uri = String::new();
        let mut rest = self.path.as_str();
        loop {
            let Some(open) = rest.find('{') else {
                uri.push_str(rest);
                break;
            };
            uri.push_str(&rest[..open]);
            let tail = &rest[open..];
            let Some(close) = tail.find('}') else {
                uri.push_str(tail);
                break;
            };
            let var = tail[1..close].trim_end_matches('*');
            uri.push_str(&encode(var));
            rest = &tail[close + 1..];
        }
        for (index, (param, var)) in self.query_vars.iter().enumerate() {
            uri.push(if index == 0 { '?' } else { '&' });
            uri.push_str(param);
            uri.push('=');
            uri.push_str(&encode(var));
        }
        uri
    }

    /// Returns the template's variable names in binding order:
    /// path variables first, then query variables
    pub(crate) fn vars(&self) -> &[String] {
        &self.vars
    }

    fn compile(path: &str) -> (String, Vec<String>) {
        let mut pattern = String::from("^");
        let mut vars = Vec::new();
        let mut rest = path;
        loop {
            let Some(open) = rest.find('{') else {
                pattern.push_str(&regex::escape(rest));
                break;
            };
            pattern.push_str(&regex::escape(&rest[..open]));
            let tail = &rest[open..];
            let Some(close) = tail.find('}') else {
                pattern.push_str(&regex::escape(tail));
                break;
            };
            let var = &tail[1..close];
            match var.strip_suffix('*') {
                Some(name) => {
                    vars.push(name.to_owned());
                    pattern.push_str("(.+)");
                }
                None => {
                    vars.push(var.to_owned());
                    pattern.push_str("([^/]+)");
                }
            }
            rest = &tail[close + 1..];
        }
        pattern.push('$');
        (pattern, vars)
    }

    fn query_vars(query: &str) -> Vec<(String, String)> {
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .filter_map(|(param, value)| {
                let var = value.strip_prefix('{')?.strip_suffix('}')?;
                Some((param.to_owned(), var.trim_end_matches('*').to_owned()))
            })
            .collect()
    }
}

/// Represents a known resource template that the server is capable of reading.
///
/// Templates are consulted in registration order, and only when no exact
/// resource matches the requested URI.
#[derive(Clone, Serialize)]
pub struct ResourceTemplate {
    /// The URI template of this resource.
    #[serde(rename = "uriTemplate")]
    pub uri_template: Uri,

    /// A human-readable name for this resource template.
    pub name: String,

    /// A description of what this resource template represents.
    #[serde(rename = "description", skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,

    /// The MIME type of this resource template, if known.
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,

    #[serde(skip)]
    template: UriTemplate,

    #[serde(skip)]
    params: Vec<ToolParam>,

    #[serde(skip)]
    handler: Option<BoundHandler<ReadResourceResult>>,

    #[serde(skip)]
    predicate: Option<Predicate>,
}

/// Describes a generic resource read handler
pub trait ResourceHandler<Args>: GenericHandler<Args> {
    /// Returns the parameter skeleton derived from the handler's signature
    #[inline]
    fn params() -> Vec<ToolParam> {
        Vec::new()
    }
}

/// Represents a function that reads a resource
pub(crate) struct ResourceFunc<F, R, Args>
where
    F: ResourceHandler<Args, Output = R>,
    R: TryInto<ReadResourceResult>,
    Args: FromArguments,
{
    func: F,
    _marker: std::marker::PhantomData<Args>,
}

impl<F, R, Args> ResourceFunc<F, R, Args>
where
    F: ResourceHandler<Args, Output = R>,
    R: TryInto<ReadResourceResult>,
    Args: FromArguments,
{
    /// Creates a new [`ResourceFunc`] wrapped into [`Arc`]
    pub(crate) fn new(func: F) -> Arc<Self> {
        let func = Self { func, _marker: std::marker::PhantomData };
        Arc::new(func)
    }
}

impl<F, R, Args> ArgsHandler<ReadResourceResult> for ResourceFunc<F, R, Args>
where
    F: ResourceHandler<Args, Output = R>,
    R: TryInto<ReadResourceResult>,
    R::Error: Into<Error>,
    Args: FromArguments + Send + Sync,
{
    #[inline]
    fn call(&self, args: Arguments) -> BoxFuture<'_, Result<ReadResourceResult, Error>> {
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

impl Debug for ResourceTemplate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceTemplate")
            .field("uri_template", &self.uri_template)
            .field("name", &self.name)
            .field("descr", &self.descr)
            .field("mime", &self.mime)
            .finish()
    }
}

impl ResourceTemplate {
    /// Creates a new [`ResourceTemplate`]
    pub fn new<F, R, Args>(uri_template: &str, name: &str, handler: F) -> Self
    where
        F: ResourceHandler<Args, Output = R>,
        R: TryInto<ReadResourceResult> + Send + 'static,
        R::Error: Into<Error>,
        Args: FromArguments + Send + Sync + 'static,
    {
        Self {
            uri_template: uri_template.into(),
            name: name.into(),
            descr: None,
            mime: None,
            template: UriTemplate::new(uri_template),
            params: F::params(),
            handler: Some(ResourceFunc::new(handler)),
            predicate: None,
        }
    }

    /// Sets a description for a resource template
    pub fn with_description(&mut self, description: &str) -> &mut Self {
        self.descr = Some(description.into());
        self
    }

    /// Sets a MIME type for all matching resources
    pub fn with_mime(&mut self, mime: &str) -> &mut Self {
        self.mime = Some(mime.into());
        self
    }

    /// Declares the template's parameter list; parameters bind positionally
    /// to the template's variables, in order of appearance
    pub fn with_params<T>(&mut self, params: T) -> &mut Self
    where
        T: IntoIterator<Item = ToolParam>,
    {
        self.params = params.into_iter().collect();
        self
    }

    /// Registers an authorization predicate that gates both discovery
    /// and reads of this template
    pub fn with_predicate<P>(&mut self, predicate: P) -> &mut Self
    where
        P: Fn(&AuthorizationContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Matches a concrete URI against this template
    pub(crate) fn matches(&self, uri: &str) -> Option<HashMap<String, String>> {
        self.template.matches(uri)
    }

    /// Returns `true` when the template may be shown to the caller
    pub(crate) fn is_visible(
        &self,
        user: Option<&AuthenticatedUser>,
        workspace: Option<&str>,
    ) -> bool {
        authorize::is_allowed(
            self.predicate.as_ref(),
            user,
            ComponentKind::Resource,
            &self.uri_template,
            AuthAction::Read,
            None,
            workspace)
    }

    /// Applies the predicate gate for a read, keyed by the URI template
    pub(crate) fn authorize(
        &self,
        user: Option<&AuthenticatedUser>,
        workspace: Option<&str>,
    ) -> Result<(), Error> {
        if self.is_visible(user, workspace) {
            Ok(())
        } else {
            Err(Error::new(
                crate::error::ErrorCode::Forbidden,
                format!("Access to resource '{}' denied", self.uri_template)))
        }
    }

    /// Binds matched template variables to the declared parameter list,
    /// coercing each value to the declared type
    pub(crate) fn bind(&self, vars: &HashMap<String, String>) -> Result<Vec<Value>, Error> {
        self.template
            .vars()
            .iter()
            .enumerate()
            .map(|(index, name)| match vars.get(name) {
                Some(raw) => match self.params.get(index) {
                    Some(param) => param.coerce(Value::String(raw.clone())),
                    None => Ok(Value::String(raw.clone())),
                },
                None => Ok(Value::Null),
            })
            .collect()
    }

    /// Reads the resource with already-bound template variables
    pub(crate) async fn call(&self, args: Arguments) -> Result<ReadResourceResult, Error> {
        match self.handler {
            Some(ref handler) => handler.call(args).await,
            None => Err(Error::new(
                crate::error::ErrorCode::InternalError,
                "Resource handler not specified"))
        }
    }
}

macro_rules! impl_generic_resource_handler ({ $($param:ident)* } => {
    impl<Func, Fut: Send, $($param: TypeCategory,)*> ResourceHandler<($($param,)*)> for Func
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

impl_generic_resource_handler! {}
impl_generic_resource_handler! { T1 }
impl_generic_resource_handler! { T1 T2 }
impl_generic_resource_handler! { T1 T2 T3 }
impl_generic_resource_handler! { T1 T2 T3 T4 }
impl_generic_resource_handler! { T1 T2 T3 T4 T5 }
