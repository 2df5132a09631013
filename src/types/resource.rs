//! Represents an MCP resource

use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::error::{Error, ErrorCode};
use crate::auth::{authorize, AuthAction, AuthenticatedUser, AuthorizationContext, ComponentKind, Predicate};
use crate::app::handler::{Arguments, BoundHandler, FromArguments, FromHandlerParams, HandlerParams};
use crate::types::{FromRequest, Request};

pub use uri::Uri;
pub use read_resource_result::{ReadResourceResult, ResourceContents};
pub use template::{ResourceHandler, ResourceTemplate, UriTemplate};

use template::ResourceFunc;

pub mod read_resource_result;
pub mod uri;
pub mod template;

/// List of commands for Resources
pub mod commands {
    /// Command name that returns a list of resources the server has.
    pub const LIST: &str = "resources/list";

    /// Command name that returns a list of resource templates the server has.
    pub const TEMPLATES_LIST: &str = "resources/templates/list";

    /// Command name that reads a specific resource URI.
    pub const READ: &str = "resources/read";
}

/// Represents a known resource that the server is capable of reading.
///
/// See the [schema](https://github.com/modelcontextprotocol/specification/blob/main/schema/) for details
#[derive(Clone, Serialize)]
pub struct Resource {
    /// The URI of this resource.
    pub uri: Uri,

    /// A human-readable name for this resource.
    pub name: String,

    /// A description of what this resource represents.
    #[serde(rename = "description", skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,

    /// The MIME type of this resource, if known.
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,

    /// A read handler
    #[serde(skip)]
    handler: Option<BoundHandler<ReadResourceResult>>,

    /// An optional authorization predicate
    #[serde(skip)]
    predicate: Option<Predicate>,
}

/// Sent from the client to request a list of resources the server has.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListResourcesRequestParams {
    /// Metadata related to the request.
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// Sent from the client to the server, to read a specific resource URI.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadResourceRequestParams {
    /// The URI of the resource to read. The URI can use any protocol;
    /// it is up to the server how to interpret it.
    pub uri: Uri,

    /// Metadata related to the request.
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// Sent from the client to request a list of resource templates the server has.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListResourceTemplatesRequestParams {
    /// Metadata related to the request.
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// The server's response to a resources/list request from the client.
#[derive(Debug, Default, Serialize)]
pub struct ListResourcesResult {
    /// A list of resources that the server offers.
    pub resources: Vec<Resource>,
}

/// The server's response to a resources/templates/list request from the client.
#[derive(Debug, Default, Serialize)]
pub struct ListResourceTemplatesResult {
    /// A list of resource templates that the server offers.
    #[serde(rename = "resourceTemplates")]
    pub templates: Vec<ResourceTemplate>,
}

impl crate::types::IntoResponse for ListResourcesResult {
    #[inline]
    fn into_response(self, req_id: crate::types::RequestId) -> crate::types::Response {
        match serde_json::to_value(self) {
            Ok(v) => crate::types::Response::success(req_id, v),
            Err(err) => crate::types::Response::error(req_id, err.into()),
        }
    }
}

impl crate::types::IntoResponse for ListResourceTemplatesResult {
    #[inline]
    fn into_response(self, req_id: crate::types::RequestId) -> crate::types::Response {
        match serde_json::to_value(self) {
            Ok(v) => crate::types::Response::success(req_id, v),
            Err(err) => crate::types::Response::error(req_id, err.into()),
        }
    }
}

impl From<Vec<Resource>> for ListResourcesResult {
    #[inline]
    fn from(resources: Vec<Resource>) -> Self {
        Self { resources }
    }
}

impl From<Vec<ResourceTemplate>> for ListResourceTemplatesResult {
    #[inline]
    fn from(templates: Vec<ResourceTemplate>) -> Self {
        Self { templates }
    }
}

impl FromHandlerParams for ListResourcesRequestParams {
    #[inline]
    fn from_params(params: &HandlerParams) -> Result<Self, Error> {
        let req = Request::from_params(params)?;
        Self::from_request(req)
    }
}

impl FromHandlerParams for ReadResourceRequestParams {
    #[inline]
    fn from_params(params: &HandlerParams) -> Result<Self, Error> {
        let req = Request::from_params(params)?;
        Self::from_request(req)
    }
}

impl FromHandlerParams for ListResourceTemplatesRequestParams {
    #[inline]
    fn from_params(params: &HandlerParams) -> Result<Self, Error> {
        let req = Request::from_params(params)?;
        Self::from_request(req)
    }
}

impl Debug for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("uri", &self.uri)
            .field("name", &self.name)
            .field("descr", &self.descr)
            .field("mime", &self.mime)
            .finish()
    }
}

impl Resource {
    /// Creates a new [`Resource`] with a read handler
    pub fn new<F, R, Args>(uri: &str, name: &str, handler: F) -> Self
    where
        F: ResourceHandler<Args, Output = R>,
        R: TryInto<ReadResourceResult> + Send + 'static,
        R::Error: Into<Error>,
        Args: FromArguments + Send + Sync + 'static,
    {
        Self {
            uri: uri.into(),
            name: name.into(),
            descr: None,
            mime: None,
            handler: Some(ResourceFunc::new(handler)),
            predicate: None,
        }
    }

    /// Sets a description for a resource
    pub fn with_description(&mut self, description: &str) -> &mut Self {
        self.descr = Some(description.into());
        self
    }

    /// Sets a MIME type for a resource
    pub fn with_mime(&mut self, mime: &str) -> &mut Self {
        self.mime = Some(mime.into());
        self
    }

    /// Registers an authorization predicate that gates both discovery
    /// and reads of this resource
    pub fn with_predicate<P>(&mut self, predicate: P) -> &mut Self
    where
        P: Fn(&AuthorizationContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Returns `true` when the resource may be shown to the caller
    pub(crate) fn is_visible(
        &self,
        user: Option<&AuthenticatedUser>,
        workspace: Option<&str>,
    ) -> bool {
        authorize::is_allowed(
            self.predicate.as_ref(),
            user,
            ComponentKind::Resource,
            &self.uri,
            AuthAction::Read,
            None,
            workspace)
    }

    /// Applies the predicate gate for a read
    pub(crate) fn authorize(
        &self,
        user: Option<&AuthenticatedUser>,
        workspace: Option<&str>,
    ) -> Result<(), Error> {
        if self.is_visible(user, workspace) {
            Ok(())
        } else {
            Err(Error::new(
                ErrorCode::Forbidden,
                format!("Access to resource '{}' denied", self.uri)))
        }
    }

    /// Reads the resource
    pub(crate) async fn call(&self, args: Arguments) -> Result<ReadResourceResult, Error> {
        match self.handler {
            Some(ref handler) => handler.call(args).await,
            None => Err(Error::new(ErrorCode::InternalError, "Resource handler not specified"))
        }
    }
}
