//! MCP server options

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use crate::auth::{AuthProvider, AuthenticatedUser};
use crate::middleware::Middlewares;
use crate::transport::{http::HttpOptions, sse::SseOptions, TransportProto};
use crate::types::{
    Implementation, Prompt, Resource, ResourceTemplate, Tool, Uri,
    PromptsCapability, ResourcesCapability, ServerCapabilities, ToolsCapability,
};

/// Represents MCP server configuration options
#[derive(Default)]
pub struct McpOptions {
    /// Information of current server's implementation
    pub(crate) implementation: Implementation,

    /// Optional usage instructions advertised in the initialize result
    instructions: Option<String>,

    /// Current transport protocol that server uses
    proto: Option<TransportProto>,

    /// The configured authentication provider, if any
    auth_provider: Option<Arc<dyn AuthProvider>>,

    /// Whether unauthenticated requests are rejected outright
    auth_required: bool,

    /// A map of tools, where the _key_ is a tool _name_
    tools: HashMap<String, Tool>,

    /// A map of resources, where the _key_ is a resource URI
    resources: HashMap<String, Resource>,

    /// Resource templates, consulted in registration order
    templates: Vec<ResourceTemplate>,

    /// A map of prompts, where the _key_ is a prompt _name_
    prompts: HashMap<String, Prompt>,

    /// The middleware pipeline
    middlewares: Middlewares,
}

impl Debug for McpOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpOptions")
            .field("implementation", &self.implementation)
            .field("auth_required", &self.auth_required)
            .finish()
    }
}

impl McpOptions {
    /// Sets stdio as a transport protocol
    pub fn with_stdio(mut self) -> Self {
        self.proto = Some(TransportProto::Stdio);
        self
    }

    /// Sets request/response HTTP as a transport protocol
    pub fn with_http<F>(mut self, config: F) -> Self
    where
        F: FnOnce(HttpOptions) -> HttpOptions
    {
        self.proto = Some(TransportProto::Http(config(HttpOptions::default())));
        self
    }

    /// Sets streaming-event HTTP (SSE) as a transport protocol
    pub fn with_sse<F>(mut self, config: F) -> Self
    where
        F: FnOnce(SseOptions) -> SseOptions
    {
        self.proto = Some(TransportProto::Sse(config(SseOptions::default())));
        self
    }

    /// Specifies MCP server name
    pub fn with_name(mut self, name: &str) -> Self {
        self.implementation.name = name.into();
        self
    }

    /// Specifies MCP server version
    pub fn with_version(mut self, ver: &str) -> Self {
        self.implementation.version = ver.into();
        self
    }

    /// Specifies usage instructions advertised to clients
    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Configures an authentication provider; unauthenticated callers
    /// are still admitted unless [`with_auth_required`] is used
    ///
    /// [`with_auth_required`]: McpOptions::with_auth_required
    pub fn with_auth(mut self, provider: impl AuthProvider + 'static) -> Self {
        self.auth_provider = Some(Arc::new(provider));
        self
    }

    /// Configures an authentication provider and rejects every
    /// non-public request that does not authenticate
    pub fn with_auth_required(mut self, provider: impl AuthProvider + 'static) -> Self {
        self.auth_provider = Some(Arc::new(provider));
        self.auth_required = true;
        self
    }

    /// Adds a tool
    pub(crate) fn add_tool(&mut self, tool: Tool) -> &mut Tool {
        self.tools
            .entry(tool.name.clone())
            .or_insert(tool)
    }

    /// Adds a resource
    pub(crate) fn add_resource(&mut self, resource: Resource) -> &mut Resource {
        self.resources
            .entry(resource.uri.to_string())
            .or_insert(resource)
    }

    /// Adds a resource template
    pub(crate) fn add_resource_template(&mut self, template: ResourceTemplate) -> &mut ResourceTemplate {
        let index = self.templates
            .iter()
            .position(|existing| existing.uri_template == template.uri_template);
        let index = match index {
            Some(index) => index,
            None => {
                self.templates.push(template);
                self.templates.len() - 1
            }
        };
        &mut self.templates[index]
    }

    /// Adds a prompt
    pub(crate) fn add_prompt(&mut self, prompt: Prompt) -> &mut Prompt {
        self.prompts
            .entry(prompt.name.clone())
            .or_insert(prompt)
    }

    /// Adds middleware to the pipeline
    pub(crate) fn add_middleware(&mut self, middleware: Arc<dyn crate::middleware::Middleware>) {
        self.middlewares.add(middleware);
    }

    /// Returns current transport protocol
    pub(crate) fn transport(&mut self) -> TransportProto {
        self.proto
            .take()
            .unwrap_or_default()
    }

    /// Freezes the options into their shared runtime form
    pub(crate) fn into_runtime(self) -> RuntimeMcpOptions {
        RuntimeMcpOptions {
            inner: Arc::new(RuntimeInner {
                implementation: self.implementation,
                instructions: self.instructions,
                auth_provider: self.auth_provider,
                auth_required: self.auth_required,
                tools: self.tools,
                resources: self.resources,
                templates: self.templates,
                prompts: self.prompts,
                middlewares: self.middlewares,
                initialized: AtomicBool::new(false),
            })
        }
    }
}

/// The read-only, shareable form of [`McpOptions`] used while serving.
///
/// Registries are frozen before the server starts; the initialization flag
/// is the only mutable bit and it only ever goes from off to on.
#[derive(Clone)]
pub struct RuntimeMcpOptions {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    implementation: Implementation,
    instructions: Option<String>,
    auth_provider: Option<Arc<dyn AuthProvider>>,
    auth_required: bool,
    tools: HashMap<String, Tool>,
    resources: HashMap<String, Resource>,
    templates: Vec<ResourceTemplate>,
    prompts: HashMap<String, Prompt>,
    middlewares: Middlewares,
    initialized: AtomicBool,
}

impl Debug for RuntimeMcpOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeMcpOptions")
            .field("implementation", &self.inner.implementation)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl RuntimeMcpOptions {
    /// Returns the server's implementation info
    #[inline]
    pub(crate) fn implementation(&self) -> &Implementation {
        &self.inner.implementation
    }

    /// Returns the advertised usage instructions
    #[inline]
    pub(crate) fn instructions(&self) -> Option<&str> {
        self.inner.instructions.as_deref()
    }

    /// Returns the configured auth provider
    #[inline]
    pub(crate) fn auth_provider(&self) -> Option<&Arc<dyn AuthProvider>> {
        self.inner.auth_provider.as_ref()
    }

    /// Returns `true` when unauthenticated requests must be rejected
    #[inline]
    pub(crate) fn auth_required(&self) -> bool {
        self.inner.auth_required
    }

    /// Returns the middleware pipeline
    #[inline]
    pub(crate) fn middlewares(&self) -> &Middlewares {
        &self.inner.middlewares
    }

    /// Returns `true` once the `initialize` handshake has completed
    #[inline]
    pub(crate) fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    /// Marks the session initialized; idempotent
    #[inline]
    pub(crate) fn set_initialized(&self) {
        self.inner.initialized.store(true, Ordering::Release);
    }

    /// Builds the capability set advertised to clients: a key per
    /// category with at least one registered component
    pub(crate) fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            tools: (!self.inner.tools.is_empty())
                .then(ToolsCapability::default),
            resources: (!self.inner.resources.is_empty() || !self.inner.templates.is_empty())
                .then(ResourcesCapability::default),
            prompts: (!self.inner.prompts.is_empty())
                .then(PromptsCapability::default),
        }
    }

    /// Returns a tool by its name
    #[inline]
    pub(crate) fn get_tool(&self, name: &str) -> Option<&Tool> {
        self.inner.tools.get(name)
    }

    /// Returns a prompt by its name
    #[inline]
    pub(crate) fn get_prompt(&self, name: &str) -> Option<&Prompt> {
        self.inner.prompts.get(name)
    }

    /// Returns an exact resource by its URI
    #[inline]
    pub(crate) fn get_resource(&self, uri: &Uri) -> Option<&Resource> {
        self.inner.resources.get(uri.as_str())
    }

    /// Returns the registered templates, in registration order
    #[inline]
    pub(crate) fn templates(&self) -> &[ResourceTemplate] {
        &self.inner.templates
    }

    /// Returns the tools visible to the caller, sorted by name
    pub(crate) fn tools(
        &self,
        user: Option<&AuthenticatedUser>,
        workspace: Option<&str>,
    ) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self.inner.tools
            .values()
            .filter(|tool| tool.is_visible(user, workspace))
            .cloned()
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Returns the resources visible to the caller, sorted by URI
    pub(crate) fn resources(
        &self,
        user: Option<&AuthenticatedUser>,
        workspace: Option<&str>,
    ) -> Vec<Resource> {
        let mut resources: Vec<Resource> = self.inner.resources
            .values()
            .filter(|resource| resource.is_visible(user, workspace))
            .cloned()
            .collect();
        resources.sort_by(|a, b| a.uri.cmp(&b.uri));
        resources
    }

    /// Returns the resource templates visible to the caller,
    /// in registration order
    pub(crate) fn resource_templates(
        &self,
        user: Option<&AuthenticatedUser>,
        workspace: Option<&str>,
    ) -> Vec<ResourceTemplate> {
        self.inner.templates
            .iter()
            .filter(|template| template.is_visible(user, workspace))
            .cloned()
            .collect()
    }

    /// Returns the prompts visible to the caller, sorted by name
    pub(crate) fn prompts(
        &self,
        user: Option<&AuthenticatedUser>,
        workspace: Option<&str>,
    ) -> Vec<Prompt> {
        let mut prompts: Vec<Prompt> = self.inner.prompts
            .values()
            .filter(|prompt| prompt.is_visible(user, workspace))
            .cloned()
            .collect();
        prompts.sort_by(|a, b| a.name.cmp(&b.name));
        prompts
    }
}
