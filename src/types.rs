//! Types used by the MCP protocol
//!
//! See the [specification](https://github.com/modelcontextprotocol/specification) for details

use std::fmt::Display;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::SERVER_NAME;
use crate::app::handler::{FromHandlerParams, HandlerParams};
use crate::error::Error;
use crate::types::notification::Notification;

pub use request::{RequestId, Request};
pub(crate) use request::FromRequest;
pub use response::{ErrorDetails, IntoResponse, Response};
pub use content::{Content, ImageContent, TextContent};
pub use capabilities::{
    ClientCapabilities,
    ServerCapabilities,
    ToolsCapability,
    ResourcesCapability,
    PromptsCapability,
};
pub use schema::{
    InputSchema,
    Json,
    PropertyType,
    SchemaProperty,
    SchemaType,
    ToolParam,
};
pub use tool::{
    ListToolsRequestParams,
    CallToolRequestParams,
    CallToolResponse,
    Tool,
    ToolHandler,
    ListToolsResult,
};
pub use resource::{
    Uri,
    UriTemplate,
    ListResourcesRequestParams,
    ListResourceTemplatesRequestParams,
    ListResourcesResult,
    ListResourceTemplatesResult,
    Resource,
    ResourceHandler,
    ResourceTemplate,
    ResourceContents,
    ReadResourceResult,
    ReadResourceRequestParams,
};
pub use prompt::{
    ListPromptsRequestParams,
    ListPromptsResult,
    Prompt,
    PromptHandler,
    GetPromptRequestParams,
    GetPromptResult,
    PromptArgument,
    PromptMessage,
};

pub mod request;
pub mod response;
pub mod capabilities;
pub mod schema;
pub mod tool;
pub mod resource;
pub mod prompt;
pub mod content;
pub mod notification;

pub(crate) const JSONRPC_VERSION: &str = "2.0";

/// Represents a JSON RPC message that could be either a [`Request`]
/// or a [`Notification`]
#[derive(Debug, Clone)]
pub enum Message {
    /// See [`Request`]
    Request(Request),

    /// See [`Notification`]
    Notification(Notification),
}

impl Message {
    /// Parses a single JSON-RPC frame.
    ///
    /// A present `id` key, whatever its value, makes the message a request;
    /// an absent key makes it a notification. Malformed JSON fails with
    /// [`ParseError`](crate::error::ErrorCode::ParseError); structural
    /// violations fail with
    /// [`InvalidRequest`](crate::error::ErrorCode::InvalidRequest).
    pub fn parse(bytes: &[u8]) -> Result<Message, Error> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|err| Error::new(
                crate::error::ErrorCode::ParseError,
                format!("Parse error: {err}")))?;
        let obj = request::validate_frame(&value)?;
        let message = if obj.contains_key("id") {
            Message::Request(serde_json::from_value(value)
                .map_err(|err| Error::new(
                    crate::error::ErrorCode::InvalidRequest,
                    err.to_string()))?)
        } else {
            Message::Notification(serde_json::from_value(value)
                .map_err(|err| Error::new(
                    crate::error::ErrorCode::InvalidRequest,
                    err.to_string()))?)
        };
        Ok(message)
    }

    /// Returns `true` is the current message is [`Request`]
    #[inline]
    pub fn is_request(&self) -> bool {
        matches!(self, Message::Request(_))
    }

    /// Returns `true` is the current message is [`Notification`]
    #[inline]
    pub fn is_notification(&self) -> bool {
        matches!(self, Message::Notification(_))
    }

    /// Returns the message method
    #[inline]
    pub fn method(&self) -> &str {
        match self {
            Message::Request(req) => &req.method,
            Message::Notification(notification) => &notification.method,
        }
    }

    /// Returns [`Message`] ID
    #[inline]
    pub fn id(&self) -> RequestId {
        match self {
            Message::Request(req) => req.id(),
            Message::Notification(_) => RequestId::default()
        }
    }
}

/// Parameters for an initialization request sent to the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitializeRequestParams {
    /// The version of the Model Context Protocol that the client is to use.
    #[serde(rename = "protocolVersion", skip_serializing_if = "Option::is_none")]
    pub protocol_ver: Option<String>,

    /// The client's capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<ClientCapabilities>,

    /// Information about the client implementation.
    #[serde(rename = "clientInfo", skip_serializing_if = "Option::is_none")]
    pub client_info: Option<Implementation>,
}

/// Result of the initialization request sent to the server.
#[derive(Debug, Clone, Serialize)]
pub struct InitializeResult {
    /// The version of the Model Context Protocol that the server is to use.
    #[serde(rename = "protocolVersion")]
    pub protocol_ver: String,

    /// The server's capabilities.
    pub capabilities: ServerCapabilities,

    /// Information about the server implementation.
    #[serde(rename = "serverInfo")]
    pub server_info: Implementation,

    /// Optional instructions for using the server and its features.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>
}

/// Describes the name and version of an MCP implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Implementation {
    /// Name of the implementation.
    pub name: String,

    /// Version of the implementation.
    pub version: String,
}

/// Represents the type of role in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Corresponds to the user in the conversation.
    User,
    /// Corresponds to the AI in the conversation.
    Assistant
}

impl Display for Role {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl From<&str> for Role {
    #[inline]
    fn from(role: &str) -> Self {
        match role {
            "assistant" => Self::Assistant,
            _ => Self::User
        }
    }
}

impl Default for Implementation {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.into(),
            version: env!("CARGO_PKG_VERSION").into()
        }
    }
}

impl FromHandlerParams for InitializeRequestParams {
    #[inline]
    fn from_params(params: &HandlerParams) -> Result<Self, Error> {
        let req = Request::from_params(params)?;
        Self::from_request(req)
    }
}

impl InitializeResult {
    /// Builds the handshake result from the frozen server options
    pub(crate) fn new(options: &crate::app::options::RuntimeMcpOptions) -> Self {
        Self {
            protocol_ver: crate::PROTOCOL_VERSION.into(),
            capabilities: options.capabilities(),
            server_info: options.implementation().clone(),
            instructions: options.instructions().map(ToOwned::to_owned),
        }
    }
}

impl IntoResponse for InitializeResult {
    #[inline]
    fn into_response(self, req_id: RequestId) -> Response {
        match serde_json::to_value(self) {
            Ok(v) => Response::success(req_id, v),
            Err(err) => Response::error(req_id, err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorCode;
    use super::*;

    #[test]
    fn it_parses_a_request() {
        let msg = Message::parse(br#"{"jsonrpc":"2.0","id":1,"method":"ping","params":{}}"#).unwrap();

        assert!(msg.is_request());
        assert_eq!(msg.method(), "ping");
        assert_eq!(msg.id(), RequestId::Number(1));
    }

    #[test]
    fn it_classifies_messages_without_id_as_notifications() {
        let msg = Message::parse(br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();

        assert!(msg.is_notification());
    }

    #[test]
    fn it_classifies_zero_and_empty_string_ids_as_requests() {
        let msg = Message::parse(br#"{"jsonrpc":"2.0","id":0,"method":"ping"}"#).unwrap();
        assert!(msg.is_request());
        assert_eq!(msg.id(), RequestId::Number(0));

        let msg = Message::parse(br#"{"jsonrpc":"2.0","id":"","method":"ping"}"#).unwrap();
        assert!(msg.is_request());
        assert_eq!(msg.id(), RequestId::String(String::new()));
    }

    #[test]
    fn it_fails_with_parse_error_on_malformed_json() {
        let err = Message::parse(b"not json").unwrap_err();

        assert_eq!(err.code(), ErrorCode::ParseError);
    }

    #[test]
    fn it_fails_with_invalid_request_on_missing_version() {
        let err = Message::parse(br#"{"id":1,"method":"ping"}"#).unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[test]
    fn it_fails_with_invalid_request_on_wrong_version() {
        let err = Message::parse(br#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#).unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[test]
    fn it_treats_omitted_params_as_empty() {
        let msg = Message::parse(br#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#).unwrap();

        let Message::Request(req) = msg else { unreachable!() };
        assert!(req.params.is_none());
    }

    #[test]
    fn it_parses_initialize_params_from_empty_object() {
        let params: InitializeRequestParams = serde_json::from_value(serde_json::json!({})).unwrap();

        assert!(params.protocol_ver.is_none());
        assert!(params.client_info.is_none());
    }
}
