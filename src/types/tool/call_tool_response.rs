//! Types and util for handling tool results

use serde::{Serialize, Deserialize};
use serde_json::Value;
use crate::error::Error;
use crate::types::{Content, IntoResponse, Json, RequestId, Response};

#[inline]
fn is_false(value: &bool) -> bool {
    !value
}

/// The server's response to a tool call.
///
/// Any errors that originate from the tool SHOULD be reported inside the result
/// object, with `isError` set to true, _not_ as an MCP protocol-level error
/// response. Otherwise, the LLM would not be able to see that an error occurred
/// and self-correct.
///
/// However, any errors in _finding_ the tool, an error indicating that the
/// server does not support tool calls, or any other exceptional conditions,
/// should be reported as an MCP error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallToolResponse {
    /// The server's response to a tools/call request from the client.
    pub content: Vec<Content>,

    /// An optional JSON object that represents the structured result of the tool call.
    #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
    pub struct_content: Option<Value>,

    /// Whether the tool call was unsuccessful. Emitted only when true.
    #[serde(default, rename = "isError", skip_serializing_if = "is_false")]
    pub is_error: bool,

    /// Metadata reserved by MCP for protocol-level metadata.
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl IntoResponse for CallToolResponse {
    #[inline]
    fn into_response(self, req_id: RequestId) -> Response {
        match serde_json::to_value(self) {
            Ok(v) => Response::success(req_id, v),
            Err(err) => Response::error(req_id, err.into()),
        }
    }
}

impl From<Error> for CallToolResponse {
    #[inline]
    fn from(value: Error) -> Self {
        Self::error(value)
    }
}

impl<T, E> From<Result<T, E>> for CallToolResponse
where
    T: Into<CallToolResponse>,
    E: Into<Error>,
{
    #[inline]
    fn from(value: Result<T, E>) -> Self {
        match value {
            Ok(value) => value.into(),
            Err(error) => error.into().into(),
        }
    }
}

impl<T> From<Option<T>> for CallToolResponse
where
    T: Into<CallToolResponse>,
{
    #[inline]
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Self::empty(),
        }
    }
}

impl From<()> for CallToolResponse {
    #[inline]
    fn from(_: ()) -> Self {
        Self::empty()
    }
}

impl From<&'static str> for CallToolResponse {
    #[inline]
    fn from(str: &str) -> Self {
        Self::new(str)
    }
}

impl From<String> for CallToolResponse {
    #[inline]
    fn from(str: String) -> Self {
        Self::new(str)
    }
}

impl From<Content> for CallToolResponse {
    #[inline]
    fn from(content: Content) -> Self {
        Self::new(content)
    }
}

impl From<Vec<Content>> for CallToolResponse {
    #[inline]
    fn from(content: Vec<Content>) -> Self {
        Self {
            content,
            struct_content: None,
            is_error: false,
            meta: None,
        }
    }
}

impl<T: Serialize> From<Json<T>> for CallToolResponse {
    #[inline]
    fn from(value: Json<T>) -> Self {
        Self::json(value.0)
    }
}

impl From<Value> for CallToolResponse {
    #[inline]
    fn from(value: Value) -> Self {
        value.to_string().into()
    }
}

macro_rules! impl_from_for_call_tool_response {
    { $($type:ident),* $(,)? } => {
        $(impl From<$type> for CallToolResponse {
            #[inline]
            fn from(value: $type) -> Self {
                Self::new(value.to_string())
            }
        })*
    };
}

impl_from_for_call_tool_response! {
    bool,
    i8, i16, i32, i64, isize,
    u8, u16, u32, u64, usize,
    f32, f64,
}

impl CallToolResponse {
    /// Creates a single response
    #[inline]
    pub fn new(text: impl Into<Content>) -> Self {
        Self {
            content: vec![text.into()],
            struct_content: None,
            is_error: false,
            meta: None,
        }
    }

    /// Creates a single structured JSON response
    #[inline]
    pub fn json<T: Serialize>(data: T) -> Self {
        match serde_json::to_value(&data) {
            Err(err) => Self::error(err.into()),
            Ok(structure) => Self {
                content: vec![Content::json(&data)],
                struct_content: Some(structure),
                is_error: false,
                meta: None,
            },
        }
    }

    /// Creates an error response; the wire message of the error becomes
    /// the text content
    #[inline]
    pub fn error(error: Error) -> Self {
        Self {
            content: vec![Content::text(error.message())],
            struct_content: None,
            is_error: true,
            meta: None,
        }
    }

    /// Creates an empty response
    #[inline]
    pub fn empty() -> Self {
        Self {
            content: vec![],
            struct_content: None,
            is_error: false,
            meta: None,
        }
    }
}
