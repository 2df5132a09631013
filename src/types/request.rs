//! Represents a request from MCP client

use std::fmt;
use serde::{Serialize, Deserialize};
use serde_json::Value;
use crate::error::{Error, ErrorCode};
use crate::types::JSONRPC_VERSION;

pub(crate) use from_request::FromRequest;

pub(crate) mod from_request;

/// A unique identifier for a request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// String identifier
    String(String),
    /// Numeric identifier
    Number(i64),
    /// Absent or null identifier; serialized as JSON `null`
    Null,
}

impl Default for RequestId {
    #[inline]
    fn default() -> RequestId {
        Self::Null
    }
}

/// A request in the JSON-RPC protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// JSON-RPC protocol version.
    ///
    /// > Note: always 2.0.
    pub jsonrpc: String,

    /// Name of the method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,

    /// Request identifier. Must be a string or number and unique within the session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

impl fmt::Display for RequestId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(str) => write!(f, "{}", str),
            RequestId::Number(num) => write!(f, "{}", num),
            RequestId::Null => write!(f, "null"),
        }
    }
}

impl Request {
    /// Creates a new [`Request`]
    pub fn new(id: Option<RequestId>, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            method: method.into(),
            params,
            id,
        }
    }

    /// Returns request's id if it's specified, otherwise [`RequestId::Null`]
    pub fn id(&self) -> RequestId {
        self.id
            .clone()
            .unwrap_or_default()
    }
}

/// Validates a decoded JSON-RPC frame and classifies it.
///
/// Returns the raw object map on success; the caller decides Request vs
/// Notification by the presence of the `id` key.
pub(crate) fn validate_frame(value: &Value) -> Result<&serde_json::Map<String, Value>, Error> {
    let Some(obj) = value.as_object() else {
        return Err(Error::new(ErrorCode::InvalidRequest, "Request must be a JSON object"));
    };
    match obj.get("jsonrpc").and_then(Value::as_str) {
        Some(JSONRPC_VERSION) => (),
        _ => return Err(Error::new(
            ErrorCode::InvalidRequest,
            "Invalid or missing jsonrpc version")),
    }
    if !obj.get("method").is_some_and(Value::is_string) {
        return Err(Error::new(ErrorCode::InvalidRequest, "Invalid or missing method"));
    }
    match obj.get("params") {
        None | Some(Value::Object(_)) => (),
        Some(_) => return Err(Error::new(
            ErrorCode::InvalidRequest,
            "Parameters must be an object when present")),
    }
    Ok(obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_serializes_request_without_absent_fields() {
        let req = Request::new(Some(RequestId::Number(1)), "ping", None);

        let json = serde_json::to_string(&req).unwrap();

        assert_eq!(json, r#"{"jsonrpc":"2.0","method":"ping","id":1}"#);
    }

    #[test]
    fn it_returns_null_id_when_absent() {
        let req = Request::new(None, "ping", None);

        assert_eq!(req.id(), RequestId::Null);
    }

    #[test]
    fn it_rejects_wrong_version() {
        let value = serde_json::json!({ "jsonrpc": "1.0", "id": 1, "method": "ping" });

        let err = validate_frame(&value).unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[test]
    fn it_rejects_missing_method() {
        let value = serde_json::json!({ "jsonrpc": "2.0", "id": 1 });

        let err = validate_frame(&value).unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[test]
    fn it_rejects_non_string_method() {
        let value = serde_json::json!({ "jsonrpc": "2.0", "id": 1, "method": 42 });

        let err = validate_frame(&value).unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[test]
    fn it_rejects_non_object_params() {
        let value = serde_json::json!({ "jsonrpc": "2.0", "id": 1, "method": "ping", "params": [1] });

        let err = validate_frame(&value).unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[test]
    fn it_accepts_omitted_params() {
        let value = serde_json::json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" });

        assert!(validate_frame(&value).is_ok());
    }
}
