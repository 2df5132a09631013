//! Represents error code tools

use std::fmt::Display;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use crate::error::Error;

/// Standard JSON-RPC error codes as defined in the MCP specification,
/// plus the server-range codes this framework uses.
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorCode {
    /// The server received invalid JSON.
    ParseError = -32700,

    /// The JSON sent is not a valid Request object.
    InvalidRequest = -32600,

    /// The method does not exist / is not available.
    MethodNotFound = -32601,

    /// Invalid method parameter(s).
    InvalidParams = -32602,

    /// Internal JSON-RPC error.
    #[default]
    InternalError = -32603,

    /// Generic server error.
    ServerError = -32000,

    /// The tool, resource or prompt does not exist.
    NotFound = -32001,

    /// Authentication is required or has failed.
    Unauthorized = -32002,

    /// Authorization has been denied.
    Forbidden = -32003,

    /// The request has timed out.
    Timeout = -32004,

    /// The request failed validation.
    ValidationError = -32005,
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code as i32
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = ();

    #[inline]
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -32700 => Ok(ErrorCode::ParseError),
            -32600 => Ok(ErrorCode::InvalidRequest),
            -32601 => Ok(ErrorCode::MethodNotFound),
            -32602 => Ok(ErrorCode::InvalidParams),
            -32603 => Ok(ErrorCode::InternalError),
            -32000 => Ok(ErrorCode::ServerError),
            -32001 => Ok(ErrorCode::NotFound),
            -32002 => Ok(ErrorCode::Unauthorized),
            -32003 => Ok(ErrorCode::Forbidden),
            -32004 => Ok(ErrorCode::Timeout),
            -32005 => Ok(ErrorCode::ValidationError),
            _ => Err(()),
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let code: i32 = (*self).into();
        serializer.serialize_i32(code)
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<ErrorCode, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = i32::deserialize(deserializer)?;
        ErrorCode::try_from(value).map_err(|_| {
            serde::de::Error::custom(format!("Invalid error code: {value}"))
        })
    }
}

impl Display for ErrorCode {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::ParseError => write!(f, "Parse error"),
            ErrorCode::InvalidRequest => write!(f, "Invalid request"),
            ErrorCode::MethodNotFound => write!(f, "Method not found"),
            ErrorCode::InvalidParams => write!(f, "Invalid parameters"),
            ErrorCode::InternalError => write!(f, "Internal error"),
            ErrorCode::ServerError => write!(f, "Server error"),
            ErrorCode::NotFound => write!(f, "Not found"),
            ErrorCode::Unauthorized => write!(f, "Unauthorized"),
            ErrorCode::Forbidden => write!(f, "Forbidden"),
            ErrorCode::Timeout => write!(f, "Request timed out"),
            ErrorCode::ValidationError => write!(f, "Validation error"),
        }
    }
}

impl From<ErrorCode> for Error {
    fn from(code: ErrorCode) -> Self {
        Error::protocol(code)
    }
}
