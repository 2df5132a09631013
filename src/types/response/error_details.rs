//! Represents error details utils for JSON-RPC responses

use serde::{Deserialize, Serialize};
use crate::error::{Error, ErrorCode};

/// Detailed error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Integer error code.
    pub code: ErrorCode,

    /// Short description of the error.
    pub message: String,

    /// Optional additional error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>
}

impl From<Error> for ErrorDetails {
    #[inline]
    fn from(err: Error) -> Self {
        Self {
            code: err.code(),
            message: err.message(),
            data: err.into_data(),
        }
    }
}

impl ErrorDetails {
    /// Creates a new [`ErrorDetails`] with the [`ErrorCode::InternalError`] code
    #[inline]
    pub fn new(err: &str) -> Self {
        Self {
            code: ErrorCode::InternalError,
            message: err.into(),
            data: None
        }
    }
}
