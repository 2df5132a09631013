//! Error handling for the MCP wire protocol

use std::convert::Infallible;
use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;
use serde_json::Value;

pub use error_code::ErrorCode;

pub mod error_code;

type BoxError = Box<
    dyn StdError
    + Send
    + Sync
>;

/// Represents an MCP server error.
///
/// Every error carries the JSON-RPC code it is reported under. The optional
/// detail becomes the error envelope's `message` and the optional payload
/// its `data`; an error raised without a detail goes on the wire with the
/// code's canonical message.
#[derive(Debug)]
pub struct Error {
    code: ErrorCode,
    detail: Option<BoxError>,
    data: Option<Value>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {detail}", self.code),
            None => fmt::Display::fmt(&self.code, f),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.detail
            .as_deref()
            .map(|detail| detail as &(dyn StdError + 'static))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::new(ErrorCode::ParseError, err)
    }
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Error {
        Error::new(ErrorCode::InternalError, err)
    }
}

impl From<Infallible> for Error {
    fn from(infallible: Infallible) -> Error {
        match infallible {}
    }
}

impl Error {
    /// Creates a new [`Error`] with a detail message.
    ///
    /// Codes outside the JSON-RPC table fall back to
    /// [`ErrorCode::InternalError`].
    #[inline]
    pub fn new(code: impl TryInto<ErrorCode>, detail: impl Into<BoxError>) -> Error {
        Self {
            code: code
                .try_into()
                .unwrap_or_default(),
            detail: Some(detail.into()),
            data: None,
        }
    }

    /// Creates a bare protocol error that is reported with the code's
    /// canonical message
    #[inline]
    pub fn protocol(code: ErrorCode) -> Error {
        Self {
            code,
            detail: None,
            data: None,
        }
    }

    /// Attaches a payload for the error envelope's `data` field
    pub fn with_data(mut self, data: Value) -> Error {
        self.data = Some(data);
        self
    }

    /// Returns the JSON-RPC error code of this error
    #[inline]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the text placed in the error envelope's `message` field
    pub fn message(&self) -> String {
        match &self.detail {
            Some(detail) => detail.to_string(),
            None => self.code.to_string(),
        }
    }

    /// Returns the payload placed in the error envelope's `data` field
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Consumes the error, yielding the `data` payload
    pub(crate) fn into_data(self) -> Option<Value> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_reports_the_detail_as_the_wire_message() {
        let err = Error::new(ErrorCode::NotFound, "Unknown tool: echo");

        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message(), "Unknown tool: echo");
    }

    #[test]
    fn it_falls_back_to_the_canonical_code_message() {
        let err = Error::protocol(ErrorCode::MethodNotFound);

        assert_eq!(err.message(), "Method not found");
        assert_eq!(err.to_string(), "Method not found");
    }

    #[test]
    fn it_prefixes_display_with_the_code() {
        let err = Error::new(ErrorCode::Forbidden, "Access to tool 'admin' denied");

        assert_eq!(err.to_string(), "Forbidden: Access to tool 'admin' denied");
    }

    #[test]
    fn it_falls_back_to_internal_error_for_unknown_codes() {
        let err = Error::new(-1, "boom");

        assert_eq!(err.code(), ErrorCode::InternalError);
    }

    #[test]
    fn it_converts_serde_errors_into_parse_errors() {
        let inner = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: Error = inner.into();

        assert_eq!(err.code(), ErrorCode::ParseError);
        assert!(err.source().is_some());
    }

    #[test]
    fn it_carries_envelope_data() {
        let err = Error::new(ErrorCode::InvalidParams, "Missing required argument: text")
            .with_data(serde_json::json!({ "argument": "text" }));

        assert_eq!(err.data().unwrap()["argument"], "text");
        assert_eq!(err.into_data().unwrap()["argument"], "text");
    }
}
