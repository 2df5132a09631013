//! Tools for converting any type into MCP server response

use crate::error::{Error, ErrorCode};
use crate::types::{
    RequestId,
    Response,
};

/// A trait for converting any return type into MCP response
pub trait IntoResponse {
    /// Converts a type into MCP server response
    fn into_response(self, req_id: RequestId) -> Response;
}

impl IntoResponse for Response {
    #[inline]
    fn into_response(self, req_id: RequestId) -> Response {
        self.set_id(req_id)
    }
}

impl IntoResponse for Error {
    #[inline]
    fn into_response(self, req_id: RequestId) -> Response {
        Response::error(req_id, self)
    }
}

impl IntoResponse for ErrorCode {
    #[inline]
    fn into_response(self, req_id: RequestId) -> Response {
        Response::error(req_id, self.into())
    }
}

impl IntoResponse for serde_json::Value {
    #[inline]
    fn into_response(self, req_id: RequestId) -> Response {
        Response::success(req_id, self)
    }
}

impl IntoResponse for () {
    #[inline]
    fn into_response(self, req_id: RequestId) -> Response {
        Response::empty(req_id)
    }
}

impl<T, E> IntoResponse for Result<T, E>
where
    T: IntoResponse,
    E: IntoResponse
{
    #[inline]
    fn into_response(self, req_id: RequestId) -> Response {
        match self {
            Ok(value) => value.into_response(req_id),
            Err(err) => err.into_response(req_id),
        }
    }
}
