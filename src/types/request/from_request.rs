//! Extraction of typed parameters from a raw request

use serde::de::DeserializeOwned;
use serde_json::Value;
use crate::error::{Error, ErrorCode};
use crate::types::Request;

/// A trait that typed request parameters implement to be extractable
/// from a raw [`Request`]
pub(crate) trait FromRequest: Sized {
    /// Extracts `Self` from the request's `params`
    fn from_request(req: Request) -> Result<Self, Error>;
}

impl<T: DeserializeOwned> FromRequest for T {
    #[inline]
    fn from_request(req: Request) -> Result<Self, Error> {
        let params = req.params
            .unwrap_or_else(|| Value::Object(Default::default()));
        serde_json::from_value(params)
            .map_err(|err| Error::new(ErrorCode::InvalidParams, err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use super::*;
    use crate::types::RequestId;

    #[derive(Deserialize, Debug)]
    struct TestParams {
        name: String,
    }

    #[test]
    fn it_extracts_typed_params() {
        let req = Request::new(
            Some(RequestId::Number(1)),
            "test",
            Some(serde_json::json!({ "name": "echo" })));

        let params = TestParams::from_request(req).unwrap();

        assert_eq!(params.name, "echo");
    }

    #[test]
    fn it_fails_with_invalid_params_on_missing_field() {
        let req = Request::new(Some(RequestId::Number(1)), "test", None);

        let err = TestParams::from_request(req).unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidParams);
    }
}
