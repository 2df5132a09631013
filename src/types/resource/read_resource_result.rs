//! Types and utils for handling read resource results

use base64::{engine::general_purpose, Engine};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::error::Error;
use crate::types::{IntoResponse, Json, RequestId, Response};

const JSON_MIME: &str = "application/json";

/// The server's response to a resources/read request from the client.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadResourceResult {
    /// A list of ResourceContents that this resource contains.
    pub contents: Vec<ResourceContents>
}

/// Represents the content of a resource.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceContents {
    /// The URI of the resource.
    pub uri: String,

    /// The type of content.
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,

    /// The text content of the resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// The base64-encoded binary content of the resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>
}

impl IntoResponse for ReadResourceResult {
    #[inline]
    fn into_response(self, req_id: RequestId) -> Response {
        match serde_json::to_value(self) {
            Ok(v) => Response::success(req_id, v),
            Err(err) => Response::error(req_id, err.into()),
        }
    }
}

impl From<(&str, &str)> for ResourceContents {
    #[inline]
    fn from((uri, text): (&str, &str)) -> Self {
        Self::text(uri, "text/plain", text)
    }
}

impl From<(&str, &str, &str)> for ResourceContents {
    #[inline]
    fn from((uri, mime, text): (&str, &str, &str)) -> Self {
        Self::text(uri, mime, text)
    }
}

impl From<(String, String)> for ResourceContents {
    #[inline]
    fn from((uri, text): (String, String)) -> Self {
        Self {
            uri,
            text: Some(text),
            mime: Some("text/plain".into()),
            blob: None
        }
    }
}

impl From<ResourceContents> for ReadResourceResult {
    #[inline]
    fn from(content: ResourceContents) -> Self {
        Self { contents: vec![content] }
    }
}

impl From<String> for ReadResourceResult {
    /// A plain string becomes one text content entry; the dispatcher fills
    /// the `uri` with the requested one.
    #[inline]
    fn from(text: String) -> Self {
        Self {
            contents: vec![ResourceContents {
                uri: String::new(),
                mime: None,
                text: Some(text),
                blob: None,
            }]
        }
    }
}

impl From<&str> for ReadResourceResult {
    #[inline]
    fn from(text: &str) -> Self {
        text.to_owned().into()
    }
}

impl From<Bytes> for ReadResourceResult {
    /// Binary content becomes one base64 blob entry.
    #[inline]
    fn from(blob: Bytes) -> Self {
        Self {
            contents: vec![ResourceContents {
                uri: String::new(),
                mime: None,
                text: None,
                blob: Some(general_purpose::STANDARD.encode(blob)),
            }]
        }
    }
}

impl From<Vec<u8>> for ReadResourceResult {
    #[inline]
    fn from(blob: Vec<u8>) -> Self {
        Bytes::from(blob).into()
    }
}

impl<T: Serialize> TryFrom<Json<T>> for ReadResourceResult {
    type Error = Error;

    /// Structural content is JSON-serialized into one text entry.
    #[inline]
    fn try_from(value: Json<T>) -> Result<Self, Self::Error> {
        let text = serde_json::to_string(&value.0)?;
        Ok(Self {
            contents: vec![ResourceContents {
                uri: String::new(),
                mime: Some(JSON_MIME.into()),
                text: Some(text),
                blob: None,
            }]
        })
    }
}

impl TryFrom<Value> for ReadResourceResult {
    type Error = Error;

    #[inline]
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Json(value).try_into()
    }
}

impl ReadResourceResult {
    /// Creates a text resource result
    #[inline]
    pub fn text(uri: &str, mime: &str, text: &str) -> Self {
        Self {
            contents: vec![ResourceContents::text(uri, mime, text)]
        }
    }

    /// Creates a blob resource result
    #[inline]
    pub fn blob(uri: &str, mime: &str, blob: impl AsRef<[u8]>) -> Self {
        Self {
            contents: vec![ResourceContents::blob(uri, mime, blob)]
        }
    }

    /// Fills in the URI and MIME type of content entries the handler
    /// left unset
    pub(crate) fn fill_missing(mut self, uri: &str, mime: Option<&str>) -> Self {
        for content in &mut self.contents {
            if content.uri.is_empty() {
                content.uri = uri.to_owned();
            }
            if content.mime.is_none() {
                content.mime = mime
                    .map(ToOwned::to_owned)
                    .or_else(|| Some("text/plain".into()));
            }
        }
        self
    }
}

impl ResourceContents {
    /// Creates a text resource content
    #[inline]
    pub fn text(uri: &str, mime: &str, text: &str) -> Self {
        Self {
            uri: uri.into(),
            mime: Some(mime.into()),
            text: Some(text.into()),
            blob: None
        }
    }

    /// Creates a blob resource content
    #[inline]
    pub fn blob(uri: &str, mime: &str, blob: impl AsRef<[u8]>) -> ResourceContents {
        let blob = general_purpose::STANDARD.encode(blob);
        Self {
            uri: uri.into(),
            mime: Some(mime.into()),
            blob: Some(blob),
            text: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_creates_text_result() {
        let result = ReadResourceResult::text("/res1", "text/plain", "test 1");

        let json = serde_json::to_string(&result).unwrap();

        assert_eq!(json, r#"{"contents":[{"uri":"/res1","mimeType":"text/plain","text":"test 1"}]}"#);
    }

    #[test]
    fn it_creates_blob_result() {
        let result = ReadResourceResult::blob("/res1", "application/octet-stream", b"hi");

        let json = serde_json::to_string(&result).unwrap();

        assert_eq!(json, r#"{"contents":[{"uri":"/res1","mimeType":"application/octet-stream","blob":"aGk="}]}"#);
    }

    #[test]
    fn it_fills_missing_uri_and_mime() {
        let result: ReadResourceResult = "content".into();
        let result = result.fill_missing("res://x", None);

        let json = serde_json::to_string(&result).unwrap();

        assert_eq!(json, r#"{"contents":[{"uri":"res://x","mimeType":"text/plain","text":"content"}]}"#);
    }

    #[test]
    fn it_serializes_structural_content_as_json_text() {
        let result: ReadResourceResult = Json(serde_json::json!({ "id": 42 }))
            .try_into()
            .unwrap();
        let result = result.fill_missing("users://42", None);

        let content = &result.contents[0];
        assert_eq!(content.mime.as_deref(), Some("application/json"));
        assert_eq!(content.text.as_deref(), Some(r#"{"id":42}"#));
    }
}
