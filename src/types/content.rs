//! Text and image content utilities

use serde::{Deserialize, Serialize};

/// Represents a content block of a response message.
///
/// See the [schema](https://github.com/modelcontextprotocol/specification/blob/main/schema/) for details
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Content {
    /// Text content
    #[serde(rename = "text")]
    Text(TextContent),

    /// Image content
    #[serde(rename = "image")]
    Image(ImageContent),
}

/// Text provided to or from an LLM.
///
/// See the [schema](https://github.com/modelcontextprotocol/specification/blob/main/schema) for details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    /// The text content of the message.
    pub text: String,
}

/// An image provided to or from an LLM.
///
/// See the [schema](https://github.com/modelcontextprotocol/specification/blob/main/schema) for details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageContent {
    /// The base64-encoded image data.
    pub data: String,

    /// The MIME type of the image content, e.g. "image/jpeg" or "image/png".
    #[serde(rename = "mimeType")]
    pub mime: String,
}

impl From<&str> for Content {
    #[inline]
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for Content {
    #[inline]
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl Content {
    /// Creates a text content block
    #[inline]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextContent { text: text.into() })
    }

    /// Creates an image content block from base64-encoded data
    #[inline]
    pub fn image(data: impl Into<String>, mime: impl Into<String>) -> Self {
        Self::Image(ImageContent {
            data: data.into(),
            mime: mime.into()
        })
    }

    /// Creates a text content block holding the JSON form of `data`
    #[inline]
    pub fn json<T: Serialize>(data: &T) -> Self {
        match serde_json::to_string(data) {
            Ok(json) => Self::text(json),
            Err(err) => Self::text(err.to_string()),
        }
    }

    /// Returns a reference to the inner [`TextContent`] if this is a text block
    #[inline]
    pub fn as_text(&self) -> Option<&TextContent> {
        if let Content::Text(text) = self {
            Some(text)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_serializes_text_content() {
        let content = Content::text("hi");

        let json = serde_json::to_string(&content).unwrap();

        assert_eq!(json, r#"{"type":"text","text":"hi"}"#);
    }

    #[test]
    fn it_serializes_image_content() {
        let content = Content::image("aGk=", "image/png");

        let json = serde_json::to_string(&content).unwrap();

        assert_eq!(json, r#"{"type":"image","data":"aGk=","mimeType":"image/png"}"#);
    }

    #[test]
    fn it_serializes_structural_data_as_text() {
        let content = Content::json(&serde_json::json!({ "x": 5 }));

        let json = serde_json::to_string(&content).unwrap();

        assert_eq!(json, r#"{"type":"text","text":"{\"x\":5}"}"#);
    }
}
