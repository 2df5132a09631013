//! Types and utils for prompt request results

use serde::{Serialize, Deserialize};
use crate::error::Error;
use crate::types::{Content, IntoResponse, RequestId, Response, Role};

/// The server's response to a prompts/get request from the client.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetPromptResult {
    /// An optional description for the prompt.
    #[serde(rename = "description", skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,

    /// The prompt or prompt template that the server offers.
    pub messages: Vec<PromptMessage>,
}

/// Describes a message returned as part of a prompt.
#[derive(Debug, Serialize, Deserialize)]
pub struct PromptMessage {
    /// The role of the message ("user" or "assistant").
    pub role: Role,

    /// The content of the message.
    pub content: Content,
}

impl IntoResponse for GetPromptResult {
    fn into_response(self, req_id: RequestId) -> Response {
        match serde_json::to_value(self) {
            Ok(v) => Response::success(req_id, v),
            Err(err) => Response::error(req_id, err.into())
        }
    }
}

impl<T1, T2> From<(T1, T2)> for PromptMessage
where
    T1: Into<Content>,
    T2: Into<Role>
{
    #[inline]
    fn from((msg, role): (T1, T2)) -> Self {
        Self::new(role).with(msg)
    }
}

impl<T> From<T> for GetPromptResult
where
    T: Into<PromptMessage>
{
    #[inline]
    fn from(msg: T) -> Self {
        Self { descr: None, messages: vec![msg.into()] }
    }
}

impl<T, E> TryFrom<Result<T, E>> for GetPromptResult
where
    T: Into<GetPromptResult>,
    E: Into<Error>
{
    type Error = E;

    #[inline]
    fn try_from(value: Result<T, E>) -> Result<Self, Self::Error> {
        match value {
            Ok(ok) => Ok(ok.into()),
            Err(err) => Err(err)
        }
    }
}

impl<T> From<Vec<T>> for GetPromptResult
where
    T: Into<PromptMessage>
{
    #[inline]
    fn from(iter: Vec<T>) -> Self {
        Self {
            descr: None,
            messages: iter
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

impl<const N: usize, T> From<[T; N]> for GetPromptResult
where
    T: Into<PromptMessage>
{
    #[inline]
    fn from(iter: [T; N]) -> Self {
        Self {
            descr: None,
            messages: iter
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

impl PromptMessage {
    /// Creates a new [`PromptMessage`]
    #[inline]
    pub fn new(role: impl Into<Role>) -> Self {
        Self {
            content: Content::text(""),
            role: role.into()
        }
    }

    /// Creates a new [`PromptMessage`] with the user role
    pub fn user() -> Self {
        Self::new(Role::User)
    }

    /// Creates a new [`PromptMessage`] with the assistant role
    pub fn assistant() -> Self {
        Self::new(Role::Assistant)
    }

    /// Sets the content of [`PromptMessage`]
    pub fn with<T: Into<Content>>(mut self, content: T) -> Self {
        self.content = content.into();
        self
    }
}

impl GetPromptResult {
    /// Creates a new [`GetPromptResult`]
    #[inline]
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            descr: None
        }
    }

    /// Sets the description of the result
    pub fn with_descr<T: Into<String>>(mut self, descr: T) -> Self {
        self.descr = Some(descr.into());
        self
    }

    /// Adds a message to the result
    pub fn with_message<T: Into<PromptMessage>>(mut self, message: T) -> Self {
        self.messages.push(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_converts_text_and_role_tuple() {
        let result: GetPromptResult = ("hello", Role::User).into();

        let json = serde_json::to_string(&result).unwrap();

        assert_eq!(json, r#"{"messages":[{"role":"user","content":{"type":"text","text":"hello"}}]}"#);
    }

    #[test]
    fn it_converts_message_lists() {
        let result: GetPromptResult = [
            ("question", Role::User),
            ("answer", Role::Assistant),
        ].into();

        assert_eq!(result.messages.len(), 2);
    }

    #[test]
    fn it_carries_an_optional_description() {
        let result = GetPromptResult::new()
            .with_descr("greeting")
            .with_message(("hi", Role::User));

        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["description"], "greeting");
    }
}
