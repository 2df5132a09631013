//! A credential-carrying facade over any transport request

use std::collections::HashMap;
use bytes::Bytes;
use serde_json::Value;

const AUTHORIZATION: &str = "authorization";
const API_TOKEN: &str = "x-api-token";
const BEARER_PREFIX: &str = "bearer ";
const DEFAULT_QUERY_PARAM: &str = "key";

/// A normalized view of an incoming transport request, used for
/// credential extraction. Header names are lowercased.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Option<Bytes>,
    extra: HashMap<String, Value>,
}

impl AuthRequest {
    /// Creates an empty [`AuthRequest`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header; the name is lowercased
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_lowercase(), value.into());
        self
    }

    /// Adds a query parameter
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Sets the raw request body
    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds a transport-specific extra
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Returns a header value by its case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    /// Returns a query parameter value
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(String::as_str)
    }

    /// Returns the raw request body, if the transport provided one
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Returns a transport-specific extra
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Extracts the token part of an `authorization` header whose value
    /// starts (case-insensitively) with `bearer `
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.header(AUTHORIZATION)?;
        if value.len() > BEARER_PREFIX.len() &&
            value[..BEARER_PREFIX.len()].eq_ignore_ascii_case(BEARER_PREFIX) {
            Some(value[BEARER_PREFIX.len()..].trim())
        } else {
            None
        }
    }

    /// Returns the value of the `x-api-token` header
    pub fn api_token(&self) -> Option<&str> {
        self.header(API_TOKEN)
    }

    /// Returns the value of the given query parameter
    pub fn query_token(&self, param: &str) -> Option<&str> {
        self.query(param)
    }

    /// Returns the first non-empty of the API token, the bearer token and
    /// the `key` query parameter, in that precedence order
    pub fn token(&self) -> Option<&str> {
        let non_empty = |token: &&str| !token.is_empty();
        self.api_token().filter(non_empty)
            .or_else(|| self.bearer_token().filter(non_empty))
            .or_else(|| self.query_token(DEFAULT_QUERY_PARAM).filter(non_empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_lowercases_header_names() {
        let req = AuthRequest::new().with_header("X-API-TOKEN", "secret");

        assert_eq!(req.header("x-api-token"), Some("secret"));
        assert_eq!(req.api_token(), Some("secret"));
    }

    #[test]
    fn it_extracts_bearer_tokens_case_insensitively() {
        let req = AuthRequest::new().with_header("Authorization", "Bearer abc123");

        assert_eq!(req.bearer_token(), Some("abc123"));

        let req = AuthRequest::new().with_header("authorization", "BEARER abc123");

        assert_eq!(req.bearer_token(), Some("abc123"));
    }

    #[test]
    fn it_rejects_non_bearer_authorization() {
        let req = AuthRequest::new().with_header("authorization", "Basic abc123");

        assert_eq!(req.bearer_token(), None);
    }

    #[test]
    fn it_reads_query_tokens() {
        let req = AuthRequest::new().with_query("key", "qtoken");

        assert_eq!(req.query_token("key"), Some("qtoken"));
        assert_eq!(req.token(), Some("qtoken"));
    }

    #[test]
    fn it_prefers_api_token_over_bearer_and_query() {
        let req = AuthRequest::new()
            .with_header("x-api-token", "api")
            .with_header("authorization", "Bearer bearer")
            .with_query("key", "query");

        assert_eq!(req.token(), Some("api"));
    }

    #[test]
    fn it_falls_back_to_bearer_when_api_token_is_absent() {
        let req = AuthRequest::new()
            .with_header("authorization", "Bearer bearer")
            .with_query("key", "query");

        assert_eq!(req.token(), Some("bearer"));
    }

    #[test]
    fn it_returns_none_when_no_credentials_are_present() {
        assert_eq!(AuthRequest::new().token(), None);
    }
}
