//! Authentication and authorization layer

use std::collections::{HashMap, HashSet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use request::AuthRequest;
pub use authorize::{AuthAction, AuthorizationContext, ComponentKind, Predicate};

pub mod request;
pub mod authorize;

/// The outcome of an authentication attempt
#[derive(Debug, Clone)]
pub enum AuthResult {
    /// The credentials resolved to a user.
    Success {
        /// The authenticated user.
        user: AuthenticatedUser,
        /// An optional workspace override; falls back to the user's own.
        workspace: Option<String>,
    },

    /// The credentials were present but invalid.
    Failed(String),

    /// No credentials were presented.
    Unauthenticated,
}

/// An authentication provider that resolves transport credentials to a user.
///
/// Implementations may read headers, query parameters or transport-specific
/// extras, and may perform I/O.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Authenticates a single request
    async fn authenticate(&self, request: &AuthRequest) -> AuthResult;
}

/// A user resolved by an [`AuthProvider`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Unique user identifier.
    pub id: String,

    /// Display name, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Email address, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Privilege level; lower is more privileged.
    pub level: i32,

    /// Granted scope patterns, e.g. `"tools:echo"`, `"tools:*"`, `"*:*"`.
    /// An empty set means no scope restrictions apply.
    pub scopes: HashSet<String>,

    /// Workspace the user belongs to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,

    /// Free-form provider-specific data.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, Value>,
}

impl AuthenticatedUser {
    /// Creates a new [`AuthenticatedUser`] with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
            level: 100,
            scopes: HashSet::new(),
            workspace: None,
            extra: HashMap::new(),
        }
    }

    /// Sets the privilege level
    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    /// Sets the granted scopes
    pub fn with_scopes<T, I>(mut self, scopes: T) -> Self
    where
        T: IntoIterator<Item = I>,
        I: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the workspace
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    /// Returns `true` when the user holds the required scope.
    ///
    /// A scope `"cat:action"` is held when the user's scopes contain
    /// `"*:*"`, the scope itself, or the category wildcard `"cat:*"`.
    pub fn has_scope(&self, required: &str) -> bool {
        if self.scopes.contains("*:*") || self.scopes.contains(required) {
            return true;
        }
        required
            .split_once(':')
            .is_some_and(|(category, _)| self.scopes.contains(&format!("{category}:*")))
    }

    /// Returns `true` when the user's level is at least as privileged
    /// as `required` (lower is more privileged)
    pub fn has_level(&self, required: i32) -> bool {
        self.level <= required
    }
}
