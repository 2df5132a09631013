//! Per-component authorization predicates

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use serde_json::Value;
use crate::auth::AuthenticatedUser;

/// A pure function that gates visibility and invocation of a single
/// registered component
pub type Predicate = Arc<
    dyn Fn(&AuthorizationContext<'_>) -> bool
    + Send
    + Sync
>;

/// The kind of a registered component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// A callable tool
    Tool,
    /// A URI-addressed resource or resource template
    Resource,
    /// A message-generating prompt
    Prompt,
}

/// The action a caller attempts on a component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    /// `tools/call`
    Call,
    /// `resources/read`
    Read,
    /// `prompts/get`
    Get,
}

/// Everything a predicate may inspect about a single authorization decision
#[derive(Debug)]
pub struct AuthorizationContext<'a> {
    /// The authenticated caller.
    pub user: &'a AuthenticatedUser,

    /// The kind of the component being accessed.
    pub component: ComponentKind,

    /// The component's name (or URI / URI template for resources).
    pub name: &'a str,

    /// The attempted action.
    pub action: AuthAction,

    /// The call arguments, when the action carries any.
    pub arguments: Option<&'a HashMap<String, Value>>,

    /// The caller's workspace, if any.
    pub workspace: Option<&'a str>,
}

/// Evaluates a component's predicate for the given caller.
///
/// A component without a predicate is always allowed. A predicate-bearing
/// component is denied to callers without an attached user; the predicate is
/// only ever evaluated with a user present.
pub(crate) fn is_allowed(
    predicate: Option<&Predicate>,
    user: Option<&AuthenticatedUser>,
    component: ComponentKind,
    name: &str,
    action: AuthAction,
    arguments: Option<&HashMap<String, Value>>,
    workspace: Option<&str>,
) -> bool {
    match (predicate, user) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(predicate), Some(user)) => predicate(&AuthorizationContext {
            user,
            component,
            name,
            action,
            arguments,
            workspace,
        }),
    }
}

impl Display for ComponentKind {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Tool => write!(f, "tool"),
            ComponentKind::Resource => write!(f, "resource"),
            ComponentKind::Prompt => write!(f, "prompt"),
        }
    }
}

impl Display for AuthAction {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AuthAction::Call => write!(f, "call"),
            AuthAction::Read => write!(f, "read"),
            AuthAction::Get => write!(f, "get"),
        }
    }
}
