//! Represents a notification message

use serde::{Serialize, Deserialize};
use serde_json::Value;
use crate::types::JSONRPC_VERSION;

/// List of notification methods the server reacts to
pub mod commands {
    /// Sent by the client once initialization has completed.
    pub const INITIALIZED: &str = "notifications/initialized";

    /// Sent by the client to cancel an in-flight request.
    pub const CANCELLED: &str = "notifications/cancelled";

    /// Sent by the client to report progress on a long-running request.
    pub const PROGRESS: &str = "notifications/progress";
}

/// A notification in the JSON-RPC protocol: a request without an `id`,
/// for which no response is produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// JSON-RPC protocol version.
    ///
    /// > Note: always 2.0.
    pub jsonrpc: String,

    /// Name of the notification method.
    pub method: String,

    /// Optional parameters for the method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Notification {
    /// Creates a new [`Notification`]
    pub fn new(method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            method: method.into(),
            params,
        }
    }
}

/// Parameters of a `notifications/cancelled` message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelledNotificationParams {
    /// The id of the request being cancelled.
    #[serde(rename = "requestId")]
    pub request_id: crate::types::RequestId,

    /// An optional human-readable reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_serializes_notification() {
        let notification = Notification::new(
            commands::CANCELLED,
            Some(serde_json::json!({ "requestId": 2 })));

        let json = serde_json::to_string(&notification).unwrap();

        assert_eq!(json, r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":2}}"#);
    }
}
