//! Types that describes server and client capabilities

use std::collections::HashMap;
use serde::{Deserialize, Serialize};

/// Represents the capabilities that a client may support.
///
/// See the [schema](https://github.com/modelcontextprotocol/specification/blob/main/schema/) for details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCapabilities {
    /// Experimental, non-standard capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<HashMap<String, serde_json::Value>>,
}

/// Represents the capabilities that a server may support.
///
/// A capability key is present exactly when the server has at least one
/// component registered in that category.
///
/// See the [schema](https://github.com/modelcontextprotocol/specification/blob/main/schema/) for details
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Present if the server offers any tools to call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,

    /// Present if the server offers any resources to read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesCapability>,

    /// Present if the server offers any prompt templates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<PromptsCapability>,
}

/// Represents the tools capability configuration.
#[derive(Default, Debug, Clone, Serialize)]
pub struct ToolsCapability {
    // Currently empty in the spec, but may be extended in the future
}

/// Represents the resources capability configuration.
#[derive(Default, Debug, Clone, Serialize)]
pub struct ResourcesCapability {
    // Currently empty in the spec, but may be extended in the future
}

/// Represents the prompts capability configuration.
#[derive(Default, Debug, Clone, Serialize)]
pub struct PromptsCapability {
    // Currently empty in the spec, but may be extended in the future
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_serializes_only_present_capabilities() {
        let capabilities = ServerCapabilities {
            tools: Some(ToolsCapability::default()),
            resources: None,
            prompts: None,
        };

        let json = serde_json::to_string(&capabilities).unwrap();

        assert_eq!(json, r#"{"tools":{}}"#);
    }
}
