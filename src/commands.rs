//! Core MCP command names

/// Command name that performs the initialization handshake.
pub const INIT: &str = "initialize";

/// Command name a client may send after the handshake has completed.
pub const INITIALIZED: &str = "initialized";

/// Command name that checks server liveness.
pub const PING: &str = "ping";

/// Methods that are legal before the `initialize` handshake has completed.
pub(crate) const PRE_INIT: [&str; 7] = [
    INIT,
    INITIALIZED,
    PING,
    crate::types::tool::commands::LIST,
    crate::types::resource::commands::LIST,
    crate::types::resource::commands::TEMPLATES_LIST,
    crate::types::prompt::commands::LIST,
];

/// Methods that skip authentication regardless of provider presence.
pub(crate) const PUBLIC: [&str; 3] = [INIT, INITIALIZED, PING];
