//! MCP initialization handshake message types.
//!
//! The handshake runs exactly once per session:
//! 1. Client sends `initialize` with its protocol version, capabilities and identity
//! 2. Server replies with its own version, capabilities and identity
//! 3. Client sends the `notifications/initialized` notification
//!
//! # Examples
//!
//! ```rust
//! use mcp_core::messages::{InitializeRequest, Implementation};
//!
//! let request = InitializeRequest::for_client(Implementation::new("mcp-cli", "0.3.0"));
//! assert!(request.capabilities.tools.is_none());
//! ```

use super::{Capabilities, Implementation, ProtocolVersion};
use serde::{Deserialize, Serialize};

/// Client-to-server initialization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeRequest {
    /// Protocol version requested by the client
    #[serde(rename = "protocolVersion")]
    pub protocol_version: ProtocolVersion,

    /// Capabilities offered by the client
    pub capabilities: Capabilities,

    /// Information about the client implementation
    #[serde(rename = "clientInfo")]
    pub client_info: Implementation,
}

impl InitializeRequest {
    /// Initialization request for the default protocol version and no
    /// client-side capabilities.
    pub fn for_client(client_info: Implementation) -> Self {
        Self {
            protocol_version: ProtocolVersion::default(),
            capabilities: Capabilities::default(),
            client_info,
        }
    }
}

/// Server-to-client initialization response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeResponse {
    /// Protocol version that will be used for the session
    #[serde(rename = "protocolVersion")]
    pub protocol_version: ProtocolVersion,

    /// Capabilities offered by the server
    #[serde(default)]
    pub capabilities: Capabilities,

    /// Information about the server implementation
    #[serde(rename = "serverInfo")]
    pub server_info: Implementation,

    /// Optional usage instructions for the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initialize_request_wire_format() {
        let request = InitializeRequest::for_client(Implementation::new("mcp-cli", "0.3.0"));
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": {"name": "mcp-cli", "version": "0.3.0"}
            })
        );
    }

    #[test]
    fn test_initialize_response_parsing() {
        let response: InitializeResponse = serde_json::from_value(json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {"tools": {"listChanged": true}, "logging": {}},
            "serverInfo": {"name": "example-server", "version": "1.0.0"},
            "instructions": "Call echo first"
        }))
        .unwrap();

        assert_eq!(response.protocol_version, ProtocolVersion::V2024_11_05);
        assert_eq!(response.server_info.name, "example-server");
        assert!(response.capabilities.emits_notifications());
        assert_eq!(response.instructions.as_deref(), Some("Call echo first"));
    }

    #[test]
    fn test_initialize_response_without_capabilities() {
        let response: InitializeResponse = serde_json::from_value(json!({
            "protocolVersion": "2025-03-26",
            "serverInfo": {"name": "bare", "version": "0.0.1"}
        }))
        .unwrap();

        assert_eq!(response.capabilities, Capabilities::default());
    }
}
