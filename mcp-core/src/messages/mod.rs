//! MCP message types and JSON-RPC structures used by the client.
//!
//! # Message Categories
//!
//! - **Core Messages**: JSON-RPC request/response/notification envelopes
//! - **Initialization**: Protocol version negotiation and capability discovery
//! - **Tools**: Tool discovery and execution
//! - **Prompts**: Prompt templates and rendering
//! - **Resources**: Resource listing
//!
//! List operations are paginated; each list response implements [`Paginated`]
//! so that a single loop can drain any of them.
//!
//! # Examples
//!
//! ```rust
//! use mcp_core::messages::{Implementation, InitializeRequest, JsonRpcRequest, ProtocolVersion};
//!
//! let init_request = InitializeRequest {
//!     protocol_version: ProtocolVersion::V2025_03_26,
//!     capabilities: Default::default(),
//!     client_info: Implementation::new("mcp-cli", "0.3.0"),
//! };
//!
//! let request = JsonRpcRequest::new(
//!     1i64,
//!     "initialize",
//!     serde_json::to_value(init_request).unwrap(),
//! );
//! assert_eq!(request.method, "initialize");
//! ```

pub mod core;
pub mod initialization;
pub mod prompts;
pub mod resources;
pub mod tools;

pub use core::*;
pub use initialization::*;
pub use prompts::{
    GetPromptRequest, GetPromptResponse, ListPromptsResponse, MessageRole, Prompt,
    PromptArgument, PromptContent, PromptMessage,
};
pub use resources::{ListResourcesResponse, Resource};
pub use tools::{
    CallToolRequest, CallToolResponse, EmbeddedResource, ListToolsResponse, ResourceLink, Tool,
    ToolContent,
};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// JSON-RPC method names spoken by the client.
pub mod methods {
    /// Handshake request
    pub const INITIALIZE: &str = "initialize";
    /// Handshake completion notification
    pub const INITIALIZED: &str = "notifications/initialized";
    /// Liveness check
    pub const PING: &str = "ping";
    /// Paginated tool listing
    pub const TOOLS_LIST: &str = "tools/list";
    /// Tool invocation
    pub const TOOLS_CALL: &str = "tools/call";
    /// Paginated prompt listing
    pub const PROMPTS_LIST: &str = "prompts/list";
    /// Prompt rendering
    pub const PROMPTS_GET: &str = "prompts/get";
    /// Paginated resource listing
    pub const RESOURCES_LIST: &str = "resources/list";
    /// Server notice that its tool set changed
    pub const TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";
}

/// MCP protocol version identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// MCP Protocol version 2024-11-05 (HTTP+SSE era)
    #[serde(rename = "2024-11-05")]
    V2024_11_05,

    /// MCP Protocol version 2025-03-26 (introduces Streamable HTTP)
    #[serde(rename = "2025-03-26")]
    V2025_03_26,

    /// MCP Protocol version 2025-06-18
    #[serde(rename = "2025-06-18")]
    V2025_06_18,

    /// Version string this client does not know about
    #[serde(untagged)]
    Custom(String),
}

impl ProtocolVersion {
    /// Get the string representation of the protocol version.
    pub fn as_str(&self) -> &str {
        match self {
            Self::V2024_11_05 => "2024-11-05",
            Self::V2025_03_26 => "2025-03-26",
            Self::V2025_06_18 => "2025-06-18",
            Self::Custom(version) => version,
        }
    }

    /// Check if this version is known to the client.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::V2025_03_26
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Capabilities exchanged during initialization.
///
/// The client declares an empty set; the server's set decides whether a
/// notification listener is worth starting (see
/// [`Capabilities::emits_notifications`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Capabilities {
    /// Server can provide tools for execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,

    /// Server can provide resources for reading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceCapabilities>,

    /// Server can provide prompt templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<PromptCapabilities>,

    /// Server can send log messages to the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingCapabilities>,

    /// Custom or experimental capabilities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experimental: Option<HashMap<String, serde_json::Value>>,
}

impl Capabilities {
    /// Whether the server advertised anything it would push as a notification.
    ///
    /// True when any of tools, prompts or resources sets `listChanged`, when
    /// resources support `subscribe`, or when logging is present.
    pub fn emits_notifications(&self) -> bool {
        let tools = self
            .tools
            .as_ref()
            .and_then(|t| t.list_changed)
            .unwrap_or(false);
        let prompts = self
            .prompts
            .as_ref()
            .and_then(|p| p.list_changed)
            .unwrap_or(false);
        let resources = self.resources.as_ref().is_some_and(|r| {
            r.list_changed.unwrap_or(false) || r.subscribe.unwrap_or(false)
        });

        tools || prompts || resources || self.logging.is_some()
    }
}

/// Tool-related capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ToolCapabilities {
    /// Whether the server notifies when its tool list changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Resource-related capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCapabilities {
    /// Whether the server supports subscribing to resource changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<bool>,

    /// Whether the server notifies when its resource list changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Prompt-related capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PromptCapabilities {
    /// Whether the server notifies when its prompt list changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Logging-related capabilities. Presence alone is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LoggingCapabilities {}

/// Implementation information for client or server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    /// Name of the implementation (e.g., "mcp-cli")
    pub name: String,

    /// Version of the implementation (e.g., "0.3.0")
    pub version: String,

    /// Additional implementation metadata (title, website, ...)
    #[serde(flatten)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Implementation {
    /// Create a new implementation info structure.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            metadata: HashMap::new(),
        }
    }
}

/// Parameters of a paginated list request.
///
/// The first page is requested without parameters at all; later pages carry
/// the opaque cursor returned by the previous page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedRequest {
    /// Opaque cursor from the previous page's `nextCursor`
    pub cursor: String,
}

impl PaginatedRequest {
    /// Build request parameters for the page after `cursor`.
    pub fn new(cursor: impl Into<String>) -> Self {
        Self {
            cursor: cursor.into(),
        }
    }
}

/// A single page of a paginated list result.
pub trait Paginated: DeserializeOwned {
    /// Element type collected across pages
    type Item;

    /// Split the page into its items and the cursor of the next page.
    fn into_page(self) -> (Vec<Self::Item>, Option<String>);
}
