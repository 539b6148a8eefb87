//! Tool-related message types for MCP tool discovery and execution.
//!
//! This module provides types for:
//! - Tool discovery (`tools/list`, paginated)
//! - Tool execution (`tools/call`)
//! - Tool results, including tool-level failures reported via `isError`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Paginated;

/// One page of the server's tool list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListToolsResponse {
    /// Tools on this page
    pub tools: Vec<Tool>,

    /// Cursor for the next page; absent or empty on the last page
    #[serde(
        rename = "nextCursor",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub next_cursor: Option<String>,
}

impl Paginated for ListToolsResponse {
    type Item = Tool;

    fn into_page(self) -> (Vec<Tool>, Option<String>) {
        (self.tools, self.next_cursor)
    }
}

/// Tool definition as advertised by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    /// Unique name of the tool
    pub name: String,

    /// Human-readable description of what the tool does
    #[serde(default)]
    pub description: String,

    /// JSON Schema for the tool's arguments
    #[serde(
        rename = "inputSchema",
        alias = "input_schema",
        alias = "parametersSchema",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub input_schema: Option<Value>,

    /// Behavioural hints (read-only, destructive, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
}

impl Tool {
    /// Create a new tool definition.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: None,
            annotations: None,
        }
    }

    /// Set the input schema for this tool.
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

/// Parameters of a `tools/call` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallToolRequest {
    /// Name of the tool to invoke
    pub name: String,

    /// Arguments object for the tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// Result of a `tools/call` request.
///
/// A tool that ran but failed reports `isError: true` here; that is still a
/// successful JSON-RPC exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallToolResponse {
    /// Content produced by the tool
    #[serde(default)]
    pub content: Vec<ToolContent>,

    /// Whether the tool itself reported a failure
    #[serde(rename = "isError", default)]
    pub is_error: bool,

    /// Machine-readable result, when the tool declares an output schema
    #[serde(
        rename = "structuredContent",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub structured_content: Option<Value>,
}

impl CallToolResponse {
    /// Concatenate all text content items, one per line.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|item| match item {
                ToolContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A content item in a tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    /// Plain text
    Text {
        /// The text itself
        text: String,
    },

    /// Base64 encoded image
    Image {
        /// Base64 payload
        data: String,
        /// MIME type, e.g. `image/png`
        #[serde(rename = "mimeType")]
        mime_type: String,
    },

    /// Base64 encoded audio
    Audio {
        /// Base64 payload
        data: String,
        /// MIME type, e.g. `audio/wav`
        #[serde(rename = "mimeType")]
        mime_type: String,
    },

    /// Resource embedded in the result
    Resource {
        /// The embedded resource contents
        resource: EmbeddedResource,
    },

    /// Reference to a resource the client can fetch separately
    ResourceLink(ResourceLink),

    /// A content type this client does not model; the item is skipped
    #[serde(other)]
    Unsupported,
}

/// Link to a resource, returned instead of its contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLink {
    /// URI of the resource
    pub uri: String,

    /// Programmatic name of the resource
    pub name: String,

    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Size of the raw contents in bytes, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Resource contents embedded in tool results and prompt messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedResource {
    /// URI of the resource
    pub uri: String,

    /// MIME type of the contents
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Text contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Base64 encoded binary contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_schema_field_names() {
        let camel: Tool = serde_json::from_value(json!({
            "name": "echo",
            "description": "Echo text",
            "inputSchema": {"type": "object"}
        }))
        .unwrap();
        assert_eq!(camel.input_schema, Some(json!({"type": "object"})));

        let snake: Tool = serde_json::from_value(json!({
            "name": "echo",
            "input_schema": {"type": "object"}
        }))
        .unwrap();
        assert_eq!(snake.input_schema, Some(json!({"type": "object"})));
        assert_eq!(snake.description, "");

        let bare: Tool = serde_json::from_value(json!({"name": "noop"})).unwrap();
        assert!(bare.input_schema.is_none());
    }

    #[test]
    fn test_tool_serializes_camel_case() {
        let tool = Tool::new("add", "Add numbers").with_input_schema(json!({"type": "object"}));
        let value = serde_json::to_value(&tool).unwrap();

        assert_eq!(value["inputSchema"], json!({"type": "object"}));
        assert!(value.get("annotations").is_none());
    }

    #[test]
    fn test_list_page_cursor() {
        let page: ListToolsResponse = serde_json::from_value(json!({
            "tools": [{"name": "a"}],
            "nextCursor": "p2"
        }))
        .unwrap();

        let (tools, cursor) = page.into_page();
        assert_eq!(tools.len(), 1);
        assert_eq!(cursor.as_deref(), Some("p2"));
    }

    #[test]
    fn test_call_tool_response_with_error_flag() {
        let response: CallToolResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "division by zero"},
                {"type": "image", "data": "AAAA", "mimeType": "image/png"}
            ],
            "isError": true
        }))
        .unwrap();

        assert!(response.is_error);
        assert_eq!(response.content.len(), 2);
        assert_eq!(response.text(), "division by zero");
    }

    #[test]
    fn test_resource_link_and_unknown_content() {
        let response: CallToolResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "found 1 file"},
                {
                    "type": "resource_link",
                    "uri": "file:///project/src/main.rs",
                    "name": "main.rs",
                    "mimeType": "text/x-rust",
                    "size": 512
                },
                {"type": "hologram", "frames": 3}
            ]
        }))
        .unwrap();

        assert_eq!(response.content.len(), 3);
        assert_eq!(response.text(), "found 1 file");
        match &response.content[1] {
            ToolContent::ResourceLink(link) => {
                assert_eq!(link.uri, "file:///project/src/main.rs");
                assert_eq!(link.name, "main.rs");
                assert_eq!(link.mime_type.as_deref(), Some("text/x-rust"));
                assert_eq!(link.size, Some(512));
            }
            other => panic!("expected resource link, got {other:?}"),
        }
        assert_eq!(response.content[2], ToolContent::Unsupported);
    }

    #[test]
    fn test_embedded_resource_content() {
        let content: ToolContent = serde_json::from_value(json!({
            "type": "resource",
            "resource": {"uri": "file:///tmp/a.txt", "mimeType": "text/plain", "text": "hi"}
        }))
        .unwrap();

        match content {
            ToolContent::Resource { resource } => {
                assert_eq!(resource.uri, "file:///tmp/a.txt");
                assert_eq!(resource.text.as_deref(), Some("hi"));
            }
            other => panic!("expected resource content, got {other:?}"),
        }
    }
}
