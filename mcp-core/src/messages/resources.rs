//! Resource-related message types for MCP resource discovery.

use serde::{Deserialize, Serialize};

use super::Paginated;

/// One page of the server's resource list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResourcesResponse {
    /// Resources on this page
    pub resources: Vec<Resource>,

    /// Cursor for the next page; absent or empty on the last page
    #[serde(
        rename = "nextCursor",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub next_cursor: Option<String>,
}

impl Paginated for ListResourcesResponse {
    type Item = Resource;

    fn into_page(self) -> (Vec<Resource>, Option<String>) {
        (self.resources, self.next_cursor)
    }
}

/// Resource advertised by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique URI identifying the resource
    pub uri: String,

    /// Human-readable name of the resource
    pub name: String,

    /// Description of what the resource contains
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// MIME type of the resource content
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Size of the raw content in bytes, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_wire_names() {
        let page: ListResourcesResponse = serde_json::from_value(json!({
            "resources": [
                {"uri": "file:///etc/motd", "name": "motd", "mimeType": "text/plain", "size": 42}
            ]
        }))
        .unwrap();

        assert!(page.next_cursor.is_none());
        assert_eq!(page.resources[0].mime_type.as_deref(), Some("text/plain"));
        assert_eq!(page.resources[0].size, Some(42));
    }
}
