//! Prompt-related message types for MCP prompt templates.
//!
//! This module provides types for:
//! - Prompt discovery (`prompts/list`, paginated)
//! - Prompt rendering with string arguments (`prompts/get`)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::tools::{EmbeddedResource, ResourceLink};
use super::Paginated;

/// One page of the server's prompt list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPromptsResponse {
    /// Prompts on this page
    pub prompts: Vec<Prompt>,

    /// Cursor for the next page; absent or empty on the last page
    #[serde(
        rename = "nextCursor",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub next_cursor: Option<String>,
}

impl Paginated for ListPromptsResponse {
    type Item = Prompt;

    fn into_page(self) -> (Vec<Prompt>, Option<String>) {
        (self.prompts, self.next_cursor)
    }
}

/// Prompt template advertised by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Unique name of the prompt
    pub name: String,

    /// Human-readable description of the prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Arguments the template accepts
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

impl Prompt {
    /// Names of arguments the server marks as required.
    pub fn required_arguments(&self) -> impl Iterator<Item = &str> {
        self.arguments
            .iter()
            .filter(|arg| arg.required)
            .map(|arg| arg.name.as_str())
    }
}

/// A single templated argument of a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptArgument {
    /// Argument name
    pub name: String,

    /// What the argument is for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the template cannot be rendered without it
    #[serde(default)]
    pub required: bool,
}

/// Parameters of a `prompts/get` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPromptRequest {
    /// Name of the prompt to render
    pub name: String,

    /// String arguments substituted into the template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<HashMap<String, String>>,
}

/// Rendered prompt returned by `prompts/get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPromptResponse {
    /// Description of the rendered prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Rendered conversation messages
    #[serde(default)]
    pub messages: Vec<PromptMessage>,
}

/// A message in a rendered prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Speaker of the message
    pub role: MessageRole,

    /// Content of the message
    pub content: PromptContent,
}

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message (human input)
    User,
    /// Assistant message (model output)
    Assistant,
}

/// Content of a prompt message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromptContent {
    /// Text content
    Text {
        /// The text content
        text: String,
    },

    /// Base64 encoded image
    Image {
        /// Base64 payload
        data: String,
        /// MIME type of the image
        #[serde(rename = "mimeType")]
        mime_type: String,
    },

    /// Base64 encoded audio
    Audio {
        /// Base64 payload
        data: String,
        /// MIME type of the clip
        #[serde(rename = "mimeType")]
        mime_type: String,
    },

    /// Embedded resource
    Resource {
        /// The embedded resource contents
        resource: EmbeddedResource,
    },

    /// Link to a resource
    ResourceLink(ResourceLink),

    /// Content type not modelled here
    #[serde(other)]
    Unsupported,
}
