//! MCP transports over HTTP.
//!
//! Two wire variants are supported:
//! - **Streamable HTTP**: every message is a POST to the endpoint; replies
//!   come back as a JSON body or as a short SSE stream, and the server may
//!   assign an `Mcp-Session-Id`.
//! - **HTTP+SSE (legacy)**: a long-lived GET event stream announces a
//!   message endpoint; requests are POSTed there and their responses arrive
//!   asynchronously on the stream.
//!
//! The client picks one during the handshake and keeps it for the rest of
//! the session as an [`ActiveTransport`].

pub mod http;
pub(crate) mod pending;
pub mod sse;
pub mod streamable;

pub use http::{HttpContext, SESSION_ID_HEADER};
pub use sse::SseTransport;
pub use streamable::StreamableHttpTransport;

use std::sync::Arc;

use async_trait::async_trait;
use eventsource_stream::Event;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::McpResult;
use crate::messages::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Wire variant in use for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Streamable HTTP (protocol 2025-03-26 and later)
    StreamableHttp,
    /// HTTP+SSE (protocol 2024-11-05)
    Sse,
}

impl TransportKind {
    /// Short name used in logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StreamableHttp => "streamable-http",
            Self::Sse => "sse",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request/response exchange over one wire variant.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and wait for the response carrying the same id.
    async fn request(&self, request: JsonRpcRequest) -> McpResult<JsonRpcResponse>;

    /// Send a notification. Only the HTTP status is checked.
    async fn notify(&self, notification: JsonRpcNotification) -> McpResult<()>;

    /// Release server-side and local resources. Safe to call more than once.
    async fn close(&self) -> McpResult<()>;

    /// Which wire variant this is.
    fn kind(&self) -> TransportKind;

    /// Session id assigned by the server, if any.
    fn session_id(&self) -> Option<String> {
        None
    }

    /// False once a long-lived connection the transport depends on has
    /// dropped. A disconnected transport fails every further request.
    fn is_connected(&self) -> bool {
        true
    }
}

/// The transport chosen by negotiation.
#[derive(Clone)]
pub enum ActiveTransport {
    /// Streamable HTTP
    Streamable(Arc<StreamableHttpTransport>),
    /// Legacy HTTP+SSE
    Sse(Arc<SseTransport>),
}

impl ActiveTransport {
    fn inner(&self) -> &dyn Transport {
        match self {
            Self::Streamable(transport) => transport.as_ref(),
            Self::Sse(transport) => transport.as_ref(),
        }
    }

    /// See [`Transport::request`].
    pub async fn request(&self, request: JsonRpcRequest) -> McpResult<JsonRpcResponse> {
        self.inner().request(request).await
    }

    /// See [`Transport::notify`].
    pub async fn notify(&self, notification: JsonRpcNotification) -> McpResult<()> {
        self.inner().notify(notification).await
    }

    /// See [`Transport::close`].
    pub async fn close(&self) -> McpResult<()> {
        self.inner().close().await
    }

    /// See [`Transport::kind`].
    pub fn kind(&self) -> TransportKind {
        self.inner().kind()
    }

    /// See [`Transport::session_id`].
    pub fn session_id(&self) -> Option<String> {
        self.inner().session_id()
    }

    /// See [`Transport::is_connected`].
    pub fn is_connected(&self) -> bool {
        self.inner().is_connected()
    }
}

/// Decode the JSON-RPC payload of an SSE event.
///
/// Only default (`message`) events carry JSON-RPC; anything else and
/// undecodable payloads are logged and skipped.
pub(crate) fn decode_event(event: &Event) -> Option<JsonRpcMessage> {
    if !event.event.is_empty() && event.event != "message" {
        debug!(event = %event.event, "Ignoring SSE event");
        return None;
    }
    if event.data.trim().is_empty() {
        return None;
    }

    match JsonRpcMessage::parse(&event.data) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!(error = %e, data = %event.data, "Skipping undecodable SSE payload");
            None
        }
    }
}
