//! Streamable HTTP transport (MCP 2025-03-26).
//!
//! - Single endpoint for all client-to-server traffic
//! - Session management via the `Mcp-Session-Id` header
//! - Replies as `application/json` or as an SSE stream that may interleave
//!   notifications before the response
//! - Optional GET stream for unsolicited server notifications
//! - Session termination via DELETE

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use super::http::{
    ensure_success, network_error, HttpContext, ACCEPT_EVENT_STREAM, ACCEPT_STREAMABLE,
    SESSION_ID_HEADER,
};
use super::{decode_event, Transport, TransportKind};
use crate::error::{McpResult, ProtocolError, TransportError};
use crate::listener::{EventSource, EventStreamOpen};
use crate::messages::{
    JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
};
use crate::notify::NotificationDispatcher;

const TRANSPORT_TYPE: &str = "streamable-http";

/// MCP Streamable HTTP transport.
pub struct StreamableHttpTransport {
    http: HttpContext,
    endpoint: Url,
    session_id: RwLock<Option<String>>,
    notifications: Arc<NotificationDispatcher>,
}

impl StreamableHttpTransport {
    /// Transport posting to `endpoint`. Inline notifications go to `notifications`.
    pub fn new(
        http: HttpContext,
        endpoint: Url,
        notifications: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            http,
            endpoint,
            session_id: RwLock::new(None),
            notifications,
        }
    }

    /// The endpoint this transport talks to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn current_session(&self) -> Option<String> {
        self.session_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record the session id the server assigned. The first id sticks for the
    /// lifetime of the session.
    fn adopt_session(&self, session_id: String) {
        let mut current = self.session_id.write().unwrap_or_else(PoisonError::into_inner);
        match current.as_deref() {
            None => {
                info!(session_id = %session_id, "Streamable HTTP session established");
                *current = Some(session_id);
            }
            Some(existing) if existing != session_id => {
                warn!(
                    current = %existing,
                    offered = %session_id,
                    "Ignoring session id change mid-session"
                );
            }
            Some(_) => {}
        }
    }

    fn with_session(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.current_session() {
            Some(session_id) => builder.header(SESSION_ID_HEADER, session_id),
            None => builder,
        }
    }

    fn post<T: Serialize + ?Sized>(&self, body: &T) -> RequestBuilder {
        let builder = self
            .http
            .request(Method::POST, self.endpoint.clone())
            .header(ACCEPT, ACCEPT_STREAMABLE)
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        self.with_session(builder)
    }

    async fn send(&self, builder: RequestBuilder) -> McpResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| network_error(TRANSPORT_TYPE, e))?;
        ensure_success(response).await
    }
}

#[async_trait]
impl EventSource for StreamableHttpTransport {
    fn location(&self) -> String {
        self.endpoint().to_string()
    }

    /// Open the GET stream on which the server pushes notifications.
    async fn open(&self) -> McpResult<EventStreamOpen> {
        let builder = self.with_session(
            self.http
                .request(Method::GET, self.endpoint.clone())
                .header(ACCEPT, ACCEPT_EVENT_STREAM),
        );
        let response = builder
            .send()
            .await
            .map_err(|e| network_error(TRANSPORT_TYPE, e))?;

        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            return Ok(EventStreamOpen::Unsupported);
        }
        let response = ensure_success(response).await?;
        Ok(EventStreamOpen::Connected(response.bytes_stream().boxed()))
    }
}

#[async_trait]
impl Transport for StreamableHttpTransport {
    async fn request(&self, request: JsonRpcRequest) -> McpResult<JsonRpcResponse> {
        debug!(method = %request.method, id = %request.id, "Sending Streamable HTTP request");

        let response = self.send(self.post(&request)).await?;
        let decoded = ResponseDecoder::new(&request.id, &self.notifications)
            .decode(response)
            .await;

        if let Some(session_id) = decoded.session_id {
            self.adopt_session(session_id);
        }
        decoded.response
    }

    async fn notify(&self, notification: JsonRpcNotification) -> McpResult<()> {
        debug!(method = %notification.method, "Sending Streamable HTTP notification");

        let response = self.send(self.post(&notification)).await?;
        // 202 Accepted with an empty body is the norm; drain whatever came back.
        let _ = response.bytes().await;
        Ok(())
    }

    async fn close(&self) -> McpResult<()> {
        let session_id = self
            .session_id
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(session_id) = session_id else {
            return Ok(());
        };

        let response = self
            .http
            .request(Method::DELETE, self.endpoint.clone())
            .header(SESSION_ID_HEADER, &session_id)
            .send()
            .await
            .map_err(|e| network_error(TRANSPORT_TYPE, e))?;

        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            debug!(session_id = %session_id, "Server does not support session termination");
            return Ok(());
        }
        ensure_success(response).await?;
        info!(session_id = %session_id, "Streamable HTTP session terminated");
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::StreamableHttp
    }

    fn session_id(&self) -> Option<String> {
        self.current_session()
    }
}

/// Result of decoding one POST response.
struct DecodedResponse {
    /// `Mcp-Session-Id` header, if the server sent one
    session_id: Option<String>,
    /// The reply to the request, or why none could be read
    response: McpResult<JsonRpcResponse>,
}

/// Reads a POST response as a unit: headers first, then a JSON or SSE body.
struct ResponseDecoder<'a> {
    expected: &'a RequestId,
    notifications: &'a NotificationDispatcher,
}

impl<'a> ResponseDecoder<'a> {
    fn new(expected: &'a RequestId, notifications: &'a NotificationDispatcher) -> Self {
        Self {
            expected,
            notifications,
        }
    }

    async fn decode(&self, response: Response) -> DecodedResponse {
        let session_id = response
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.starts_with(ACCEPT_EVENT_STREAM));

        let response = if is_event_stream {
            self.read_event_stream(response).await
        } else {
            self.read_json(response).await
        };

        DecodedResponse {
            session_id,
            response,
        }
    }

    async fn read_json(&self, response: Response) -> McpResult<JsonRpcResponse> {
        let body = response
            .bytes()
            .await
            .map_err(|e| network_error(TRANSPORT_TYPE, e))?;

        let reply: JsonRpcResponse =
            serde_json::from_slice(&body).map_err(|e| ProtocolError::InvalidResponse {
                reason: format!("undecodable JSON-RPC response: {e}"),
            })?;

        if &reply.id != self.expected {
            return Err(ProtocolError::InvalidResponse {
                reason: format!(
                    "response id {} does not match request id {}",
                    reply.id, self.expected
                ),
            }
            .into());
        }
        Ok(reply)
    }

    async fn read_event_stream(&self, response: Response) -> McpResult<JsonRpcResponse> {
        let mut events = response.bytes_stream().eventsource();

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| TransportError::SseError {
                reason: e.to_string(),
            })?;

            match decode_event(&event) {
                Some(JsonRpcMessage::Response(reply)) if &reply.id == self.expected => {
                    return Ok(reply);
                }
                Some(JsonRpcMessage::Response(reply)) => {
                    debug!(id = %reply.id, "Skipping response for another request");
                }
                Some(JsonRpcMessage::Notification(notification)) => {
                    self.notifications.dispatch(&notification);
                }
                Some(JsonRpcMessage::Request(request)) => {
                    debug!(method = %request.method, "Ignoring server-initiated request");
                }
                None => {}
            }
        }

        Err(TransportError::StreamClosed {
            transport_type: TRANSPORT_TYPE.to_string(),
            reason: format!("stream ended before the reply to request {}", self.expected),
        }
        .into())
    }
}
