//! Legacy HTTP+SSE transport (MCP 2024-11-05).
//!
//! The client opens a GET event stream on the configured endpoint. The
//! server's first `endpoint` event names the URL (usually relative, often
//! with a session query parameter) to which every message is POSTed. POSTs
//! are acknowledged with a bare 2xx; the actual responses arrive later on
//! the event stream and are matched to their callers by numeric id.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::{Event, Eventsource};
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Response};
use serde::Serialize;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::http::{ensure_success, network_error, HttpContext, ACCEPT_EVENT_STREAM};
use super::pending::PendingCalls;
use super::{decode_event, Transport, TransportKind};
use crate::error::{McpError, McpResult, ProtocolError, TransportError};
use crate::messages::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::notify::NotificationDispatcher;

const TRANSPORT_TYPE: &str = "sse";

/// MCP HTTP+SSE transport.
pub struct SseTransport {
    http: HttpContext,
    message_url: Url,
    pending: Arc<PendingCalls>,
    shutdown: CancellationToken,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl SseTransport {
    /// Open the event stream at `stream_url` and wait for the `endpoint`
    /// event, at most `endpoint_timeout`.
    pub async fn connect(
        http: HttpContext,
        stream_url: Url,
        endpoint_timeout: Duration,
        notifications: Arc<NotificationDispatcher>,
    ) -> McpResult<Self> {
        info!(url = %stream_url, "Opening legacy SSE stream");

        let response = http
            .request(Method::GET, stream_url.clone())
            .header(ACCEPT, ACCEPT_EVENT_STREAM)
            .send()
            .await
            .map_err(|e| network_error(TRANSPORT_TYPE, e))?;
        let response = ensure_success(response).await?;

        let pending = Arc::new(PendingCalls::new());
        let shutdown = CancellationToken::new();
        let (endpoint_tx, endpoint_rx) = oneshot::channel();

        let reader = EventReader {
            pending: pending.clone(),
            notifications,
            endpoint: Some(endpoint_tx),
            shutdown: shutdown.clone(),
        };
        let reader = tokio::spawn(reader.run(response));

        let endpoint = match tokio::time::timeout(endpoint_timeout, endpoint_rx).await {
            Ok(Ok(endpoint)) => endpoint,
            Ok(Err(_)) => {
                stop_reader(&shutdown, reader).await;
                return Err(TransportError::StreamClosed {
                    transport_type: TRANSPORT_TYPE.to_string(),
                    reason: "stream ended before the endpoint event".to_string(),
                }
                .into());
            }
            Err(_) => {
                stop_reader(&shutdown, reader).await;
                return Err(McpError::timeout(
                    "waiting for SSE endpoint event",
                    endpoint_timeout,
                ));
            }
        };

        let message_url = match stream_url.join(&endpoint) {
            Ok(url) => url,
            Err(e) => {
                stop_reader(&shutdown, reader).await;
                return Err(TransportError::ConnectionFailed {
                    transport_type: TRANSPORT_TYPE.to_string(),
                    reason: format!("invalid endpoint '{endpoint}': {e}"),
                }
                .into());
            }
        };
        info!(endpoint = %message_url, "Legacy SSE message endpoint resolved");

        Ok(Self {
            http,
            message_url,
            pending,
            shutdown,
            reader: Mutex::new(Some(reader)),
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, body: &T) -> McpResult<()> {
        let response = self
            .http
            .request(Method::POST, self.message_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| network_error(TRANSPORT_TYPE, e))?;

        let response = ensure_success(response).await?;
        // The acknowledgement body carries nothing useful.
        let _ = response.bytes().await;
        Ok(())
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn request(&self, request: JsonRpcRequest) -> McpResult<JsonRpcResponse> {
        let id = request
            .id
            .as_i64()
            .ok_or_else(|| ProtocolError::InvalidRequest {
                reason: format!("SSE correlation needs a numeric id, got {}", request.id),
            })?;

        debug!(method = %request.method, id, "Sending SSE request");
        let mut call = self.pending.register(id)?;
        self.post(&request).await?;
        call.wait().await
    }

    async fn notify(&self, notification: JsonRpcNotification) -> McpResult<()> {
        debug!(method = %notification.method, "Sending SSE notification");
        self.post(&notification).await
    }

    async fn close(&self) -> McpResult<()> {
        self.shutdown.cancel();
        if let Some(reader) = self.reader.lock().await.take() {
            if let Err(e) = reader.await {
                warn!(error = %e, "SSE reader task failed");
            }
        }
        self.pending.close();
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Sse
    }

    fn is_connected(&self) -> bool {
        !self.pending.is_closed()
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn stop_reader(shutdown: &CancellationToken, reader: JoinHandle<()>) {
    shutdown.cancel();
    if let Err(e) = reader.await {
        warn!(error = %e, "SSE reader task failed");
    }
}

/// Owns the event stream and routes everything read from it.
struct EventReader {
    pending: Arc<PendingCalls>,
    notifications: Arc<NotificationDispatcher>,
    endpoint: Option<oneshot::Sender<String>>,
    shutdown: CancellationToken,
}

impl EventReader {
    async fn run(mut self, response: Response) {
        let mut events = response.bytes_stream().eventsource();

        loop {
            let next = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                next = events.next() => next,
            };

            match next {
                Some(Ok(event)) => self.handle(event),
                Some(Err(e)) => {
                    warn!(error = %e, "SSE stream failed");
                    break;
                }
                None => {
                    debug!("SSE stream ended");
                    break;
                }
            }
        }

        // Every caller still waiting fails with "stream closed", and the
        // transport reports itself disconnected from here on.
        self.pending.close();
    }

    fn handle(&mut self, event: Event) {
        if event.event == "endpoint" {
            match self.endpoint.take() {
                Some(tx) => {
                    let _ = tx.send(event.data.trim().to_string());
                }
                None => debug!(data = %event.data, "Ignoring repeated endpoint event"),
            }
            return;
        }

        match decode_event(&event) {
            Some(JsonRpcMessage::Response(response)) => {
                let id = response.id.clone();
                if !self.pending.complete(response) {
                    debug!(id = %id, "No caller waiting for SSE response");
                }
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
}
