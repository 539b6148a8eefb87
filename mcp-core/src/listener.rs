//! Background listener for server-initiated notifications.
//!
//! With Streamable HTTP the server pushes unsolicited notifications on a GET
//! event stream at the MCP endpoint. The listener keeps that stream open:
//!
//! - a 405 answer means the server never pushes, and the listener stops
//! - a stream that ends cleanly is reopened after the minimum delay
//! - failures are retried with exponential backoff (1s doubling to 30s by
//!   default)
//!
//! Shutdown is cooperative: [`ListenerHandle::shutdown`] cancels the task and
//! waits for it to exit, so no stream outlives the session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ListenerConfig;
use crate::error::McpResult;
use crate::messages::JsonRpcMessage;
use crate::notify::NotificationDispatcher;
use crate::transport::decode_event;

/// Raw body of an open notification stream.
pub(crate) type EventBytes = BoxStream<'static, Result<Bytes, reqwest::Error>>;

/// Outcome of opening the server's notification stream.
pub(crate) enum EventStreamOpen {
    /// The server answered 405: it never pushes unsolicited messages.
    Unsupported,
    /// An open `text/event-stream` body.
    Connected(EventBytes),
}

/// Where the listener (re)opens its notification stream.
#[async_trait]
pub(crate) trait EventSource: Send + Sync + 'static {
    /// Human-readable location, for logs.
    fn location(&self) -> String;

    /// Open a fresh stream.
    async fn open(&self) -> McpResult<EventStreamOpen>;
}

/// Exponential reconnect delay, doubling from a floor up to a ceiling.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    current: Duration,
}

impl Backoff {
    /// Backoff starting at `floor` and never exceeding `ceiling`.
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        Self {
            floor,
            ceiling,
            current: floor,
        }
    }

    /// Delay to wait now; the following call returns twice as much.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.ceiling);
        delay
    }

    /// Start over from the floor.
    pub fn reset(&mut self) {
        self.current = self.floor;
    }
}

/// Handle to a running listener task.
pub(crate) struct ListenerHandle {
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Whether the task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Cancel the listener and wait until it has exited.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Notification listener task failed");
            }
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Start listening for notifications from `source`.
pub(crate) fn spawn(
    source: Arc<dyn EventSource>,
    notifications: Arc<NotificationDispatcher>,
    config: ListenerConfig,
) -> ListenerHandle {
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(run(
        source,
        notifications,
        Backoff::new(config.min_backoff, config.max_backoff),
        shutdown.clone(),
    ));

    ListenerHandle {
        shutdown,
        task: Some(task),
    }
}

async fn run(
    source: Arc<dyn EventSource>,
    notifications: Arc<NotificationDispatcher>,
    mut backoff: Backoff,
    shutdown: CancellationToken,
) {
    info!(endpoint = %source.location(), "Notification listener started");

    loop {
        let opened = tokio::select! {
            _ = shutdown.cancelled() => break,
            opened = source.open() => opened,
        };

        match opened {
            Ok(EventStreamOpen::Unsupported) => {
                info!("Server does not offer a notification stream");
                break;
            }
            Ok(EventStreamOpen::Connected(body)) => {
                debug!("Notification stream connected");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = pump(body, &notifications) => {}
                }
                backoff.reset();
            }
            Err(e) => {
                warn!(error = %e, "Notification stream unavailable");
            }
        }

        let delay = backoff.next_delay();
        debug!(delay_ms = delay.as_millis() as u64, "Reconnecting notification stream");
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    info!("Notification listener stopped");
}

async fn pump(body: EventBytes, notifications: &NotificationDispatcher) {
    let mut events = body.eventsource();

    while let Some(event) = events.next().await {
        match event {
            Ok(event) => match decode_event(&event) {
                Some(JsonRpcMessage::Notification(notification)) => {
                    notifications.dispatch(&notification);
                }
                Some(other) => {
                    debug!(id = ?other.id(), "Ignoring non-notification on listener stream");
                }
                None => {}
            },
            Err(e) => {
                warn!(error = %e, "Notification stream failed");
                return;
            }
        }
    }

    debug!("Notification stream ended");
}
