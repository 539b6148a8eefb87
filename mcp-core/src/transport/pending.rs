//! Correlation of SSE-delivered responses with waiting callers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{McpResult, ProtocolError, TransportError};
use crate::messages::JsonRpcResponse;

#[derive(Default)]
struct PendingState {
    calls: HashMap<i64, oneshot::Sender<JsonRpcResponse>>,
    closed: bool,
}

/// Outstanding requests keyed by numeric id.
///
/// Each waiter owns a [`PendingCall`] guard; dropping the guard (completion,
/// error, timeout, cancellation) removes the entry, so the table never
/// accumulates stale ids.
#[derive(Default)]
pub(crate) struct PendingCalls {
    state: Mutex<PendingState>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `id`.
    pub fn register(self: &Arc<Self>, id: i64) -> McpResult<PendingCall> {
        let (tx, rx) = oneshot::channel();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if state.closed {
            return Err(stream_closed("event stream already closed").into());
        }
        if state.calls.contains_key(&id) {
            return Err(ProtocolError::InvalidRequest {
                reason: format!("request id {id} is already in flight"),
            }
            .into());
        }

        state.calls.insert(id, tx);
        Ok(PendingCall {
            id,
            receiver: rx,
            table: Arc::clone(self),
        })
    }

    /// Hand a response to its waiter. Returns false when nobody is waiting.
    pub fn complete(&self, response: JsonRpcResponse) -> bool {
        let Some(id) = response.id.as_i64() else {
            return false;
        };

        let sender = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .calls
            .remove(&id);

        match sender {
            Some(sender) => sender.send(response).is_ok(),
            None => false,
        }
    }

    /// Fail every waiter and refuse new registrations.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        if !state.calls.is_empty() {
            debug!(pending = state.calls.len(), "Failing outstanding SSE calls");
        }
        // Dropping the senders wakes every receiver with an error.
        state.calls.clear();
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .calls
            .len()
    }

    fn remove(&self, id: i64) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .calls
            .remove(&id);
    }
}

/// A registered waiter. Removes its table entry when dropped.
pub(crate) struct PendingCall {
    id: i64,
    receiver: oneshot::Receiver<JsonRpcResponse>,
    table: Arc<PendingCalls>,
}

impl PendingCall {
    /// Wait for the response, or fail once the stream closes.
    pub async fn wait(&mut self) -> McpResult<JsonRpcResponse> {
        (&mut self.receiver)
            .await
            .map_err(|_| stream_closed("stream closed").into())
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        self.table.remove(self.id);
    }
}

fn stream_closed(reason: &str) -> TransportError {
    TransportError::StreamClosed {
        transport_type: "sse".to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_complete_routes_by_id() {
        let table = Arc::new(PendingCalls::new());
        let mut first = table.register(1).unwrap();
        let mut second = table.register(2).unwrap();

        assert!(table.complete(JsonRpcResponse::success(2i64, json!({"n": 2}))));
        assert!(table.complete(JsonRpcResponse::success(1i64, json!({"n": 1}))));

        assert_eq!(first.wait().await.unwrap().result, Some(json!({"n": 1})));
        assert_eq!(second.wait().await.unwrap().result, Some(json!({"n": 2})));
    }

    #[tokio::test]
    async fn test_unmatched_response_is_rejected() {
        let table = Arc::new(PendingCalls::new());
        let _call = table.register(5).unwrap();

        assert!(!table.complete(JsonRpcResponse::success(6i64, json!({}))));
        assert!(!table.complete(JsonRpcResponse::success("5", json!({}))));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_drop_removes_entry() {
        let table = Arc::new(PendingCalls::new());
        {
            let _call = table.register(9).unwrap();
            assert_eq!(table.len(), 1);
        }
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn test_close_fails_waiters_and_registrations() {
        let table = Arc::new(PendingCalls::new());
        let mut call = table.register(1).unwrap();

        table.close();

        let err = call.wait().await.unwrap_err();
        assert!(err.to_string().contains("stream closed"));
        assert!(table.register(2).is_err());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let table = Arc::new(PendingCalls::new());
        let _call = table.register(3).unwrap();
        assert!(table.register(3).is_err());
    }
}
