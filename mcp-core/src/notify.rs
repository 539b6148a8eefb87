//! Delivery of server notifications to the application.
//!
//! Notifications can arrive on three paths: inline in a Streamable HTTP
//! POST response, on the background listener stream, or on the legacy SSE
//! stream. All of them funnel through one [`NotificationDispatcher`].

use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;

use crate::catalog::ToolCatalog;
use crate::messages::{methods, JsonRpcNotification};

/// Receives server notifications.
///
/// Implemented for any `Fn(&str, Option<&Value>)` closure, so a plain
/// closure can be registered directly.
pub trait NotificationHandler: Send + Sync {
    /// Called once per notification with its method and parameters.
    fn on_notification(&self, method: &str, params: Option<&Value>);
}

impl<F> NotificationHandler for F
where
    F: Fn(&str, Option<&Value>) + Send + Sync,
{
    fn on_notification(&self, method: &str, params: Option<&Value>) {
        self(method, params)
    }
}

/// Routes notifications to the registered handler.
pub struct NotificationDispatcher {
    handler: RwLock<Option<Arc<dyn NotificationHandler>>>,
    catalog: Arc<ToolCatalog>,
}

impl NotificationDispatcher {
    /// Dispatcher that invalidates `catalog` on tool list changes.
    pub fn new(catalog: Arc<ToolCatalog>) -> Self {
        Self {
            handler: RwLock::new(None),
            catalog,
        }
    }

    /// Install or remove the handler.
    pub fn set_handler(&self, handler: Option<Arc<dyn NotificationHandler>>) {
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = handler;
    }

    /// Whether a handler is installed.
    pub fn has_handler(&self) -> bool {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Deliver one notification.
    ///
    /// A tool list change empties the catalog before the handler runs, so a
    /// handler that immediately lists tools sees fresh data. The handler is
    /// invoked without holding the registration lock.
    pub fn dispatch(&self, notification: &JsonRpcNotification) {
        if notification.method == methods::TOOLS_LIST_CHANGED {
            self.catalog.invalidate();
        }

        let handler = self
            .handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match handler {
            Some(handler) => {
                handler.on_notification(&notification.method, notification.params.as_ref())
            }
            None => debug!(method = %notification.method, "Notification dropped, no handler"),
        }
    }
}
