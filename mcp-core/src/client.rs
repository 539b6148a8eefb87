//! High-level MCP client.
//!
//! [`McpClient`] owns one logical session with an MCP server. The session is
//! established lazily: the first public call performs the handshake, picking
//! Streamable HTTP or, when the server rejects it with 404/405, the legacy
//! HTTP+SSE transport. Concurrent first callers queue behind a single
//! handshake.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mcp_core::client::McpClient;
//! use serde_json::json;
//!
//! # async fn demo() -> mcp_core::McpResult<()> {
//! let client = McpClient::with_endpoint("http://localhost:8080/mcp")?;
//!
//! for tool in client.list_tools().await? {
//!     println!("{}: {}", tool.name, tool.description);
//! }
//!
//! let result = client
//!     .call_tool("echo", Some(json!({ "text": "hello" })))
//!     .await?;
//! println!("{}", result.text());
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock};
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::catalog::ToolCatalog;
use crate::config::ClientConfig;
use crate::error::{McpError, McpResult, ProtocolError, ValidationError};
use crate::listener::{self, ListenerHandle};
use crate::messages::{
    methods, CallToolRequest, CallToolResponse, Capabilities, GetPromptRequest,
    GetPromptResponse, Implementation, InitializeRequest, InitializeResponse, JsonRpcNotification,
    JsonRpcRequest, ListPromptsResponse, ListResourcesResponse, ListToolsResponse, Paginated,
    PaginatedRequest, Prompt, ProtocolVersion, Resource, Tool,
};
use crate::notify::{NotificationDispatcher, NotificationHandler};
use crate::pagination::collect_pages;
use crate::transport::{
    ActiveTransport, HttpContext, SseTransport, StreamableHttpTransport, TransportKind,
};
use crate::validation::normalize_arguments;

/// Lifecycle of the client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// No session yet, the last handshake failed, or the session's event
    /// stream dropped
    Uninitialized,
    /// Handshake in progress
    Initializing,
    /// Session established
    Initialized,
    /// Session closed; the next call starts a new one
    Closed,
}

/// What the server told us during the handshake.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    /// Server implementation details
    pub implementation: Implementation,
    /// Protocol version chosen by the server
    pub protocol_version: ProtocolVersion,
    /// Server capabilities
    pub capabilities: Capabilities,
    /// Usage instructions, if the server provided any
    pub instructions: Option<String>,
    /// When the session was established
    pub connected_at: Instant,
}

struct ActiveSession {
    transport: ActiveTransport,
    server: ServerInfo,
}

#[derive(Default)]
struct Session {
    active: Option<Arc<ActiveSession>>,
    listener: Option<ListenerHandle>,
}

/// MCP client over Streamable HTTP with legacy SSE fallback.
///
/// All methods take `&self`; share the client behind an `Arc` to issue calls
/// from several tasks at once.
///
/// A legacy SSE session lives only as long as its event stream. Once the
/// stream drops, calls waiting on it fail, [`state`](Self::state) reports
/// [`ClientState::Uninitialized`] and the next call performs a fresh
/// handshake.
pub struct McpClient {
    config: ClientConfig,
    http: HttpContext,
    session: Mutex<Session>,
    state: RwLock<ClientState>,
    connection: StdMutex<Option<ActiveTransport>>,
    negotiated: StdMutex<Option<TransportKind>>,
    catalog: Arc<ToolCatalog>,
    notifications: Arc<NotificationDispatcher>,
    next_id: AtomicI64,
}

impl McpClient {
    /// Create a client. No network traffic happens until the first call.
    pub fn new(config: ClientConfig) -> McpResult<Self> {
        config.validate()?;
        let http = HttpContext::new(&config)?;
        let catalog = Arc::new(ToolCatalog::new());
        let notifications = Arc::new(NotificationDispatcher::new(catalog.clone()));

        Ok(Self {
            config,
            http,
            session: Mutex::new(Session::default()),
            state: RwLock::new(ClientState::Uninitialized),
            connection: StdMutex::new(None),
            negotiated: StdMutex::new(None),
            catalog,
            notifications,
            next_id: AtomicI64::new(1),
        })
    }

    /// Create a client with default settings for `endpoint`.
    pub fn with_endpoint(endpoint: &str) -> McpResult<Self> {
        Self::new(ClientConfig::new(endpoint)?)
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClientState {
        let state = *self.state.read().unwrap_or_else(PoisonError::into_inner);
        if state == ClientState::Initialized && self.connection_lost() {
            return ClientState::Uninitialized;
        }
        state
    }

    fn set_state(&self, state: ClientState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn connection_lost(&self) -> bool {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|transport| !transport.is_connected())
    }

    fn set_connection(&self, transport: Option<ActiveTransport>) {
        *self.connection.lock().unwrap_or_else(PoisonError::into_inner) = transport;
    }

    /// Transport picked by negotiation, once a handshake has succeeded.
    ///
    /// The choice survives [`close`](Self::close): a client that fell back to
    /// SSE goes straight to SSE when it reconnects.
    pub fn transport_kind(&self) -> Option<TransportKind> {
        *self.negotiated.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Server details of the current session.
    pub async fn server_info(&self) -> Option<ServerInfo> {
        let session = self.session.lock().await;
        session.active.as_ref().map(|active| active.server.clone())
    }

    /// `Mcp-Session-Id` assigned by a Streamable HTTP server.
    pub async fn session_id(&self) -> Option<String> {
        let session = self.session.lock().await;
        session
            .active
            .as_ref()
            .and_then(|active| active.transport.session_id())
    }

    /// Whether the background notification listener is running.
    pub async fn is_listening(&self) -> bool {
        let session = self.session.lock().await;
        session
            .listener
            .as_ref()
            .is_some_and(ListenerHandle::is_running)
    }

    /// Tools currently cached, sorted by name.
    pub fn cached_tools(&self) -> Vec<Tool> {
        self.catalog.tools()
    }

    /// Register the callback that receives every server notification,
    /// replacing any previous one.
    ///
    /// The Streamable HTTP notification listener is only started by a
    /// handshake that finds a callback registered, so register it before the
    /// first call.
    pub fn set_notification_handler(&self, handler: impl NotificationHandler + 'static) {
        self.notifications.set_handler(Some(Arc::new(handler)));
    }

    /// Stop delivering notifications.
    pub fn clear_notification_handler(&self) {
        self.notifications.set_handler(None);
    }

    /// Install or rotate the `Authorization` header value used by every
    /// subsequent request, including the listener's reconnects.
    pub fn set_authorization(&self, value: Option<String>) {
        self.http.set_authorization(value);
    }

    /// Current `Authorization` header value.
    pub fn authorization(&self) -> Option<String> {
        self.http.authorization()
    }

    /// Establish the session now instead of on first use.
    pub async fn initialize(&self) -> McpResult<ServerInfo> {
        Ok(self.session().await?.server.clone())
    }

    /// Check that the server is alive.
    pub async fn ping(&self) -> McpResult<()> {
        let _: Value = self.rpc::<Value, _>(methods::PING, None).await?;
        Ok(())
    }

    /// List every tool, following pagination, and replace the tool cache
    /// with the result.
    pub async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        let tools = self.list_all::<ListToolsResponse>(methods::TOOLS_LIST).await?;
        self.catalog.replace(tools.iter().cloned());
        info!(count = tools.len(), "Tool catalog refreshed");
        Ok(tools)
    }

    /// Invoke a tool.
    ///
    /// The call is checked against the cached catalog first, fetching it if
    /// it is empty, and once more if a list change empties it before the
    /// check. An unknown tool fails with code -32601 and arguments that
    /// violate the tool's input schema fail with -32602, both without
    /// contacting the server. A tool reporting failure through `isError` is
    /// still an `Ok` result.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> McpResult<CallToolResponse> {
        if self.catalog.is_empty() {
            debug!(tool = name, "Tool catalog empty, fetching before call");
            self.list_tools().await?;
        }

        let arguments = normalize_arguments(arguments);
        match self.catalog.check_call(name, &arguments) {
            Err(McpError::Validation(ValidationError::UnknownTool { .. }))
                if self.catalog.is_empty() =>
            {
                debug!(tool = name, "Tool catalog emptied before call, fetching again");
                self.list_tools().await?;
                self.catalog.check_call(name, &arguments)?;
            }
            checked => checked?,
        }

        let request = CallToolRequest {
            name: name.to_string(),
            arguments: Some(arguments),
        };
        self.rpc(methods::TOOLS_CALL, Some(request)).await
    }

    /// List every prompt, following pagination.
    pub async fn list_prompts(&self) -> McpResult<Vec<Prompt>> {
        self.list_all::<ListPromptsResponse>(methods::PROMPTS_LIST)
            .await
    }

    /// Render a prompt with string arguments.
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: HashMap<String, String>,
    ) -> McpResult<GetPromptResponse> {
        let request = GetPromptRequest {
            name: name.to_string(),
            arguments: (!arguments.is_empty()).then_some(arguments),
        };
        self.rpc(methods::PROMPTS_GET, Some(request)).await
    }

    /// List every resource, following pagination.
    pub async fn list_resources(&self) -> McpResult<Vec<Resource>> {
        self.list_all::<ListResourcesResponse>(methods::RESOURCES_LIST)
            .await
    }

    /// End the session.
    ///
    /// Stops the notification listener and waits for it to exit, then
    /// releases the transport; for Streamable HTTP that means a DELETE
    /// carrying the session id. Local state is reset even when the DELETE
    /// fails, and that failure is returned. Closing a client that has no
    /// session is a no-op.
    pub async fn close(&self) -> McpResult<()> {
        let mut session = self.session.lock().await;
        let listener = session.listener.take();
        let Some(active) = session.active.take() else {
            return Ok(());
        };

        if let Some(listener) = listener {
            listener.shutdown().await;
        }
        self.catalog.invalidate();
        self.set_connection(None);
        self.set_state(ClientState::Closed);

        let result = active.transport.close().await;
        match &result {
            Ok(()) => info!(transport = %active.transport.kind(), "MCP session closed"),
            Err(e) => warn!(error = %e, "MCP session closed with error"),
        }
        result
    }

    /// The active session, performing the handshake if there is none.
    async fn session(&self) -> McpResult<Arc<ActiveSession>> {
        let mut session = self.session.lock().await;
        if let Some(active) = &session.active {
            if active.transport.is_connected() {
                return Ok(active.clone());
            }
        }
        if session.active.is_some() {
            self.discard(&mut session).await;
        }

        self.set_state(ClientState::Initializing);
        match self.handshake().await {
            Ok(active) => {
                let active = Arc::new(active);
                session.listener = self.start_listener(&active);
                session.active = Some(active.clone());
                self.set_connection(Some(active.transport.clone()));
                self.set_state(ClientState::Initialized);
                Ok(active)
            }
            Err(e) => {
                warn!(error = %e, "MCP handshake failed");
                self.set_state(ClientState::Uninitialized);
                Err(e)
            }
        }
    }

    /// Drop a session whose connection is gone so a new one can replace it.
    async fn discard(&self, session: &mut Session) {
        warn!("MCP event stream lost, starting a new session");
        if let Some(listener) = session.listener.take() {
            listener.shutdown().await;
        }
        if let Some(active) = session.active.take() {
            release(&active.transport).await;
        }
        self.catalog.invalidate();
        self.set_connection(None);
    }

    async fn handshake(&self) -> McpResult<ActiveSession> {
        let (transport, init) = match self.transport_kind() {
            Some(TransportKind::Sse) => self.handshake_sse().await?,
            _ => match self.handshake_streamable().await {
                Ok(done) => done,
                Err(e) if matches!(e.http_status(), Some(404 | 405)) => {
                    info!(
                        status = ?e.http_status(),
                        "Streamable HTTP rejected, falling back to SSE"
                    );
                    self.handshake_sse().await?
                }
                Err(e) => return Err(e),
            },
        };

        let initialized = JsonRpcNotification::without_params(methods::INITIALIZED);
        if let Err(e) = transport.notify(initialized).await {
            release(&transport).await;
            return Err(e);
        }

        if !init.protocol_version.is_supported() {
            warn!(
                version = %init.protocol_version,
                "Server chose an unrecognised protocol version"
            );
        }
        info!(
            server = %init.server_info.name,
            version = %init.server_info.version,
            protocol = %init.protocol_version,
            transport = %transport.kind(),
            session_id = ?transport.session_id(),
            "MCP session initialized"
        );

        *self
            .negotiated
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(transport.kind());

        Ok(ActiveSession {
            transport,
            server: ServerInfo {
                implementation: init.server_info,
                protocol_version: init.protocol_version,
                capabilities: init.capabilities,
                instructions: init.instructions,
                connected_at: Instant::now(),
            },
        })
    }

    async fn handshake_streamable(&self) -> McpResult<(ActiveTransport, InitializeResponse)> {
        debug!(endpoint = %self.config.endpoint, "Attempting Streamable HTTP handshake");
        let transport = ActiveTransport::Streamable(Arc::new(StreamableHttpTransport::new(
            self.http.clone(),
            self.config.endpoint.clone(),
            self.notifications.clone(),
        )));
        let init = self.initialize_over(&transport).await?;
        Ok((transport, init))
    }

    async fn handshake_sse(&self) -> McpResult<(ActiveTransport, InitializeResponse)> {
        let transport = ActiveTransport::Sse(Arc::new(
            SseTransport::connect(
                self.http.clone(),
                self.config.endpoint.clone(),
                self.config.endpoint_timeout,
                self.notifications.clone(),
            )
            .await?,
        ));
        let init = self.initialize_over(&transport).await?;
        Ok((transport, init))
    }

    async fn initialize_over(&self, transport: &ActiveTransport) -> McpResult<InitializeResponse> {
        let request = InitializeRequest::for_client(self.config.client_info.clone());
        match self
            .exchange(transport, methods::INITIALIZE, Some(request))
            .await
        {
            Ok(init) => Ok(init),
            Err(e) => {
                release(transport).await;
                Err(e)
            }
        }
    }

    fn start_listener(&self, active: &ActiveSession) -> Option<ListenerHandle> {
        let ActiveTransport::Streamable(transport) = &active.transport else {
            return None;
        };
        if !active.server.capabilities.emits_notifications() {
            debug!("Server advertises no notifications, listener not started");
            return None;
        }
        if !self.notifications.has_handler() {
            debug!("No notification handler registered, listener not started");
            return None;
        }

        Some(listener::spawn(
            transport.clone(),
            self.notifications.clone(),
            self.config.listener.clone(),
        ))
    }

    async fn list_all<P: Paginated>(&self, method: &str) -> McpResult<Vec<P::Item>> {
        collect_pages(move |cursor: Option<String>| {
            self.rpc::<PaginatedRequest, P>(method, cursor.map(PaginatedRequest::new))
        })
        .await
    }

    async fn rpc<P, R>(&self, method: &str, params: Option<P>) -> McpResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let session = self.session().await?;
        self.exchange(&session.transport, method, params).await
    }

    /// One request/response exchange bounded by the request timeout.
    async fn exchange<P, R>(
        &self,
        transport: &ActiveTransport,
        method: &str,
        params: Option<P>,
    ) -> McpResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let params = params.map(serde_json::to_value).transpose()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::with_optional_params(id, method, params);

        let timeout = self.config.request_timeout;
        let response = tokio::time::timeout(timeout, transport.request(request))
            .await
            .map_err(|_| McpError::timeout(method, timeout))??;

        match response.into_result() {
            Ok(Some(result)) => serde_json::from_value(result).map_err(|e| {
                ProtocolError::InvalidResponse {
                    reason: format!("malformed {method} result: {e}"),
                }
                .into()
            }),
            Ok(None) => Err(ProtocolError::InvalidResponse {
                reason: format!("{method} response has neither result nor error"),
            }
            .into()),
            Err(error) => {
                debug!(method, code = error.code, "Server returned an error");
                Err(ProtocolError::ServerError {
                    code: error.code,
                    message: error.message,
                    data: error.data,
                }
                .into())
            }
        }
    }
}

/// Best-effort teardown of a transport that is being abandoned.
async fn release(transport: &ActiveTransport) {
    if let Err(e) = transport.close().await {
        debug!(error = %e, "Ignoring close failure on abandoned transport");
    }
}
