//! Mock MCP servers shared by the integration tests.
//!
//! - [`RpcResponder`] answers Streamable HTTP POSTs on a `wiremock` server.
//! - [`LegacySseServer`] speaks the HTTP+SSE transport on a raw TCP socket,
//!   since its event stream has to stay open while POSTs are answered on it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mcp_core::{ClientConfig, ListenerConfig, McpClient};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const SESSION_ID: &str = "sess-1";

/// Result of a successful `initialize` with the given capabilities.
pub fn initialize_result(capabilities: Value) -> Value {
    json!({
        "protocolVersion": "2025-03-26",
        "capabilities": capabilities,
        "serverInfo": { "name": "mock-server", "version": "1.0.0" }
    })
}

/// The `echo` tool: one required string argument.
pub fn echo_tool() -> Value {
    json!({
        "name": "echo",
        "description": "Echo the given text",
        "inputSchema": {
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"]
        }
    })
}

/// Client for `endpoint` with short timeouts and listener backoff.
pub fn client_for(endpoint: &str) -> McpClient {
    let config = ClientConfig::new(endpoint)
        .unwrap()
        .with_request_timeout(Duration::from_secs(5))
        .with_endpoint_timeout(Duration::from_secs(5))
        .with_listener(ListenerConfig::new(
            Duration::from_millis(20),
            Duration::from_millis(80),
        ));
    McpClient::new(config).unwrap()
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Scripted Streamable HTTP endpoint.
///
/// Requests are answered from a method table. List methods can be keyed by
/// cursor as `"tools/list#p1"`. Every request after `initialize` must carry
/// the session header, otherwise it gets a 400.
#[derive(Clone)]
pub struct RpcResponder {
    results: HashMap<String, Value>,
    errors: HashMap<String, (i64, String)>,
    statuses: HashMap<String, u16>,
    delays: HashMap<String, Duration>,
    event_stream: bool,
    inline_notification: Option<Value>,
}

impl RpcResponder {
    pub fn new() -> Self {
        let mut results = HashMap::new();
        results.insert("initialize".to_string(), initialize_result(json!({})));
        results.insert("ping".to_string(), json!({}));

        Self {
            results,
            errors: HashMap::new(),
            statuses: HashMap::new(),
            delays: HashMap::new(),
            event_stream: false,
            inline_notification: None,
        }
    }

    pub fn capabilities(self, capabilities: Value) -> Self {
        self.result("initialize", initialize_result(capabilities))
    }

    pub fn result(mut self, key: &str, result: Value) -> Self {
        self.results.insert(key.to_string(), result);
        self
    }

    pub fn error(mut self, key: &str, code: i64, message: &str) -> Self {
        self.errors
            .insert(key.to_string(), (code, message.to_string()));
        self
    }

    pub fn status(mut self, key: &str, status: u16) -> Self {
        self.statuses.insert(key.to_string(), status);
        self
    }

    pub fn delay(mut self, key: &str, delay: Duration) -> Self {
        self.delays.insert(key.to_string(), delay);
        self
    }

    /// Answer as `text/event-stream`, preceded by `notification` and by a
    /// response meant for some other request.
    pub fn event_stream(mut self, notification: Value) -> Self {
        self.event_stream = true;
        self.inline_notification = Some(notification);
        self
    }

    /// Mount on `server` together with an accepting DELETE handler.
    pub async fn mount(self, server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .respond_with(self)
            .mount(server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/mcp"))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
    }

    fn lookup<'a, T>(table: &'a HashMap<String, T>, key: &str, method: &str) -> Option<&'a T> {
        table.get(key).or_else(|| table.get(method))
    }
}

impl Respond for RpcResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400),
        };
        let method = body["method"].as_str().unwrap_or_default().to_string();

        if method != "initialize" {
            let session = request
                .headers
                .get("mcp-session-id")
                .and_then(|value| value.to_str().ok());
            if session != Some(SESSION_ID) {
                return ResponseTemplate::new(400).set_body_string("missing session");
            }
        }

        let Some(id) = body.get("id").cloned() else {
            return ResponseTemplate::new(202);
        };

        let key = match body["params"]["cursor"].as_str() {
            Some(cursor) => format!("{method}#{cursor}"),
            None => method.clone(),
        };

        if let Some(status) = Self::lookup(&self.statuses, &key, &method) {
            return ResponseTemplate::new(*status);
        }

        let reply = if let Some((code, message)) = Self::lookup(&self.errors, &key, &method) {
            json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
        } else {
            match Self::lookup(&self.results, &key, &method) {
                Some(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
                None => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": -32601, "message": format!("Method not found: {method}") }
                }),
            }
        };

        let mut template = if self.event_stream {
            let mut sse = String::new();
            if let Some(notification) = &self.inline_notification {
                sse.push_str(&format!("event: message\ndata: {notification}\n\n"));
            }
            let stray = json!({ "jsonrpc": "2.0", "id": 999_999, "result": {} });
            sse.push_str(&format!("data: {stray}\n\n"));
            sse.push_str(&format!("data: {reply}\n\n"));
            ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream")
        } else {
            ResponseTemplate::new(200).set_body_json(reply)
        };

        if method == "initialize" {
            template = template.insert_header("Mcp-Session-Id", SESSION_ID);
        }
        if let Some(delay) = Self::lookup(&self.delays, &key, &method) {
            template = template.set_delay(*delay);
        }
        template
    }
}

/// JSON-RPC methods of every POST the mock server received, in order.
pub async fn posted_methods(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.method.as_str() == "POST")
        .filter_map(|request| serde_json::from_slice::<Value>(&request.body).ok())
        .filter_map(|body| body["method"].as_str().map(str::to_string))
        .collect()
}

/// Received requests with the given HTTP method.
pub async fn requests_with_method(server: &MockServer, http_method: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.method.as_str() == http_method)
        .collect()
}

/// Legacy HTTP+SSE server.
///
/// - `POST /mcp` answers with the configured status (404 or 405)
/// - `GET /mcp` opens the event stream and announces `/messages?sessionId=abc`
/// - `POST /messages` is acknowledged with 202; replies go out on the stream
///
/// `echo` calls are held back until `batch` of them arrived and then answered
/// in reverse order. Calling `hangup` ends the event stream.
pub struct LegacySseServer {
    pub endpoint: String,
    state: Arc<LegacyState>,
}

struct LegacyState {
    streamable_status: u16,
    batch: usize,
    stream: Mutex<Option<mpsc::UnboundedSender<String>>>,
    held: Mutex<Vec<Value>>,
    counts: Mutex<HashMap<String, usize>>,
}

impl LegacySseServer {
    pub async fn start(streamable_status: u16, batch: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(LegacyState {
            streamable_status,
            batch,
            stream: Mutex::new(None),
            held: Mutex::new(Vec::new()),
            counts: Mutex::new(HashMap::new()),
        });

        let accept_state = state.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(handle_connection(socket, accept_state.clone()));
            }
        });

        Self {
            endpoint: format!("http://{addr}/mcp"),
            state,
        }
    }

    /// How often `key` was seen: a JSON-RPC method or `"<VERB> <path>"`.
    pub fn count(&self, key: &str) -> usize {
        self.state.counts.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    /// Push a notification on the open event stream.
    pub fn notify(&self, method: &str, params: Value) {
        self.state.send(json!({ "jsonrpc": "2.0", "method": method, "params": params }));
    }
}

impl LegacyState {
    fn bump(&self, key: &str) {
        *self.counts.lock().unwrap().entry(key.to_string()).or_default() += 1;
    }

    fn send(&self, message: Value) {
        if let Some(stream) = self.stream.lock().unwrap().as_ref() {
            let _ = stream.send(format!("event: message\ndata: {message}\n\n"));
        }
    }

    fn reply(&self, id: &Value, result: Value) {
        self.send(json!({ "jsonrpc": "2.0", "id": id, "result": result }));
    }

    fn handle_message(&self, body: &Value) {
        let method = body["method"].as_str().unwrap_or_default();
        self.bump(method);

        let Some(id) = body.get("id") else {
            return;
        };

        match method {
            "initialize" => self.reply(
                id,
                initialize_result(json!({ "tools": { "listChanged": true } })),
            ),
            "ping" => self.reply(id, json!({})),
            "tools/list" => self.reply(
                id,
                json!({ "tools": [echo_tool(), { "name": "hangup", "inputSchema": { "type": "object" } }] }),
            ),
            "tools/call" if body["params"]["name"] == "hangup" => {
                self.stream.lock().unwrap().take();
            }
            "tools/call" => {
                let text = body["params"]["arguments"]["text"].clone();
                let response = json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": { "content": [{ "type": "text", "text": text }] }
                });

                let ready = {
                    let mut held = self.held.lock().unwrap();
                    held.push(response);
                    if held.len() >= self.batch {
                        std::mem::take(&mut *held)
                    } else {
                        Vec::new()
                    }
                };
                for response in ready.into_iter().rev() {
                    self.send(response);
                }
            }
            other => self.send(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": format!("Method not found: {other}") }
            })),
        }
    }
}

async fn handle_connection(socket: TcpStream, state: Arc<LegacyState>) {
    let mut reader = BufReader::new(socket);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await.unwrap_or(0) == 0 {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let verb = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();
    let path = target.split('?').next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
            return;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    if reader.read_exact(&mut body).await.is_err() {
        return;
    }
    let mut socket = reader.into_inner();

    state.bump(&format!("{verb} {path}"));

    match (verb.as_str(), path.as_str()) {
        ("GET", "/mcp") => {
            let (tx, mut rx) = mpsc::unbounded_channel::<String>();
            tx.send("event: endpoint\ndata: /messages?sessionId=abc\n\n".to_string())
                .unwrap();
            *state.stream.lock().unwrap() = Some(tx);

            let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n";
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            while let Some(chunk) = rx.recv().await {
                if socket.write_all(chunk.as_bytes()).await.is_err()
                    || socket.flush().await.is_err()
                {
                    return;
                }
            }
            let _ = socket.shutdown().await;
        }
        ("POST", "/messages") => {
            let _ = socket
                .write_all(b"HTTP/1.1 202 Accepted\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await;
            let _ = socket.shutdown().await;
            if let Ok(message) = serde_json::from_slice::<Value>(&body) {
                state.handle_message(&message);
            }
        }
        ("POST", "/mcp") => {
            let status = state.streamable_status;
            let head = format!(
                "HTTP/1.1 {status} Rejected\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
        _ => {
            let _ = socket
                .write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await;
            let _ = socket.shutdown().await;
        }
    }
}
