//! # MCP Core Library
//!
//! `mcp-core` is a client for the Model Context Protocol (MCP): JSON-RPC 2.0
//! over HTTP, used to discover and invoke the tools, prompts and resources an
//! MCP server exposes.
//!
//! ## Features
//!
//! - **Transport negotiation**: Streamable HTTP first, legacy HTTP+SSE when
//!   the server rejects it with 404/405
//! - **Session management**: lazy handshake, `Mcp-Session-Id` tracking and
//!   session termination on close
//! - **Notifications**: inline, on the legacy stream, or through a
//!   reconnecting background listener with exponential backoff
//! - **Local validation**: tool calls are checked against the cached catalog
//!   and the tool's JSON Schema before anything is sent
//! - **Pagination**: list operations follow `nextCursor` to the end
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mcp_core::{ClientConfig, McpClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("http://localhost:8080/mcp")?;
//!     let client = McpClient::new(config)?;
//!
//!     let server = client.initialize().await?;
//!     println!("Connected to: {}", server.implementation.name);
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`error`]: error taxonomy shared by every layer
//! - [`messages`]: JSON-RPC envelopes and MCP payloads
//! - [`config`]: client configuration and file loading
//! - [`transport`]: Streamable HTTP and legacy SSE transports
//! - [`client`]: the session-level client
//! - [`catalog`] and [`validation`]: cached tools and argument checks
//! - [`listener`] and [`notify`]: server notification delivery
//! - [`pagination`]: cursor-driven listing

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod listener;
pub mod messages;
pub mod notify;
pub mod pagination;
pub mod transport;
pub mod validation;

pub use client::{ClientState, McpClient, ServerInfo};
pub use config::{AuthConfig, ClientConfig, ListenerConfig};
pub use error::{McpError, McpResult};
pub use notify::NotificationHandler;
pub use transport::TransportKind;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
