//! Error types for MCP client operations.
//!
//! Every fallible operation in this crate returns [`McpResult`]. Errors are
//! grouped by where they originate:
//! - **Transport**: HTTP status failures, dropped streams, network faults
//! - **Protocol**: JSON-RPC error objects returned by the server, malformed replies
//! - **Validation**: tool calls rejected locally before anything is sent
//! - **Config**: unreadable or inconsistent client configuration
//!
//! Locally raised validation failures carry standard JSON-RPC codes so that
//! callers can treat them exactly like server-reported errors (see
//! [`McpError::code`]).

use std::time::Duration;
use thiserror::Error;

use crate::messages::{error_codes, JsonRpcError};

/// The main error type for all MCP client operations.
///
/// # Examples
///
/// ```rust
/// use mcp_core::error::{McpError, TransportError};
///
/// let error = McpError::Transport(TransportError::HttpError {
///     status_code: 404,
///     reason: "Not Found".to_string(),
/// });
///
/// assert_eq!(error.http_status(), Some(404));
/// println!("Error: {}", error);
/// ```
#[derive(Error, Debug)]
pub enum McpError {
    /// Transport-related errors (HTTP status, stream failures, network)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Protocol-level errors (server error objects, malformed responses)
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Tool call rejected before it reached the server
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Operations that exceeded their deadline
    #[error("Operation timed out after {duration_ms}ms: {operation}")]
    Timeout {
        /// The operation that timed out
        operation: String,
        /// The timeout duration in milliseconds
        duration_ms: u64,
    },

    /// Configuration errors (invalid config files, missing parameters, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        /// The underlying serde_json error
        source: serde_json::Error,
    },
}

/// Errors raised by the HTTP transports.
#[derive(Error, Debug, Clone)]
#[allow(missing_docs)]
pub enum TransportError {
    /// Failed to establish a connection to the MCP server
    #[error("Failed to connect to {transport_type} server: {reason}")]
    ConnectionFailed {
        transport_type: String,
        reason: String,
    },

    /// The server answered with a non-success HTTP status
    #[error("HTTP error: {status_code} - {reason}")]
    HttpError { status_code: u16, reason: String },

    /// Malformed or unexpected Server-Sent Events traffic
    #[error("SSE error: {reason}")]
    SseError { reason: String },

    /// The stream carrying responses ended while calls were outstanding
    #[error("Stream closed ({transport_type}): {reason}")]
    StreamClosed {
        transport_type: String,
        reason: String,
    },

    /// Generic network error
    #[error("Network error ({transport_type}): {reason}")]
    NetworkError {
        transport_type: String,
        reason: String,
    },
}

/// Protocol-level errors related to JSON-RPC message handling.
#[derive(Error, Debug, Clone)]
#[allow(missing_docs)]
pub enum ProtocolError {
    /// Server returned a JSON-RPC error object
    #[error("Server error {code}: {message}")]
    ServerError {
        code: i32,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Invalid or malformed response
    #[error("Invalid response: {reason}")]
    InvalidResponse { reason: String },

    /// Request could not be expressed on the active transport
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },
}

/// Tool call rejections produced from the local tool catalog.
#[derive(Error, Debug, Clone)]
#[allow(missing_docs)]
pub enum ValidationError {
    /// The tool is not present in the server's advertised tool list
    #[error("Tool '{tool}' not found")]
    UnknownTool { tool: String },

    /// Arguments do not satisfy the tool's input schema
    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The tool's declared input schema cannot be compiled
    #[error("Invalid input schema for tool '{tool}': {reason}")]
    InvalidSchema { tool: String, reason: String },
}

/// Configuration-related errors.
#[derive(Error, Debug, Clone)]
#[allow(missing_docs)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Configuration file has invalid format
    #[error("Invalid configuration format in {path}: {reason}")]
    InvalidFormat { path: String, reason: String },

    /// Required configuration parameter is missing
    #[error("Missing required configuration parameter: {parameter}")]
    MissingParameter { parameter: String },

    /// Configuration parameter has invalid value
    #[error("Invalid value for parameter '{parameter}': {value} - {reason}")]
    InvalidValue {
        parameter: String,
        value: String,
        reason: String,
    },
}

/// Convenience type alias for Results using McpError.
pub type McpResult<T> = Result<T, McpError>;

impl McpError {
    /// Create a new timeout error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mcp_core::error::McpError;
    /// use std::time::Duration;
    ///
    /// let error = McpError::timeout("tools/list", Duration::from_secs(30));
    /// assert!(error.is_retryable());
    /// ```
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// JSON-RPC error code carried by this error, if any.
    ///
    /// Server-reported errors keep the code the server sent. Local tool-call
    /// rejections map onto the standard codes: unknown tool is `-32601`,
    /// invalid arguments is `-32602` and an uncompilable schema is `-32603`.
    pub fn code(&self) -> Option<i32> {
        match self {
            McpError::Protocol(ProtocolError::ServerError { code, .. }) => Some(*code),
            McpError::Validation(err) => Some(err.code()),
            _ => None,
        }
    }

    /// Render this error as a JSON-RPC error object when it has a code.
    pub fn rpc_error(&self) -> Option<JsonRpcError> {
        match self {
            McpError::Protocol(ProtocolError::ServerError {
                code,
                message,
                data,
            }) => Some(JsonRpcError::new(*code, message.clone(), data.clone())),
            McpError::Validation(err) => Some(JsonRpcError::new(err.code(), err.to_string(), None)),
            _ => None,
        }
    }

    /// HTTP status code when the error came from a non-success response.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            McpError::Transport(TransportError::HttpError { status_code, .. }) => {
                Some(*status_code)
            }
            _ => None,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Network faults and timeouts may succeed on a second attempt; server
    /// rejections and local validation failures will not.
    pub fn is_retryable(&self) -> bool {
        match self {
            McpError::Transport(transport_err) => transport_err.is_retryable(),
            McpError::Timeout { .. } => true,
            McpError::Protocol(_) => false,
            McpError::Validation(_) => false,
            McpError::Config(_) => false,
            McpError::Serialization { .. } => false,
        }
    }

    /// Get the error category for this error.
    pub fn category(&self) -> &'static str {
        match self {
            McpError::Transport(_) => "transport",
            McpError::Protocol(_) => "protocol",
            McpError::Validation(_) => "validation",
            McpError::Timeout { .. } => "timeout",
            McpError::Config(_) => "config",
            McpError::Serialization { .. } => "serialization",
        }
    }
}

impl TransportError {
    /// Check if this transport error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::ConnectionFailed { .. } => true,
            TransportError::NetworkError { .. } => true,
            TransportError::StreamClosed { .. } => true,
            TransportError::SseError { .. } => true,
            TransportError::HttpError { status_code, .. } => {
                // 5xx errors are generally retryable, 4xx are not
                *status_code >= 500
            }
        }
    }
}

impl ValidationError {
    /// JSON-RPC error code reported for this rejection.
    pub fn code(&self) -> i32 {
        match self {
            ValidationError::UnknownTool { .. } => error_codes::METHOD_NOT_FOUND,
            ValidationError::InvalidArguments { .. } => error_codes::INVALID_PARAMS,
            ValidationError::InvalidSchema { .. } => error_codes::INTERNAL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = McpError::timeout("test operation", Duration::from_secs(30));
        assert_eq!(
            error.to_string(),
            "Operation timed out after 30000ms: test operation"
        );
    }

    #[test]
    fn test_validation_codes() {
        let unknown = McpError::from(ValidationError::UnknownTool {
            tool: "missing".to_string(),
        });
        assert_eq!(unknown.code(), Some(-32601));

        let invalid = McpError::from(ValidationError::InvalidArguments {
            tool: "echo".to_string(),
            reason: "\"text\" is a required property".to_string(),
        });
        assert_eq!(invalid.code(), Some(-32602));

        let schema = McpError::from(ValidationError::InvalidSchema {
            tool: "broken".to_string(),
            reason: "bad type".to_string(),
        });
        assert_eq!(schema.code(), Some(-32603));
    }

    #[test]
    fn test_server_error_round_trips_to_rpc_error() {
        let error = McpError::from(ProtocolError::ServerError {
            code: -32000,
            message: "tool exploded".to_string(),
            data: Some(serde_json::json!({"detail": "stack"})),
        });

        assert_eq!(error.code(), Some(-32000));
        let rpc = error.rpc_error().unwrap();
        assert_eq!(rpc.code, -32000);
        assert_eq!(rpc.message, "tool exploded");
        assert!(rpc.data.is_some());
    }

    #[test]
    fn test_validation_renders_as_rpc_error() {
        let error = McpError::from(ValidationError::UnknownTool {
            tool: "missing".to_string(),
        });

        let rpc = error.rpc_error().unwrap();
        assert_eq!(rpc, JsonRpcError::new(-32601, "Tool 'missing' not found", None));
    }

    #[test]
    fn test_codes_absent_for_transport_errors() {
        let error = McpError::Transport(TransportError::HttpError {
            status_code: 405,
            reason: "Method Not Allowed".to_string(),
        });
        assert_eq!(error.code(), None);
        assert!(error.rpc_error().is_none());
        assert_eq!(error.http_status(), Some(405));
    }

    #[test]
    fn test_retryable_errors() {
        let timeout = McpError::timeout("test", Duration::from_secs(30));
        assert!(timeout.is_retryable());

        let rejected = McpError::from(ValidationError::UnknownTool {
            tool: "nope".to_string(),
        });
        assert!(!rejected.is_retryable());

        let server_side = TransportError::HttpError {
            status_code: 503,
            reason: "Service Unavailable".to_string(),
        };
        assert!(server_side.is_retryable());

        let client_side = TransportError::HttpError {
            status_code: 400,
            reason: "Bad Request".to_string(),
        };
        assert!(!client_side.is_retryable());
    }

    #[test]
    fn test_error_categories() {
        let timeout = McpError::timeout("test", Duration::from_secs(30));
        assert_eq!(timeout.category(), "timeout");

        let transport_error = McpError::Transport(TransportError::StreamClosed {
            transport_type: "sse".to_string(),
            reason: "stream closed".to_string(),
        });
        assert_eq!(transport_error.category(), "transport");
    }
}
