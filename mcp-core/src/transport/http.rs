//! Shared HTTP plumbing for both transports.

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response};
use url::Url;

use crate::config::{AuthConfig, ClientConfig};
use crate::error::{ConfigError, McpError, McpResult, TransportError};

/// Session header issued by Streamable HTTP servers.
pub const SESSION_ID_HEADER: &str = "Mcp-Session-Id";

/// Accept value for Streamable HTTP POSTs.
pub(crate) const ACCEPT_STREAMABLE: &str = "application/json, text/event-stream";

/// Accept value for long-lived event streams.
pub(crate) const ACCEPT_EVENT_STREAM: &str = "text/event-stream";

/// HTTP client plus the headers every request carries.
///
/// Cloning is cheap and clones share the authorization slot, so
/// [`HttpContext::set_authorization`] takes effect for every transport and
/// for the background listener on their next request.
#[derive(Debug, Clone)]
pub struct HttpContext {
    client: Client,
    headers: HeaderMap,
    authorization: Arc<RwLock<Option<String>>>,
}

impl HttpContext {
    /// Build the client from configuration.
    ///
    /// No overall request timeout is set on the client; event streams stay
    /// open indefinitely and per-exchange deadlines are enforced above the
    /// transport.
    pub fn new(config: &ClientConfig) -> McpResult<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let (name, value) = parse_header(name, value)?;
            headers.insert(name, value);
        }

        let mut authorization = None;
        match &config.auth {
            Some(AuthConfig::Bearer { token }) => authorization = Some(format!("Bearer {token}")),
            Some(AuthConfig::Header { name, value }) => {
                let (name, value) = parse_header(name, value)?;
                headers.insert(name, value);
            }
            None => {}
        }

        let client = Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                parameter: "http_client".to_string(),
                value: config.endpoint.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            headers,
            authorization: Arc::new(RwLock::new(authorization)),
        })
    }

    /// Replace the `Authorization` header value; `None` stops sending it.
    pub fn set_authorization(&self, value: Option<String>) {
        *self
            .authorization
            .write()
            .unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Current `Authorization` header value.
    pub fn authorization(&self) -> Option<String> {
        self.authorization
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start a request with configured headers and the current authorization.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .headers(self.headers.clone());

        match self.authorization() {
            Some(value) => builder.header(AUTHORIZATION, value),
            None => builder,
        }
    }
}

/// Turn a non-2xx response into [`TransportError::HttpError`], keeping the
/// body text (or the canonical reason) as the error reason.
pub(crate) async fn ensure_success(response: Response) -> McpResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let reason = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("unknown status").to_string()
    } else {
        body
    };

    Err(TransportError::HttpError {
        status_code: status.as_u16(),
        reason,
    }
    .into())
}

/// Wrap a reqwest failure that happened before any status was received.
pub(crate) fn network_error(transport_type: &str, err: reqwest::Error) -> McpError {
    if err.is_connect() {
        TransportError::ConnectionFailed {
            transport_type: transport_type.to_string(),
            reason: err.to_string(),
        }
        .into()
    } else {
        TransportError::NetworkError {
            transport_type: transport_type.to_string(),
            reason: err.to_string(),
        }
        .into()
    }
}

fn parse_header(name: &str, value: &str) -> McpResult<(HeaderName, HeaderValue)> {
    let header_name = name
        .parse::<HeaderName>()
        .map_err(|e| ConfigError::InvalidValue {
            parameter: "headers".to_string(),
            value: name.to_string(),
            reason: e.to_string(),
        })?;
    let header_value = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidValue {
        parameter: format!("headers.{name}"),
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    Ok((header_name, header_value))
}
