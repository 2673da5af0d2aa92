//! HTTP transport for the CarIn API gateway
//!
//! `Transport` is the seam between the request pipeline and the network. The
//! production implementation wraps `reqwest`; tests script responses instead.

use std::future::Future;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{CarinError, Result};

/// Message used when a failed response carries no usable `message` field
pub const FALLBACK_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Outgoing API call, before and after the bearer token is attached
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// Raw gateway response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The server's `message`, or the generic fallback
    pub fn error_message(&self) -> String {
        self.body
            .get("message")
            .and_then(|m| match m {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                // Validation errors sometimes arrive as a list of messages
                Value::Array(items) if !items.is_empty() => Some(
                    items
                        .iter()
                        .filter_map(|i| i.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                ),
                _ => None,
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string())
    }

    pub fn into_json<R: DeserializeOwned>(self) -> Result<R> {
        serde_json::from_value(self.body).map_err(|e| {
            CarinError::invalid_response(format!("Unexpected response shape: {}", e))
        })
    }
}

/// Sends one request and returns the response whatever its status
///
/// Only transport-level failures are errors; status handling belongs to the
/// caller.
pub trait Transport: Send + Sync {
    fn send(&self, request: ApiRequest) -> impl Future<Output = Result<ApiResponse>> + Send;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut client_builder = Client::builder().timeout(config.request_timeout());

        if !config.use_proxy {
            client_builder = client_builder.no_proxy();
        }

        let client = client_builder.build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.config.endpoint_url(&request.path);

        let mut request_builder = self
            .client
            .request(request.method, &url)
            .header("Accept", "application/json");

        if !request.query.is_empty() {
            request_builder = request_builder.query(&request.query);
        }

        if let Some(token) = &request.bearer {
            request_builder = request_builder.bearer_auth(token);
        }

        if let Some(body) = &request.body {
            request_builder = request_builder.json(body);
        }

        let response = request_builder.send().await?;
        let status = response.status().as_u16();
        let response_text = response.text().await?;

        let body = if response_text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&response_text).unwrap_or(Value::String(response_text))
        };

        Ok(ApiResponse { status, body })
    }
}
