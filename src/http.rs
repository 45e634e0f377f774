// http.rs - Outbound HTTP behind a small trait so the pipeline can be driven
// without a network in tests. Timeouts are applied here, not in the client.

use async_trait::async_trait;
use log::{debug, info, trace};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::config::DEFAULT_USER_AGENT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body),
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        for (name, value) in headers {
            match self.headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
                Some(existing) => existing.1 = value,
                None => self.headers.push((name, value)),
            }
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as JSON, None when it isn't.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("network failure: {0}")]
    Network(String),
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Run one request bounded by `timeout`.
pub async fn execute(
    transport: &dyn HttpTransport,
    request: HttpRequest,
    timeout: Duration,
) -> Result<HttpResponse, TransportError> {
    trace!("[TRACE][HTTP] {} {} (timeout {:?})", request.method, redact(&request.url), timeout);
    match tokio::time::timeout(timeout, transport.send(request)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout),
    }
}

/// Strip query strings from logged URLs; some carry API keys.
pub fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

// Global HTTP client for connection pooling and reuse
static HTTP_CLIENT: OnceCell<reqwest::Client> = OnceCell::const_new();

pub struct ReqwestTransport {
    user_agent: String,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

impl ReqwestTransport {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    async fn client(&self) -> Result<&'static reqwest::Client, TransportError> {
        let user_agent = self.user_agent.clone();
        HTTP_CLIENT
            .get_or_try_init(|| async move {
                info!("🌐 Initializing shared HTTP client");
                reqwest::Client::builder()
                    .connect_timeout(Duration::from_secs(10))
                    .pool_idle_timeout(Duration::from_secs(90))
                    .pool_max_idle_per_host(10)
                    .user_agent(user_agent)
                    .build()
                    .map_err(|e| TransportError::Network(e.to_string()))
            })
            .await
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = self.client().await?;
        let mut builder = match request.method {
            Method::Get => client.get(&request.url),
            Method::Post => client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Network(e.to_string())
            }
        })?;
        let status = response.status().as_u16();
        debug!("📡 {} {} -> {}", request.method, redact(&request.url), status);
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}
