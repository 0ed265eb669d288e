//! Network transport for the classification services
//!
//! Every service is an ArcGIS REST endpoint answering a GET with a query
//! string. The transport is injected into each source so resolution can run
//! against live services (`ReqwestTransport`) or recorded payloads
//! (`CannedTransport`).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Default HTTP timeout for a single service call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// User agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("geoenvo/", env!("CARGO_PKG_VERSION"));

/// One GET request against a classification service
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRequest {
    /// Name of the source issuing the request (for logging)
    pub source: &'static str,
    pub base_url: String,
    pub params: Vec<(String, String)>,
}

impl SourceRequest {
    pub fn new(source: &'static str, base_url: impl Into<String>) -> Self {
        Self {
            source,
            base_url: base_url.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Look up a query parameter by name
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Fetches JSON payloads from a classification service
///
/// Implementations never fail: any transport, status or decode failure is
/// logged and an empty JSON object is returned instead.
#[async_trait]
pub trait SourceTransport: Send + Sync {
    async fn get_json(&self, request: &SourceRequest) -> JsonValue;
}

/// The empty payload a failed call degrades to
pub fn empty_payload() -> JsonValue {
    JsonValue::Object(serde_json::Map::new())
}

// =============================================================================
// reqwest
// =============================================================================

/// HTTP transport backed by reqwest
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http })
    }

    /// Client with the default timeout and user agent
    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    async fn try_get_json(&self, request: &SourceRequest) -> Result<JsonValue> {
        let response = self
            .http
            .get(&request.base_url)
            .query(&request.params)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", request.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "{} returned {}: {}",
                request.source,
                status,
                body.chars().take(200).collect::<String>()
            ));
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", request.base_url))
    }
}

#[async_trait]
impl SourceTransport for ReqwestTransport {
    async fn get_json(&self, request: &SourceRequest) -> JsonValue {
        match self.try_get_json(request).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(source = request.source, "Request failed: {:#}", e);
                empty_payload()
            }
        }
    }
}

// =============================================================================
// Canned
// =============================================================================

/// Replays recorded payloads keyed by endpoint URL
///
/// Unknown endpoints answer with the empty payload. Every request is
/// recorded so callers can assert on what would have been sent.
#[derive(Default)]
pub struct CannedTransport {
    responses: HashMap<String, JsonValue>,
    requests: Mutex<Vec<SourceRequest>>,
}

impl CannedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests to `base_url` with `payload`
    pub fn with_response(mut self, base_url: impl Into<String>, payload: JsonValue) -> Self {
        self.responses.insert(base_url.into(), payload);
        self
    }

    /// Requests received so far, in arrival order
    pub fn requests(&self) -> Vec<SourceRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl SourceTransport for CannedTransport {
    async fn get_json(&self, request: &SourceRequest) -> JsonValue {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }
        self.responses
            .get(&request.base_url)
            .cloned()
            .unwrap_or_else(empty_payload)
    }
}
