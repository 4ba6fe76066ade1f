use crate::transport::TransportError;
use crate::Result;
use reqwest::header::HeaderMap;
use reqwest::{Proxy, StatusCode};
use serde_json::Value;
use std::env;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Build the reqwest client an adapter keeps for its lifetime.
///
/// `default_headers` carries static credentials (bearer token, vendor key header).
/// Per-request signatures are attached by the adapter, never here.
pub fn build_client(default_headers: HeaderMap) -> Result<reqwest::Client> {
    // Minimal production-friendly defaults (env-overridable).
    let timeout_secs = env::var("SAYM_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    let mut builder = reqwest::Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(timeout_secs))
        .pool_idle_timeout(Some(Duration::from_secs(90)));

    if let Ok(proxy_url) = env::var("SAYM_PROXY_URL") {
        match Proxy::all(&proxy_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => tracing::warn!(proxy = %proxy_url, "ignoring invalid SAYM_PROXY_URL: {}", e),
        }
    }

    builder
        .build()
        .map_err(|e| crate::Error::Transport(TransportError::Other(e.to_string())))
}

/// A failed HTTP exchange, kept in every shape a vendor might have used so each
/// adapter can walk its own ordered fallback chain.
#[derive(Debug, Clone)]
pub struct ErrorBody {
    status: Option<StatusCode>,
    raw: String,
    json: Option<Value>,
    transport: String,
}

impl ErrorBody {
    /// Consume a non-success response.
    pub async fn from_response(resp: reqwest::Response) -> Self {
        let status = resp.status();
        let raw = match resp.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("failed to read error body: {}", e);
                String::new()
            }
        };
        Self::from_parts(Some(status), raw)
    }

    /// A failure that never produced a response (connect error, timeout).
    pub fn from_transport(err: &reqwest::Error) -> Self {
        Self {
            status: err.status(),
            raw: String::new(),
            json: None,
            transport: err.to_string(),
        }
    }

    pub fn from_parts(status: Option<StatusCode>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let json = serde_json::from_str::<Value>(&raw).ok();
        let transport = match status {
            Some(s) => format!("Request failed with status code {}", s.as_u16()),
            None => "Request failed".to_string(),
        };
        Self {
            status,
            raw,
            json,
            transport,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Body that is a bare JSON string (`"Unauthorized"`).
    pub fn json_string(&self) -> Option<String> {
        self.json
            .as_ref()
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.is_empty())
    }

    /// String found at a JSON pointer such as `/detail/message`.
    pub fn str_at(&self, pointer: &str) -> Option<String> {
        self.json
            .as_ref()
            .and_then(|v| v.pointer(pointer))
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.is_empty())
    }

    /// Raw body text when it is not JSON.
    pub fn text(&self) -> Option<String> {
        if self.json.is_some() {
            return None;
        }
        let trimmed = self.raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Transport-level description, the last resort of every chain.
    pub fn transport_text(&self) -> String {
        self.transport.clone()
    }
}
