//! Outbound HTTP for scripts.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use scripthost_protocols::ScriptError;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Arguments of `fetch(url, options)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into().to_ascii_uppercase();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Result of a fetch; the body is fully read.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub ok: bool,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn text(&self) -> Result<String, ScriptError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| ScriptError::Fetch(format!("response body is not UTF-8: {}", e)))
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ScriptError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ScriptError::Fetch(format!("response body is not valid JSON: {}", e)))
    }
}

/// Collaborator that performs outbound HTTP requests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, ScriptError>;
}

/// [`Fetcher`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ScriptError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScriptError::Fetch(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, ScriptError> {
        if request.url.trim().is_empty() {
            return Err(ScriptError::validation("fetch: url is required"));
        }
        let method = reqwest::Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| ScriptError::validation(format!("fetch: invalid method {}", request.method)))?;
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| ScriptError::validation(format!("fetch: invalid url {}: {}", request.url, e)))?;

        debug!("fetch {} {}", method, url);
        let mut builder = self.client.request(method, url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ScriptError::Fetch(e.to_string()))?;

        let status = response.status();
        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in response.headers() {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| ScriptError::Fetch(e.to_string()))?;

        Ok(FetchResponse {
            ok: status.is_success(),
            status: status.as_u16(),
            status_text: status.to_string(),
            headers,
            body,
        })
    }
}
