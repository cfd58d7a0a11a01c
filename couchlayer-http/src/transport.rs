//! The reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url, header::CONTENT_TYPE};

use couchlayer_core::{
    error::{CouchError, CouchResult},
    transport::{Transport, TransportBuilder, TransportRequest, TransportResponse},
};

use crate::config::HttpTransportConfig;

/// Transport executing requests over HTTP.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a builder for a server at `base_url`, other settings at defaults.
    pub fn builder(base_url: &str) -> HttpTransportBuilder {
        HttpTransportBuilder::new(HttpTransportConfig::new(base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves a request url against the base url. Absolute urls pass through.
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }

        format!("{}/{}", self.base_url, url.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: TransportRequest) -> CouchResult<TransportResponse> {
        let url = self.resolve(&request.url);
        let mut builder = self.client.request(request.method.clone(), &url);

        if let Some(content_type) = &request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(method = %request.method, %url, error = %e, "request failed");
            CouchError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
            .collect();

        let body = response.bytes().await.map_err(|e| {
            tracing::warn!(method = %request.method, %url, error = %e, "reading response body failed");
            CouchError::Transport(e.to_string())
        })?;

        Ok(TransportResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

/// Builds an [`HttpTransport`] from an [`HttpTransportConfig`].
#[derive(Debug, Clone)]
pub struct HttpTransportBuilder {
    config: HttpTransportConfig,
    timeout: Duration,
}

impl HttpTransportBuilder {
    pub fn new(config: HttpTransportConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            config,
        }
    }

    /// Overrides the configured timeout, keeping sub-second precision.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.accept_invalid_certs = accept;
        self
    }
}

#[async_trait]
impl TransportBuilder for HttpTransportBuilder {
    type Transport = HttpTransport;

    async fn build(self) -> CouchResult<HttpTransport> {
        let config = self.config;

        if self.timeout.is_zero() {
            return Err(CouchError::Initialization("timeout must be positive".to_string()));
        }

        Url::parse(&config.base_url)
            .map_err(|e| CouchError::Initialization(format!("invalid base url {:?}: {e}", config.base_url)))?;

        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(config.user_agent)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| CouchError::Initialization(e.to_string()))?;

        Ok(HttpTransport {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}
