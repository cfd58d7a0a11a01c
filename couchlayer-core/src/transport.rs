//! Transport abstraction for talking to the database server.
//!
//! The client never performs I/O itself. Every operation is reduced to a single
//! [`TransportRequest`] which a [`Transport`] implementation executes, returning the
//! raw [`TransportResponse`]. Retries, TLS, pooling and timeouts are the concern of
//! the implementation.
//!
//! # Traits
//!
//! - [`Transport`]: executes one HTTP exchange
//! - [`TransportBuilder`]: factory trait for creating transport instances
//!
//! # Examples
//!
//! ```ignore
//! use couchlayer::transport::{Transport, TransportRequest};
//!
//! let response = transport
//!     .execute(TransportRequest::get("_all_dbs"))
//!     .await?;
//! assert_eq!(response.status, 200);
//! ```

use async_trait::async_trait;
use http::Method;
use std::{fmt::Debug, sync::Arc};

use crate::error::CouchResult;

/// Content type sent with JSON bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// A single HTTP request, addressed relative to the server root unless the url is
/// absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Vec<u8>>,
    pub content_type: Option<String>,
}

impl TransportRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            content_type: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::HEAD, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Attaches a JSON body.
    pub fn json_body(self, body: impl Into<Vec<u8>>) -> Self {
        self.body(body, JSON_CONTENT_TYPE)
    }

    /// Attaches a body with an explicit content type.
    pub fn body(mut self, body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.content_type = Some(content_type.into());
        self
    }

    /// Returns the body as UTF-8 text, if any.
    pub fn body_text(&self) -> Option<&str> {
        self.body
            .as_deref()
            .and_then(|body| std::str::from_utf8(body).ok())
    }
}

/// The raw answer to a [`TransportRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Looks up a header, ignoring the case of its name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes HTTP exchanges on behalf of the client.
///
/// # Thread Safety
///
/// Implementations must be thread-safe. Independent requests may be executed
/// concurrently; the client imposes no ordering between them.
///
/// # Error Handling
///
/// Any response that arrives, whatever its status, is returned as `Ok`. Only a
/// failure to obtain a response is an error, reported as
/// [`CouchError::Transport`](crate::error::CouchError::Transport).
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Performs one request and returns the raw response.
    async fn execute(&self, request: TransportRequest) -> CouchResult<TransportResponse>;

    /// Cleanly shuts down the transport, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> CouchResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<T> Transport for &T
where
    T: Transport + ?Sized,
{
    async fn execute(&self, request: TransportRequest) -> CouchResult<TransportResponse> {
        (**self).execute(request).await
    }
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn execute(&self, request: TransportRequest) -> CouchResult<TransportResponse> {
        (**self).execute(request).await
    }
}

#[async_trait]
impl<T> Transport for Box<T>
where
    T: Transport + ?Sized,
{
    async fn execute(&self, request: TransportRequest) -> CouchResult<TransportResponse> {
        (**self).execute(request).await
    }
}

/// Executes a request, logging the exchange.
pub(crate) async fn send<T>(transport: &T, request: TransportRequest) -> CouchResult<TransportResponse>
where
    T: Transport + ?Sized,
{
    let method = request.method.clone();
    let url = request.url.clone();

    tracing::debug!(%method, %url, "sending request");

    let response = transport.execute(request).await?;

    tracing::debug!(%method, %url, status = response.status, "received response");

    Ok(response)
}

/// Factory trait for creating transport instances.
#[async_trait]
pub trait TransportBuilder {
    type Transport: Transport;

    /// Builds and returns a new transport.
    ///
    /// # Errors
    ///
    /// Returns [`CouchError::Initialization`](crate::error::CouchError::Initialization)
    /// if the transport cannot be constructed.
    async fn build(self) -> CouchResult<Self::Transport>;
}
