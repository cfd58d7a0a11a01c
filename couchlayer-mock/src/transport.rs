//! The scripted transport and its builder.

use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use mea::rwlock::RwLock;
use serde_json::Value;

use couchlayer_core::{
    error::{CouchError, CouchResult},
    transport::{JSON_CONTENT_TYPE, Transport, TransportBuilder, TransportRequest, TransportResponse},
};

/// One scripted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// A response that arrived, whatever its status.
    Response(TransportResponse),
    /// A failure to obtain any response.
    Failure(String),
}

impl MockReply {
    /// A response with a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        MockReply::Response(
            TransportResponse::new(status, body.to_string()).with_header("Content-Type", JSON_CONTENT_TYPE),
        )
    }

    /// A response whose body is sent as is.
    pub fn raw(status: u16, body: impl Into<Vec<u8>>) -> Self {
        MockReply::Response(TransportResponse::new(status, body))
    }
}

impl From<TransportResponse> for MockReply {
    fn from(response: TransportResponse) -> Self {
        MockReply::Response(response)
    }
}

/// Transport that replays scripted replies in order and records every request.
///
/// Clones share the same script and request log, so a test can keep one clone
/// while the client owns another.
///
/// A request arriving after the script is exhausted fails with
/// [`CouchError::Transport`].
#[derive(Default, Clone, Debug)]
pub struct MockTransport {
    replies: Arc<RwLock<VecDeque<MockReply>>>,
    requests: Arc<RwLock<Vec<TransportRequest>>>,
}

impl MockTransport {
    /// Creates a transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that replays `replies` in order.
    pub fn with_replies(replies: impl IntoIterator<Item = MockReply>) -> Self {
        Self {
            replies: Arc::new(RwLock::new(replies.into_iter().collect())),
            requests: Arc::default(),
        }
    }

    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder::default()
    }

    /// Appends a reply to the script.
    pub async fn push(&self, reply: impl Into<MockReply>) {
        self.replies.write().await.push_back(reply.into());
    }

    /// Appends a JSON reply to the script.
    pub async fn push_json(&self, status: u16, body: &Value) {
        self.push(MockReply::json(status, body)).await;
    }

    /// Returns a copy of every request received so far, oldest first.
    pub async fn requests(&self) -> Vec<TransportRequest> {
        self.requests.read().await.clone()
    }

    /// Returns the most recent request, if any.
    pub async fn last_request(&self) -> Option<TransportRequest> {
        self.requests.read().await.last().cloned()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Number of scripted replies not yet consumed.
    pub async fn remaining(&self) -> usize {
        self.replies.read().await.len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: TransportRequest) -> CouchResult<TransportResponse> {
        let description = format!("{} {}", request.method, request.url);
        self.requests.write().await.push(request);

        match self.replies.write().await.pop_front() {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Failure(message)) => Err(CouchError::Transport(message)),
            None => {
                tracing::warn!(request = %description, "no scripted reply left");
                Err(CouchError::Transport(format!("no scripted reply for {description}")))
            }
        }
    }
}

/// Builder for [`MockTransport`] scripts.
#[derive(Default, Debug)]
pub struct MockTransportBuilder {
    replies: Vec<MockReply>,
}

impl MockTransportBuilder {
    pub fn reply(mut self, reply: impl Into<MockReply>) -> Self {
        self.replies.push(reply.into());
        self
    }

    pub fn respond_json(self, status: u16, body: Value) -> Self {
        self.reply(MockReply::json(status, &body))
    }

    pub fn respond_raw(self, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.reply(MockReply::raw(status, body))
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.reply(MockReply::Failure(message.into()))
    }
}

#[async_trait]
impl TransportBuilder for MockTransportBuilder {
    type Transport = MockTransport;

    async fn build(self) -> CouchResult<MockTransport> {
        Ok(MockTransport::with_replies(self.replies))
    }
}
