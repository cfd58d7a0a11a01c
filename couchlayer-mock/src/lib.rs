//! Scripted transport for testing code built on couchlayer.
//!
//! [`MockTransport`] answers requests from a queue of scripted responses and
//! records every request it receives, so tests can assert both what the client
//! did with a response and exactly what it put on the wire.
//!
//! # Quick Start
//!
//! ```ignore
//! use couchlayer::{prelude::*, mock::MockTransport};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn saves_a_document() {
//!     let transport = MockTransport::builder()
//!         .respond_json(201, json!({ "ok": true, "id": "a", "rev": "1-x" }))
//!         .build()
//!         .await
//!         .unwrap();
//!
//!     let client = CouchClient::new(transport.clone());
//!     client.database("db").save_document(r#"{"_id":"a"}"#, None).await.unwrap();
//!
//!     assert_eq!(transport.requests().await[0].url, "db");
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as couchlayer_mock;

pub mod transport;

pub use transport::{MockReply, MockTransport, MockTransportBuilder};
