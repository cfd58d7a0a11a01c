//! Main couchlayer crate providing a typed client for CouchDB-style document
//! databases.
//!
//! This crate is the primary entry point for users of couchlayer. It re-exports
//! the core types from the sub-crates and gives access to the available
//! transports.
//!
//! # Features
//!
//! - **Typed entities** - Define documents with Serde and `#[derive(Entity)]`; ids and revisions stay in sync
//! - **Classified errors** - Server error tokens map onto a closed set of common kinds
//! - **Bulk writes** - One round trip, per-document results spliced back onto the inputs
//! - **Pluggable transports** - A scripted mock for tests and an HTTP transport (requires `http` feature)
//!
//! # Quick Start
//!
//! ```ignore
//! use couchlayer::{prelude::*, http::HttpTransport};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Entity)]
//! pub struct User {
//!     #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
//!     pub id: Option<String>,
//!     #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
//!     pub rev: Option<String>,
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CouchClient::new(HttpTransport::builder("http://localhost:5984").build().await?);
//!     let users = client.entities::<User>("users");
//!
//!     let mut user = User { id: None, rev: None, name: "Alice".to_string() };
//!     users.save(&mut user).await?;
//!
//!     let listed = users.list_all(ListQuery::new().limit(10)).await?;
//!     println!("{} users", listed.total_rows);
//!
//!     users.delete(&mut user).await?;
//!     client.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Transports
//!
//! - [`mock`] - Scripted responses and recorded requests for tests
//! - [`http`] - reqwest-based HTTP transport (requires `http` feature)

pub mod prelude;

pub use couchlayer_core::{bulk, client, database, document, entity, error, list, query, response, transport};
pub use couchlayer_macros::Entity;

// Re-exported for implementing `Transport` and building raw documents
pub use async_trait::async_trait;
pub use serde_json;

/// Scripted transport for tests.
pub mod mock {
    pub use couchlayer_mock::{MockReply, MockTransport, MockTransportBuilder};
}

/// HTTP transport.
///
/// This module is only available when the `http` feature is enabled.
#[cfg(feature = "http")]
pub mod http {
    pub use couchlayer_http::{HttpTransport, HttpTransportBuilder, HttpTransportConfig};
}
