//! A typed client layer for CouchDB-style HTTP/JSON document databases.
//!
//! This crate is the core of the couchlayer project and provides:
//!
//! - **Query parameters** ([`query`]) - Typed parameter sets and their URL encoding
//! - **Transport abstraction** ([`transport`]) - The seam through which every request flows
//! - **Response mapping** ([`response`]) - Turning raw responses into results or classified errors
//! - **List projection** ([`list`]) - Parsing `_all_docs` responses into typed rows
//! - **Bulk writes** ([`bulk`]) - Building `_bulk_docs` requests and splicing their results back
//! - **Entities** ([`document`], [`entity`]) - Objects whose id and revision stay in sync with the server
//! - **Databases and the client** ([`database`], [`client`]) - The operations themselves
//! - **Error handling** ([`error`]) - The error type and server error classification
//!
//! # Example
//!
//! ```ignore
//! use couchlayer::prelude::*;
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
//! let client = CouchClient::new(transport);
//! let mut user = User { id: None, rev: None, name: "alice".into() };
//! client.entities::<User>("users").save(&mut user).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as couchlayer_core;

pub mod bulk;
pub mod client;
pub mod database;
pub mod document;
pub mod entity;
pub mod error;
pub mod list;
pub mod query;
pub mod response;
pub mod transport;
