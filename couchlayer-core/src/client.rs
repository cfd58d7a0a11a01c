//! Main client interface for talking to a database server.
//!
//! [`CouchClient`] owns a [`Transport`] and hands out handles on individual
//! databases:
//!
//! - [`Database`] - Untyped document operations on raw JSON
//! - [`Entities`] - Typed document operations on an [`Entity`] type
//!
//! Server-level operations (database management, server info, uuids) live on the
//! client itself.
//!
//! # Example
//!
//! ```ignore
//! use couchlayer::prelude::*;
//!
//! let client = CouchClient::new(transport);
//! client.create_database("users").await?;
//! let users = client.entities::<User>("users");
//! ```

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    database::{Database, escape_segment, require},
    document::Entity,
    entity::Entities,
    error::{CouchError, CouchResult},
    response::{NotFound, Outcome, expect_success, map_response},
    transport::{Transport, TransportRequest, TransportResponse, send},
};

/// The server's welcome message, as returned by `GET /`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerInfo {
    pub couchdb: String,
    pub version: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub vendor: Option<Value>,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UuidsBody {
    uuids: Vec<String>,
}

/// A database server client bound to a specific transport implementation.
///
/// # Type Parameters
///
/// * `T` - The transport implementation type
#[derive(Debug)]
pub struct CouchClient<T: Transport> {
    transport: T,
}

impl<T: Transport> CouchClient<T> {
    /// Creates a new client over the given transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Gets an untyped handle on the named database.
    ///
    /// No request is made; the database need not exist yet.
    pub fn database<'a>(&'a self, name: &str) -> Database<'a, T> {
        Database::new(name.to_string(), &self.transport)
    }

    /// Gets a handle on the named database whose documents are typed as `E`.
    pub fn entities<'a, E: Entity>(&'a self, database: &str) -> Entities<'a, T, E> {
        Entities::new(self.database(database))
    }

    async fn send(&self, request: TransportRequest) -> CouchResult<TransportResponse> {
        send(&self.transport, request).await
    }

    /// Fetches the server's welcome message.
    pub async fn server_info(&self) -> CouchResult<ServerInfo> {
        let response = self.send(TransportRequest::get("")).await?;

        map_response(&response, NotFound::Fail)?
            .into_option()
            .ok_or_else(|| CouchError::MalformedResponse("expected a server info body".to_string()))
    }

    /// Lists the names of all databases.
    pub async fn all_databases(&self) -> CouchResult<Vec<String>> {
        let response = self.send(TransportRequest::get("_all_dbs")).await?;

        Ok(map_response(&response, NotFound::Fail)?
            .into_option()
            .unwrap_or_default())
    }

    /// Creates a database.
    ///
    /// # Errors
    ///
    /// Returns [`CouchError::Server`] with a `file_exists` error if the database
    /// already exists.
    pub async fn create_database(&self, name: &str) -> CouchResult<()> {
        require("database name", name)?;

        let response = self
            .send(TransportRequest::put(escape_segment(name)))
            .await?;

        expect_success(&response, NotFound::Fail)?;
        Ok(())
    }

    /// Deletes a database. Returns `false` if it did not exist.
    pub async fn delete_database(&self, name: &str) -> CouchResult<bool> {
        require("database name", name)?;

        let response = self
            .send(TransportRequest::delete(escape_segment(name)))
            .await?;

        Ok(!expect_success(&response, NotFound::Tolerate)?.is_tolerated())
    }

    /// Returns `true` if the named database exists.
    pub async fn database_exists(&self, name: &str) -> CouchResult<bool> {
        require("database name", name)?;

        self.database(name).exists().await
    }

    /// Asks the server for `count` fresh uuids.
    ///
    /// # Errors
    ///
    /// Returns [`CouchError::InvalidArgument`] if `count` is zero, and
    /// [`CouchError::MalformedResponse`] if the server returns something that is
    /// not a uuid.
    pub async fn uuids(&self, count: u32) -> CouchResult<Vec<Uuid>> {
        if count == 0 {
            return Err(CouchError::invalid_argument("uuid count must be positive"));
        }

        let response = self
            .send(TransportRequest::get(format!("_uuids?count={count}")))
            .await?;

        let body: UuidsBody = match map_response(&response, NotFound::Fail)? {
            Outcome::Decoded(body) => body,
            Outcome::NotFoundTolerated => return Ok(Vec::new()),
        };

        body.uuids
            .iter()
            .map(|raw| {
                Uuid::parse_str(raw).map_err(|e| CouchError::MalformedResponse(format!("invalid uuid {raw:?}: {e}")))
            })
            .collect()
    }

    /// Shuts down the client and its transport.
    pub async fn shutdown(self) -> CouchResult<()> {
        self.transport.shutdown().await
    }
}
