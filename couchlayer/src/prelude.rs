//! Convenient re-exports of commonly used types from couchlayer.
//!
//! ```ignore
//! use couchlayer::prelude::*;
//! ```
//!
//! This provides access to:
//! - The client and its database handles
//! - Entity traits and the derive macro
//! - Query parameter sets
//! - Transport traits
//! - Result, list and error types

pub use couchlayer_core::{
    bulk::{BulkRequest, SaveResult},
    client::{CouchClient, ServerInfo},
    database::{Attachment, Database, DatabaseInfo},
    document::{Entity, EntityExt, EntityField},
    entity::Entities,
    error::{CommonErrorKind, CouchError, CouchResult, ServerError},
    list::{DocumentList, DocumentListProjector, Row},
    query::{AttachmentQuery, DeleteQuery, DocumentQuery, EncodeQuery, ListQuery, OpenRevisions, SaveQuery, Stale, Update},
    transport::{Transport, TransportBuilder, TransportRequest, TransportResponse},
};
pub use couchlayer_macros::Entity;
