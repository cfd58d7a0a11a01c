//! Typed access to the documents of one database.
//!
//! [`Entities`] wraps a [`Database`] and speaks in terms of an [`Entity`] type.
//! Writes serialize the entity, send it, and write the server-confirmed id and
//! revision back onto the caller's value. Reads return fresh values.
//!
//! # Example
//!
//! ```ignore
//! let users = client.entities::<User>("users");
//!
//! let mut user = User::new("alice");
//! users.save(&mut user).await?;
//! assert!(user.rev.is_some());
//!
//! users.delete(&mut user).await?;
//! ```

use std::marker::PhantomData;

use crate::{
    bulk::{BulkRequest, SaveResult, project_bulk_result, require_identity},
    database::Database,
    document::{Entity, EntityExt},
    error::{CouchError, CouchResult},
    list::DocumentList,
    query::{ListQuery, SaveQuery},
    transport::Transport,
};

/// Handle on the documents of one database, typed as `E`.
#[derive(Debug)]
pub struct Entities<'a, T: Transport, E: Entity> {
    database: Database<'a, T>,
    _marker: PhantomData<fn() -> E>,
}

impl<'a, T: Transport, E: Entity> Entities<'a, T, E> {
    pub(crate) fn new(database: Database<'a, T>) -> Self {
        Self {
            database,
            _marker: PhantomData,
        }
    }

    /// Returns the untyped handle on the same database.
    pub fn database(&self) -> &Database<'a, T> {
        &self.database
    }

    /// Saves the entity and writes the confirmed id and revision back onto it.
    ///
    /// An entity without a revision is created. An entity without an id gets one
    /// assigned by the server.
    ///
    /// # Errors
    ///
    /// Returns [`CouchError::Server`] if the write is rejected, for example with a
    /// `conflict` when the revision is stale. The entity is left unchanged.
    pub async fn save(&self, entity: &mut E) -> CouchResult<SaveResult> {
        self.save_with(entity, None).await
    }

    /// Like [`save`](Self::save), with write options.
    pub async fn save_with(&self, entity: &mut E, query: Option<&SaveQuery>) -> CouchResult<SaveResult> {
        let body = serde_json::to_string(&entity.to_save_body()?)?;
        let result = self.database.save_document(&body, query).await?;

        entity.apply_identity(result.id.as_deref(), result.revision.as_deref());
        Ok(result)
    }

    /// Fetches the entity with the given id. A missing document reads as `None`.
    pub async fn get(&self, id: &str) -> CouchResult<Option<E>> {
        self.database.get_document_as(id, None).await
    }

    /// Deletes the entity's current revision and writes the tombstone revision back
    /// onto it.
    ///
    /// # Errors
    ///
    /// Returns [`CouchError::InvalidArgument`] before any request is sent if the
    /// entity has no id or no revision.
    pub async fn delete(&self, entity: &mut E) -> CouchResult<SaveResult> {
        let (id, revision) = require_identity(entity)
            .map_err(|missing| CouchError::invalid_argument(format!("entity has no {missing}")))?;

        let result = self
            .database
            .delete_document(id, revision, false)
            .await?;

        entity.apply_identity(result.id.as_deref(), result.revision.as_deref());
        Ok(result)
    }

    /// Lists entities through `_all_docs`. Documents are always included.
    ///
    /// # Errors
    ///
    /// Fails with [`CouchError::Serialization`] if a listed document does not
    /// deserialize as `E`.
    pub async fn list_all(&self, query: ListQuery) -> CouchResult<DocumentList<E>> {
        self.database
            .list_all(&query.include_docs(true), true)
            .await?
            .deserialize_documents()
    }

    /// Fetches the entities with the given ids in one request. Ids that do not
    /// exist come back as error rows.
    pub async fn get_many<S>(&self, ids: &[S]) -> CouchResult<DocumentList<E>>
    where
        S: AsRef<str>,
    {
        self.database
            .get_many(ids, &ListQuery::new().include_docs(true), true)
            .await?
            .deserialize_documents()
    }

    /// Saves several entities in one request.
    ///
    /// Each entity that was written gets its confirmed id and revision back.
    /// Entities whose write failed are left unchanged and their result carries the
    /// error.
    pub async fn bulk_save(&self, entities: &mut [E], new_edits: bool) -> CouchResult<Vec<SaveResult>> {
        let documents = entities
            .iter()
            .map(EntityExt::to_save_body)
            .collect::<CouchResult<Vec<_>>>()?;

        let results = self
            .database
            .execute_bulk(&BulkRequest::from_values(documents, new_edits)?)
            .await?;

        project_bulk_result(&results, entities);
        Ok(results)
    }

    /// Deletes several entities in one request.
    pub async fn bulk_delete(&self, entities: &mut [E]) -> CouchResult<Vec<SaveResult>> {
        self.database.bulk_delete(entities).await
    }
}
