//! Document operations against a single database.
//!
//! A [`Database`] is a cheap handle binding a database name to a transport. Each
//! method builds exactly one request, hands it to the transport and maps the
//! response: documents and attachments that are gone read as `None`, deletions
//! of documents that are already gone succeed, and every other failure is
//! surfaced as a [`CouchError`].
//!
//! # Example
//!
//! ```ignore
//! use couchlayer::prelude::*;
//!
//! let db = client.database("users");
//! let saved = db.save_document(r#"{"name":"alice"}"#, None).await?;
//! let doc = db.get_document(saved.id.as_deref().unwrap(), None).await?;
//! ```

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::{
    bulk::{BulkRequest, SaveResult, WriteItem, parse_bulk_response, project_bulk_result},
    document::Entity,
    error::{CouchError, CouchResult},
    list::{DocumentList, DocumentListProjector},
    query::{AttachmentQuery, DeleteQuery, DocumentQuery, ListQuery, SaveQuery, append_to_url},
    response::{NotFound, Outcome, expect_success, map_document, map_response},
    transport::{Transport, TransportRequest, TransportResponse, send},
};

/// Metadata of a database, as returned by `GET /{db}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabaseInfo {
    pub db_name: String,
    #[serde(default)]
    pub doc_count: u64,
    #[serde(default)]
    pub doc_del_count: u64,
    #[serde(default)]
    pub update_seq: Value,
    #[serde(default)]
    pub purge_seq: Value,
    #[serde(default)]
    pub compact_running: bool,
    #[serde(default)]
    pub instance_start_time: Option<String>,
}

/// A fetched attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Handle on one database of the server.
#[derive(Debug)]
pub struct Database<'a, T: Transport> {
    name: String,
    transport: &'a T,
}

impl<'a, T: Transport> Database<'a, T> {
    pub(crate) fn new(name: String, transport: &'a T) -> Self {
        Self { name, transport }
    }

    /// Returns the name of this database.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> String {
        escape_segment(&self.name)
    }

    fn document_path(&self, id: &str) -> String {
        format!("{}/{}", self.path(), escape_document_id(id))
    }

    async fn send(&self, request: TransportRequest) -> CouchResult<TransportResponse> {
        send(self.transport, request).await
    }

    /// Fetches the database metadata.
    pub async fn info(&self) -> CouchResult<DatabaseInfo> {
        let response = self.send(TransportRequest::get(self.path())).await?;

        decoded(map_response(&response, NotFound::Fail)?)
    }

    /// Returns `true` if the database exists.
    pub async fn exists(&self) -> CouchResult<bool> {
        let response = self.send(TransportRequest::head(self.path())).await?;

        if response.status == 404 {
            return Ok(false);
        }

        expect_success(&response, NotFound::Fail)?;
        Ok(true)
    }

    /// Creates a document from raw JSON, letting the server assign the id when the
    /// document has none.
    ///
    /// # Errors
    ///
    /// Returns [`CouchError::InvalidArgument`] if `json` is blank, and
    /// [`CouchError::Server`] if the server rejects the write.
    pub async fn save_document(&self, json: &str, query: Option<&SaveQuery>) -> CouchResult<SaveResult> {
        require("document", json)?;

        let url = append_to_url(&self.path(), query)?;
        let response = self
            .send(TransportRequest::post(url).json_body(json.as_bytes()))
            .await?;

        save_result(&response)
    }

    /// Creates or updates the document with the given id from raw JSON.
    pub async fn put_document(&self, id: &str, json: &str, query: Option<&SaveQuery>) -> CouchResult<SaveResult> {
        require("document id", id)?;
        require("document", json)?;

        let url = append_to_url(&self.document_path(id), query)?;
        let response = self
            .send(TransportRequest::put(url).json_body(json.as_bytes()))
            .await?;

        save_result(&response)
    }

    /// Fetches a document as raw JSON. A missing document reads as `None`.
    pub async fn get_document(&self, id: &str, query: Option<&DocumentQuery>) -> CouchResult<Option<Value>> {
        self.get_document_as(id, query).await
    }

    /// Fetches a document and deserializes it into `D`.
    pub async fn get_document_as<D>(&self, id: &str, query: Option<&DocumentQuery>) -> CouchResult<Option<D>>
    where
        D: DeserializeOwned,
    {
        let response = self.fetch_document(id, query).await?;

        map_document(&response)
    }

    /// Fetches a document and returns its body text untouched.
    pub async fn get_document_string(&self, id: &str, query: Option<&DocumentQuery>) -> CouchResult<Option<String>> {
        let response = self.fetch_document(id, query).await?;

        match map_document::<Value>(&response)? {
            Some(_) => String::from_utf8(response.body)
                .map(Some)
                .map_err(|e| CouchError::MalformedResponse(format!("document body is not UTF-8: {e}"))),
            None => Ok(None),
        }
    }

    async fn fetch_document(&self, id: &str, query: Option<&DocumentQuery>) -> CouchResult<TransportResponse> {
        require("document id", id)?;

        let url = append_to_url(&self.document_path(id), query)?;
        self.send(TransportRequest::get(url)).await
    }

    /// Deletes a document revision.
    ///
    /// A document that is already gone counts as deleted: the result then echoes
    /// the requested id and revision.
    pub async fn delete_document(&self, id: &str, rev: &str, batch: bool) -> CouchResult<SaveResult> {
        require("document id", id)?;
        require("revision", rev)?;

        let query = DeleteQuery::new(rev).batch(batch);
        let url = append_to_url(&self.document_path(id), Some(&query))?;
        let response = self.send(TransportRequest::delete(url)).await?;

        match map_response::<WriteItem>(&response, NotFound::Tolerate)? {
            Outcome::Decoded(item) => Ok(item.into()),
            Outcome::NotFoundTolerated => Ok(SaveResult::saved(id, rev)),
        }
    }

    /// Lists documents through `_all_docs`.
    ///
    /// # Errors
    ///
    /// Returns [`CouchError::InvalidArgument`] before any request is sent if
    /// `extract_documents` is set but `query` does not include documents.
    pub async fn list_all(&self, query: &ListQuery, extract_documents: bool) -> CouchResult<DocumentList<Value>> {
        let projector = DocumentListProjector::new(query, extract_documents)?;

        let url = append_to_url(&format!("{}/_all_docs", self.path()), Some(query))?;
        let response = self.send(TransportRequest::get(url)).await?;

        list_result(&response, &projector)
    }

    /// Lists documents through `_all_docs`, always including and deserializing the
    /// documents. A document that does not deserialize fails the call.
    pub async fn list_all_as<D>(&self, query: &ListQuery) -> CouchResult<DocumentList<D>>
    where
        D: DeserializeOwned,
    {
        self.list_all(&query.clone().include_docs(true), true)
            .await?
            .deserialize_documents()
    }

    /// Fetches the rows for the given ids in one request (`POST _all_docs`).
    ///
    /// Ids that do not exist come back as rows carrying a `not_found` error.
    pub async fn get_many<S>(
        &self,
        ids: &[S],
        query: &ListQuery,
        extract_documents: bool,
    ) -> CouchResult<DocumentList<Value>>
    where
        S: AsRef<str>,
    {
        let projector = DocumentListProjector::new(query, extract_documents)?;

        if ids.is_empty() {
            return Err(CouchError::invalid_argument("at least one document id is required"));
        }

        let keys: Vec<&str> = ids.iter().map(AsRef::as_ref).collect();
        let url = append_to_url(&format!("{}/_all_docs", self.path()), Some(query))?;
        let response = self
            .send(TransportRequest::post(url).json_body(serde_json::to_vec(&json!({ "keys": keys }))?))
            .await?;

        list_result(&response, &projector)
    }

    /// Writes several raw JSON documents in one request.
    ///
    /// The results are index-aligned with `documents`. Per-document failures are
    /// reported in the results, not as an error of the call.
    pub async fn bulk_save<S>(&self, documents: &[S], new_edits: bool) -> CouchResult<Vec<SaveResult>>
    where
        S: AsRef<str>,
    {
        self.execute_bulk(&BulkRequest::from_json(documents, new_edits)?)
            .await
    }

    /// Writes several JSON documents in one request and splices the resulting ids
    /// and revisions back onto the documents that were written.
    pub async fn bulk_save_values(&self, documents: &mut [Value], new_edits: bool) -> CouchResult<Vec<SaveResult>> {
        let results = self
            .execute_bulk(&BulkRequest::from_values(documents.to_vec(), new_edits)?)
            .await?;

        project_bulk_result(&results, documents);
        Ok(results)
    }

    /// Deletes several entities in one request, writing the tombstone revisions
    /// back onto the entities that were deleted.
    ///
    /// # Errors
    ///
    /// Returns [`CouchError::InvalidArgument`] before any request is sent if an
    /// entity lacks an id or revision.
    pub async fn bulk_delete<E: Entity>(&self, entities: &mut [E]) -> CouchResult<Vec<SaveResult>> {
        let results = self
            .execute_bulk(&BulkRequest::deletions(entities)?)
            .await?;

        project_bulk_result(&results, entities);
        Ok(results)
    }

    pub(crate) async fn execute_bulk(&self, request: &BulkRequest) -> CouchResult<Vec<SaveResult>> {
        let response = self
            .send(TransportRequest::post(format!("{}/_bulk_docs", self.path())).json_body(request.to_body()?))
            .await?;

        expect_success(&response, NotFound::Fail)?;

        parse_bulk_response(&response.body)
    }

    /// Stores an attachment on a document. Without a revision the document is
    /// created.
    pub async fn save_attachment(
        &self,
        id: &str,
        rev: Option<&str>,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> CouchResult<SaveResult> {
        require("document id", id)?;
        require("attachment name", name)?;
        require("content type", content_type)?;

        let url = append_to_url(&self.attachment_path(id, name), Some(&attachment_query(rev)))?;
        let response = self
            .send(TransportRequest::put(url).body(data, content_type))
            .await?;

        save_result(&response)
    }

    /// Fetches an attachment. A missing document or attachment reads as `None`.
    pub async fn get_attachment(&self, id: &str, name: &str, rev: Option<&str>) -> CouchResult<Option<Attachment>> {
        require("document id", id)?;
        require("attachment name", name)?;

        let url = append_to_url(&self.attachment_path(id, name), Some(&attachment_query(rev)))?;
        let response = self.send(TransportRequest::get(url)).await?;

        if response.status == 404 {
            return Ok(None);
        }

        expect_success(&response, NotFound::Fail)?;

        Ok(Some(Attachment {
            content_type: response.header("content-type").map(str::to_string),
            data: response.body,
        }))
    }

    /// Removes an attachment. An attachment that is already gone counts as removed.
    pub async fn delete_attachment(&self, id: &str, rev: &str, name: &str) -> CouchResult<SaveResult> {
        require("document id", id)?;
        require("revision", rev)?;
        require("attachment name", name)?;

        let query = AttachmentQuery::new().rev(rev);
        let url = append_to_url(&self.attachment_path(id, name), Some(&query))?;
        let response = self.send(TransportRequest::delete(url)).await?;

        match map_response::<WriteItem>(&response, NotFound::Tolerate)? {
            Outcome::Decoded(item) => Ok(item.into()),
            Outcome::NotFoundTolerated => Ok(SaveResult::saved(id, rev)),
        }
    }

    fn attachment_path(&self, id: &str, name: &str) -> String {
        format!("{}/{}", self.document_path(id), escape_segment(name))
    }
}

fn attachment_query(rev: Option<&str>) -> AttachmentQuery {
    match rev {
        Some(rev) if !rev.trim().is_empty() => AttachmentQuery::new().rev(rev),
        _ => AttachmentQuery::new(),
    }
}

fn decoded<D>(outcome: Outcome<D>) -> CouchResult<D> {
    outcome
        .into_option()
        .ok_or_else(|| CouchError::MalformedResponse("expected a response body".to_string()))
}

fn save_result(response: &TransportResponse) -> CouchResult<SaveResult> {
    decoded(map_response::<WriteItem>(response, NotFound::Fail)?).map(SaveResult::from)
}

fn list_result(response: &TransportResponse, projector: &DocumentListProjector) -> CouchResult<DocumentList<Value>> {
    expect_success(response, NotFound::Fail)?;

    projector.project(&response.body)
}

/// Fails with [`CouchError::InvalidArgument`] if `value` is blank.
pub(crate) fn require<'v>(what: &str, value: &'v str) -> CouchResult<&'v str> {
    if value.trim().is_empty() {
        return Err(CouchError::invalid_argument(format!("{what} must not be blank")));
    }

    Ok(value)
}

/// Everything outside the RFC 3986 unreserved set.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Percent-encodes a single path segment.
pub(crate) fn escape_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Escapes a document id, keeping the slash of design and local document ids.
pub(crate) fn escape_document_id(id: &str) -> String {
    for prefix in ["_design/", "_local/"] {
        if let Some(rest) = id.strip_prefix(prefix) {
            return format!("{prefix}{}", escape_segment(rest));
        }
    }

    escape_segment(id)
}
