//! Document list results and the projection of list responses onto them.
//!
//! A list response (`_all_docs` and friends) has the shape
//! `{offset, total_rows, update_seq, rows: [{id, key, value: {rev}, doc?, error?}]}`.
//! [`DocumentListProjector`] turns it into a [`DocumentList`], projecting every row
//! independently: a row that carries an error, or lacks a document, never fails
//! the list. Only a row that is not a JSON object does, because the row shape is
//! what the whole projection relies on.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    error::{CouchError, CouchResult, ServerError},
    query::ListQuery,
};

/// One entry of a document list.
///
/// A row describing a failed lookup carries an `error` and no `document`. In
/// minimal mode (no `include_docs`) both are usually absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<T> {
    pub id: Option<String>,
    pub key: Option<String>,
    pub revision: Option<String>,
    pub document: Option<T>,
    pub error: Option<ServerError>,
}

impl<T> Row<T> {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Replaces the document with `f(document)`, keeping the row metadata.
    pub fn map_document<U>(self, f: impl FnOnce(T) -> Option<U>) -> Row<U> {
        Row {
            id: self.id,
            key: self.key,
            revision: self.revision,
            document: self.document.and_then(f),
            error: self.error,
        }
    }

    fn try_map_document<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Row<U>, E> {
        Ok(Row {
            id: self.id,
            key: self.key,
            revision: self.revision,
            document: self.document.map(f).transpose()?,
            error: self.error,
        })
    }
}

/// A page of rows as returned by a list request.
///
/// Rows keep the order the server sent them in.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentList<T> {
    pub offset: u64,
    pub total_rows: u64,
    pub update_seq: u64,
    pub rows: Vec<Row<T>>,
}

impl<T> Default for DocumentList<T> {
    fn default() -> Self {
        Self {
            offset: 0,
            total_rows: 0,
            update_seq: 0,
            rows: Vec::new(),
        }
    }
}

impl<T> DocumentList<T> {
    /// Iterates over the documents of the rows that have one, in row order.
    pub fn documents(&self) -> impl Iterator<Item = &T> {
        self.rows.iter().filter_map(|row| row.document.as_ref())
    }

    /// Consumes the list, keeping only the documents.
    pub fn into_documents(self) -> Vec<T> {
        self.rows.into_iter().filter_map(|row| row.document).collect()
    }

    /// Iterates over the rows that carry an error.
    pub fn errors(&self) -> impl Iterator<Item = &Row<T>> {
        self.rows.iter().filter(|row| row.is_error())
    }

    /// Maps every row's document independently. A `None` from `f` only empties
    /// that row's document.
    pub fn map_documents<U>(self, mut f: impl FnMut(T) -> Option<U>) -> DocumentList<U> {
        DocumentList {
            offset: self.offset,
            total_rows: self.total_rows,
            update_seq: self.update_seq,
            rows: self.rows.into_iter().map(|row| row.map_document(&mut f)).collect(),
        }
    }

    /// Maps every row's document, stopping at the first failure.
    pub fn try_map_documents<U, E>(self, mut f: impl FnMut(T) -> Result<U, E>) -> Result<DocumentList<U>, E> {
        Ok(DocumentList {
            offset: self.offset,
            total_rows: self.total_rows,
            update_seq: self.update_seq,
            rows: self
                .rows
                .into_iter()
                .map(|row| row.try_map_document(&mut f))
                .collect::<Result<Vec<_>, E>>()?,
        })
    }
}

impl DocumentList<Value> {
    /// Deserializes every document into `T`.
    ///
    /// # Errors
    ///
    /// Fails with [`CouchError::Serialization`] as soon as one document does not
    /// deserialize.
    pub fn deserialize_documents<T>(self) -> CouchResult<DocumentList<T>>
    where
        T: DeserializeOwned,
    {
        self.try_map_documents(|document| serde_json::from_value(document).map_err(CouchError::from))
    }
}

/// Projects list responses onto [`DocumentList`]s.
#[derive(Debug, Clone, Copy)]
pub struct DocumentListProjector {
    extract_documents: bool,
}

impl DocumentListProjector {
    /// Creates a projector for responses to `query`.
    ///
    /// # Errors
    ///
    /// Returns [`CouchError::InvalidArgument`] if `extract_documents` is requested
    /// but `query` does not set `include_docs=true`.
    pub fn new(query: &ListQuery, extract_documents: bool) -> CouchResult<Self> {
        if extract_documents && !query.includes_docs() {
            return Err(CouchError::invalid_argument(
                "document extraction requires include_docs=true on the list query",
            ));
        }

        Ok(Self { extract_documents })
    }

    /// Creates a projector that only reads row metadata.
    pub fn metadata_only() -> Self {
        Self { extract_documents: false }
    }

    pub fn extracts_documents(&self) -> bool {
        self.extract_documents
    }

    /// Parses and projects a raw list response body.
    pub fn project(&self, body: &[u8]) -> CouchResult<DocumentList<Value>> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| CouchError::MalformedResponse(format!("list response is not JSON: {e}")))?;

        self.project_value(&value)
    }

    /// Projects an already parsed list response.
    ///
    /// Missing or mistyped metadata defaults to zero and a missing `rows` array to
    /// an empty list.
    pub fn project_value(&self, value: &Value) -> CouchResult<DocumentList<Value>> {
        let rows = match value.get("rows").and_then(Value::as_array) {
            Some(rows) => rows
                .iter()
                .enumerate()
                .map(|(index, row)| self.project_row(index, row))
                .collect::<CouchResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(DocumentList {
            offset: read_count(value, "offset"),
            total_rows: read_count(value, "total_rows"),
            update_seq: read_count(value, "update_seq"),
            rows,
        })
    }

    /// Projects a list response, then maps each row's document through
    /// `deserializer` on its own. A failing row keeps its metadata and loses its
    /// document; the other rows are unaffected.
    pub fn project_with<T, F>(&self, body: &[u8], mut deserializer: F) -> CouchResult<DocumentList<T>>
    where
        F: FnMut(Value) -> CouchResult<T>,
    {
        Ok(self
            .project(body)?
            .map_documents(|document| match deserializer(document) {
                Ok(document) => Some(document),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping row document that failed to deserialize");
                    None
                }
            }))
    }

    fn project_row(&self, index: usize, row: &Value) -> CouchResult<Row<Value>> {
        let row = row.as_object().ok_or_else(|| {
            CouchError::MalformedResponse(format!("row {index} of the list response is not an object"))
        })?;

        let document = if self.extract_documents {
            row.get("doc").filter(|doc| !doc.is_null()).cloned()
        } else {
            None
        };

        Ok(Row {
            id: row.get("id").and_then(Value::as_str).map(str::to_string),
            key: row.get("key").and_then(Value::as_str).map(str::to_string),
            revision: row
                .get("value")
                .and_then(|value| value.get("rev"))
                .and_then(Value::as_str)
                .map(str::to_string),
            document,
            error: ServerError::classify(row.get("error").and_then(Value::as_str)),
        })
    }
}

fn read_count(value: &Value, field: &str) -> u64 {
    value.get(field).and_then(Value::as_u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommonErrorKind;
    use serde::Deserialize;
    use serde_json::json;

    fn including_docs() -> DocumentListProjector {
        DocumentListProjector::new(&ListQuery::new().include_docs(true), true).unwrap()
    }

    #[test]
    fn test_projects_a_full_row() {
        let body = json!({
            "offset": 1,
            "total_rows": 2,
            "update_seq": 3,
            "rows": [
                {"id": "1", "key": "2", "value": {"rev": "3"}, "error": "4", "doc": {"name": "x"}}
            ]
        });

        let list = including_docs().project_value(&body).unwrap();

        assert_eq!(list.offset, 1);
        assert_eq!(list.total_rows, 2);
        assert_eq!(list.update_seq, 3);
        assert_eq!(list.rows.len(), 1);

        let row = &list.rows[0];
        assert_eq!(row.id.as_deref(), Some("1"));
        assert_eq!(row.key.as_deref(), Some("2"));
        assert_eq!(row.revision.as_deref(), Some("3"));
        assert_eq!(row.error.as_ref().map(ServerError::raw_token), Some("4"));
        assert_eq!(row.document, Some(json!({"name": "x"})));
    }

    #[test]
    fn test_metadata_defaults_independently() {
        let body = json!({"offset": "one", "total_rows": 7, "rows": "nope"});
        let list = DocumentListProjector::metadata_only().project_value(&body).unwrap();

        assert_eq!(list.offset, 0);
        assert_eq!(list.total_rows, 7);
        assert_eq!(list.update_seq, 0);
        assert!(list.rows.is_empty());

        let empty = DocumentListProjector::metadata_only().project(b"{}").unwrap();
        assert_eq!(empty, DocumentList::default());
    }

    #[test]
    fn test_non_object_row_is_malformed() {
        let body = json!({"rows": [{"id": "a"}, 42]});

        match DocumentListProjector::metadata_only().project_value(&body) {
            Err(CouchError::MalformedResponse(message)) => assert!(message.contains("row 1")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_non_json_body_is_malformed() {
        assert!(matches!(
            DocumentListProjector::metadata_only().project(b"<html>"),
            Err(CouchError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_documents_are_only_read_when_extracting() {
        let body = json!({"rows": [{"id": "a", "doc": {"v": 1}}]});

        let minimal = DocumentListProjector::metadata_only().project_value(&body).unwrap();
        assert_eq!(minimal.rows[0].document, None);

        let full = including_docs().project_value(&body).unwrap();
        assert_eq!(full.rows[0].document, Some(json!({"v": 1})));
    }

    #[test]
    fn test_missing_or_null_doc_is_not_fatal() {
        let body = json!({"rows": [
            {"key": "gone", "error": "not_found"},
            {"id": "deleted", "key": "deleted", "value": {"rev": "2-x", "deleted": true}, "doc": null},
        ]});

        let list = including_docs().project_value(&body).unwrap();

        assert_eq!(list.rows[0].id, None);
        assert_eq!(list.rows[0].key.as_deref(), Some("gone"));
        assert!(list.rows[0].error.as_ref().unwrap().is(CommonErrorKind::NotFound));
        assert_eq!(list.rows[1].document, None);
        assert_eq!(list.rows[1].revision.as_deref(), Some("2-x"));
        assert_eq!(list.errors().count(), 1);
    }

    #[test]
    fn test_rows_keep_server_order() {
        let body = json!({"rows": [{"id": "c"}, {"id": "a"}, {"id": "b"}]});
        let list = DocumentListProjector::metadata_only().project_value(&body).unwrap();

        let ids: Vec<_> = list.rows.iter().filter_map(|row| row.id.as_deref()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn test_extraction_requires_include_docs() {
        assert!(matches!(
            DocumentListProjector::new(&ListQuery::new(), true),
            Err(CouchError::InvalidArgument(_))
        ));
        assert!(matches!(
            DocumentListProjector::new(&ListQuery::new().include_docs(false), true),
            Err(CouchError::InvalidArgument(_))
        ));
        assert!(DocumentListProjector::new(&ListQuery::new(), false).is_ok());
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Named {
        name: String,
    }

    #[test]
    fn test_project_with_isolates_row_failures() {
        let body = json!({"rows": [
            {"id": "a", "doc": {"name": "alice"}},
            {"id": "b", "doc": {"name": 5}},
            {"id": "c", "doc": {"name": "carol"}},
        ]})
        .to_string();

        let list = including_docs()
            .project_with(body.as_bytes(), |doc| Ok(serde_json::from_value::<Named>(doc)?))
            .unwrap();

        assert_eq!(list.rows.len(), 3);
        assert_eq!(list.rows[0].document, Some(Named { name: "alice".into() }));
        assert_eq!(list.rows[1].document, None);
        assert_eq!(list.rows[1].id.as_deref(), Some("b"));
        assert_eq!(list.rows[2].document, Some(Named { name: "carol".into() }));
    }

    #[test]
    fn test_deserialize_documents_propagates_failures() {
        let body = json!({"rows": [
            {"id": "a", "doc": {"name": "alice"}},
            {"id": "b", "doc": {"name": 5}},
        ]});
        let list = including_docs().project_value(&body).unwrap();

        assert!(matches!(
            list.clone().deserialize_documents::<Named>(),
            Err(CouchError::Serialization(_))
        ));

        let ok = json!({"rows": [{"id": "a", "doc": {"name": "alice"}}, {"id": "z"}]});
        let typed = including_docs()
            .project_value(&ok)
            .unwrap()
            .deserialize_documents::<Named>()
            .unwrap();
        assert_eq!(typed.into_documents(), vec![Named { name: "alice".into() }]);
    }
}
