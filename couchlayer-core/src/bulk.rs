//! Multi-document requests and the projection of their results.
//!
//! A bulk request is one round trip carrying many documents:
//! `POST {db}/_bulk_docs` with `{"new_edits": .., "docs": [..]}`. The server answers
//! with an array of per-document outcomes, index-aligned with `docs`. Partial
//! failure is expressed in that array, never as an error of the whole call.

use serde::{Deserialize, Serialize};
use serde_json::{
    Value, json,
    value::{RawValue, to_raw_value},
};

use crate::{
    document::{Entity, non_blank},
    error::{CouchError, CouchResult, ServerError},
};

/// Body of a `_bulk_docs` request.
#[derive(Debug, Clone, Serialize)]
pub struct BulkRequest {
    new_edits: bool,
    docs: Vec<Box<RawValue>>,
}

impl BulkRequest {
    /// Builds a request from raw JSON documents, embedding each one verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`CouchError::InvalidArgument`] if `documents` is empty or one of them
    /// is not valid JSON.
    pub fn from_json<S>(documents: &[S], new_edits: bool) -> CouchResult<Self>
    where
        S: AsRef<str>,
    {
        let docs = documents
            .iter()
            .enumerate()
            .map(|(index, document)| {
                RawValue::from_string(document.as_ref().to_string()).map_err(|e| {
                    CouchError::invalid_argument(format!("document {index} is not valid JSON: {e}"))
                })
            })
            .collect::<CouchResult<Vec<_>>>()?;

        Self::from_raw(docs, new_edits)
    }

    /// Builds a request from already parsed documents.
    pub fn from_values(docs: Vec<Value>, new_edits: bool) -> CouchResult<Self> {
        let docs = docs
            .iter()
            .map(to_raw_value)
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_raw(docs, new_edits)
    }

    fn from_raw(docs: Vec<Box<RawValue>>, new_edits: bool) -> CouchResult<Self> {
        if docs.is_empty() {
            return Err(CouchError::invalid_argument("a bulk request needs at least one document"));
        }

        Ok(Self { new_edits, docs })
    }

    /// Builds a request deleting every entity, which must each carry an id and a
    /// revision.
    pub fn deletions<E: Entity>(entities: &[E]) -> CouchResult<Self> {
        let docs = entities
            .iter()
            .enumerate()
            .map(|(index, entity)| {
                let (id, revision) = require_identity(entity)
                    .map_err(|missing| CouchError::invalid_argument(format!("entity {index} has no {missing}")))?;

                Ok(json!({ "_id": id, "_rev": revision, "_deleted": true }))
            })
            .collect::<CouchResult<Vec<_>>>()?;

        Self::from_values(docs, true)
    }

    pub fn new_edits(&self) -> bool {
        self.new_edits
    }

    /// Returns the documents exactly as they will be sent.
    pub fn documents(&self) -> impl Iterator<Item = &str> {
        self.docs.iter().map(|document| document.get())
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn to_body(&self) -> CouchResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Returns the id and revision of an entity, or the name of the missing one.
pub(crate) fn require_identity<E: Entity>(entity: &E) -> Result<(&str, &str), &'static str> {
    let id = non_blank(entity.id()).ok_or("id")?;
    let revision = non_blank(entity.revision()).ok_or("revision")?;

    Ok((id, revision))
}

/// Outcome of writing one document.
///
/// On success `id` and `revision` are the server-confirmed pair and `error` is
/// absent. On failure `error` is present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SaveResult {
    pub id: Option<String>,
    pub revision: Option<String>,
    pub error: Option<ServerError>,
}

impl SaveResult {
    /// A successful result for the given pair.
    pub fn saved(id: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            revision: Some(revision.into()),
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// One element of a write response: `{ok?, id?, rev?, error?, reason?}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WriteItem {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    rev: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

impl From<WriteItem> for SaveResult {
    fn from(item: WriteItem) -> Self {
        SaveResult {
            error: ServerError::classify_with_reason(item.error.as_deref(), item.reason.as_deref()),
            id: item.id,
            revision: item.rev,
        }
    }
}

/// Parses a `_bulk_docs` response into index-aligned [`SaveResult`]s.
///
/// # Errors
///
/// Returns [`CouchError::MalformedResponse`] if the body is not a JSON array of
/// objects.
pub fn parse_bulk_response(body: &[u8]) -> CouchResult<Vec<SaveResult>> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| CouchError::MalformedResponse(format!("bulk response is not JSON: {e}")))?;

    let items = match value {
        Value::Array(items) => items,
        _ => return Err(CouchError::MalformedResponse("bulk response is not an array".to_string())),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(CouchError::MalformedResponse(format!(
                    "item {index} of the bulk response is not an object"
                )));
            }

            serde_json::from_value::<WriteItem>(item)
                .map(SaveResult::from)
                .map_err(|e| CouchError::MalformedResponse(format!("item {index} of the bulk response: {e}")))
        })
        .collect()
}

/// Splices the outcome of each successful write back onto the document at the
/// same index. Failed writes leave their document untouched.
///
/// Stops at the shorter of the two sequences. Returns the number of documents
/// updated.
pub fn project_bulk_result<E: Entity>(results: &[SaveResult], documents: &mut [E]) -> usize {
    let mut updated = 0;

    for (result, document) in results.iter().zip(documents.iter_mut()) {
        if !result.is_ok() {
            continue;
        }

        if let Some(id) = &result.id {
            document.set_id(id.clone());
        }
        if let Some(revision) = &result.revision {
            document.set_revision(revision.clone());
        }
        updated += 1;
    }

    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommonErrorKind;

    #[test]
    fn test_request_embeds_documents_verbatim() {
        let request = BulkRequest::from_json(
            &[r#"{"_id":"a","big":12345678901234567890123,"d":1.10}"#, r#"{"b": [1, 2]}"#],
            false,
        )
        .unwrap();

        assert_eq!(request.len(), 2);
        assert!(!request.new_edits());
        assert_eq!(
            String::from_utf8(request.to_body().unwrap()).unwrap(),
            r#"{"new_edits":false,"docs":[{"_id":"a","big":12345678901234567890123,"d":1.10},{"b": [1, 2]}]}"#
        );
    }

    #[test]
    fn test_request_needs_documents() {
        let empty: [&str; 0] = [];

        assert!(matches!(BulkRequest::from_json(&empty, true), Err(CouchError::InvalidArgument(_))));
        assert!(matches!(BulkRequest::from_values(vec![], true), Err(CouchError::InvalidArgument(_))));
        assert!(matches!(
            BulkRequest::from_json(&["{nope"], true),
            Err(CouchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_deletions_require_identity() {
        let request = BulkRequest::deletions(&[json!({"_id": "a", "_rev": "1-a", "x": 1})]).unwrap();
        assert_eq!(
            request.documents().collect::<Vec<_>>(),
            vec![r#"{"_deleted":true,"_id":"a","_rev":"1-a"}"#]
        );

        match BulkRequest::deletions(&[json!({"_id": "a", "_rev": "1-a"}), json!({"_id": "b"})]) {
            Err(CouchError::InvalidArgument(message)) => assert_eq!(message, "entity 1 has no revision"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_partial_failure_splices_only_successes() {
        let mut documents = vec![json!({"n": 1}), json!({"_id": "b", "_rev": "1-b", "n": 2})];
        let results = parse_bulk_response(
            br#"[{"ok":true,"id":"a","rev":"1-a"},{"id":"b","error":"conflict","reason":"Document update conflict."}]"#,
        )
        .unwrap();

        assert_eq!(project_bulk_result(&results, &mut documents), 1);
        assert_eq!(documents[0], json!({"_id": "a", "_rev": "1-a", "n": 1}));
        assert_eq!(documents[1], json!({"_id": "b", "_rev": "1-b", "n": 2}));

        let error = results[1].error.as_ref().unwrap();
        assert!(error.is(CommonErrorKind::Conflict));
        assert_eq!(error.reason(), Some("Document update conflict."));
    }

    #[test]
    fn test_mismatched_lengths_are_safe() {
        let mut documents = vec![json!({}), json!({})];

        let shorter = vec![SaveResult::saved("a", "1-a")];
        assert_eq!(project_bulk_result(&shorter, &mut documents), 1);
        assert_eq!(documents[1], json!({}));

        let longer = vec![
            SaveResult::saved("x", "1-x"),
            SaveResult::saved("y", "1-y"),
            SaveResult::saved("z", "1-z"),
        ];
        assert_eq!(project_bulk_result(&longer, &mut documents), 2);
        assert_eq!(documents[1], json!({"_id": "y", "_rev": "1-y"}));
    }

    #[test]
    fn test_bulk_not_found_is_a_plain_error() {
        let results = parse_bulk_response(br#"[{"id":"a","error":"not_found","reason":"missing"}]"#).unwrap();

        assert!(!results[0].is_ok());
        assert!(results[0].error.as_ref().unwrap().is(CommonErrorKind::NotFound));
    }

    #[test]
    fn test_malformed_bulk_responses() {
        assert!(matches!(parse_bulk_response(b"{}"), Err(CouchError::MalformedResponse(_))));
        assert!(matches!(parse_bulk_response(b"[1]"), Err(CouchError::MalformedResponse(_))));
        assert!(matches!(parse_bulk_response(b"oops"), Err(CouchError::MalformedResponse(_))));
        assert_eq!(parse_bulk_response(b"[]").unwrap(), vec![]);
    }
}
