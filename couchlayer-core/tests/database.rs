use couchlayer_core::{
    client::CouchClient,
    error::{CommonErrorKind, CouchError},
    query::{DocumentQuery, ListQuery, SaveQuery},
    transport::{JSON_CONTENT_TYPE, TransportResponse},
};
use couchlayer_mock::{MockReply, MockTransport};
use http::Method;
use serde_json::json;

fn client(replies: impl IntoIterator<Item = MockReply>) -> (CouchClient<MockTransport>, MockTransport) {
    let transport = MockTransport::with_replies(replies);
    (CouchClient::new(transport.clone()), transport)
}

#[tokio::test]
async fn test_save_document_posts_raw_json() {
    let (client, transport) = client([MockReply::json(201, &json!({ "ok": true, "id": "a", "rev": "1-x" }))]);

    let result = client
        .database("db")
        .save_document(r#"{"_id":"a","n":1}"#, Some(&SaveQuery::new().batch(true)))
        .await
        .unwrap();

    assert_eq!(result.id.as_deref(), Some("a"));
    assert_eq!(result.revision.as_deref(), Some("1-x"));
    assert!(result.is_ok());

    let request = transport.last_request().await.unwrap();
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.url, "db?batch=ok");
    assert_eq!(request.body_text(), Some(r#"{"_id":"a","n":1}"#));
    assert_eq!(request.content_type.as_deref(), Some(JSON_CONTENT_TYPE));
}

#[tokio::test]
async fn test_save_blank_document_is_rejected_locally() {
    let (client, transport) = client([]);

    let err = client.database("db").save_document("  ", None).await.unwrap_err();

    assert!(matches!(err, CouchError::InvalidArgument(_)));
    assert_eq!(transport.request_count().await, 0);
}

#[tokio::test]
async fn test_save_conflict_is_classified() {
    let (client, _) = client([MockReply::json(
        409,
        &json!({ "error": "conflict", "reason": "Document update conflict." }),
    )]);

    let err = client
        .database("db")
        .put_document("a", r#"{"_rev":"1-old"}"#, None)
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.server_error().and_then(|e| e.reason()), Some("Document update conflict."));
}

#[tokio::test]
async fn test_get_missing_document_is_none() {
    let (client, transport) = client([
        MockReply::json(404, &json!({ "error": "not_found", "reason": "missing" })),
        MockReply::raw(404, ""),
    ]);
    let db = client.database("db");

    assert_eq!(db.get_document("a", None).await.unwrap(), None);
    assert_eq!(db.get_document_string("b", None).await.unwrap(), None);
    assert_eq!(transport.request_count().await, 2);
}

#[tokio::test]
async fn test_get_document_with_query_and_design_id() {
    let (client, transport) = client([MockReply::raw(200, r#"{"_id":"_design/app","_rev":"2-y"}"#)]);

    let body = client
        .database("db")
        .get_document_string("_design/app", Some(&DocumentQuery::new().rev("2-y").conflicts(true)))
        .await
        .unwrap();

    assert_eq!(body.as_deref(), Some(r#"{"_id":"_design/app","_rev":"2-y"}"#));
    assert_eq!(
        transport.last_request().await.unwrap().url,
        "db/_design/app?conflicts=true&rev=2-y"
    );
}

#[tokio::test]
async fn test_get_server_failure_is_surfaced() {
    let (client, _) = client([MockReply::raw(500, "<html>oops</html>")]);

    let err = client.database("db").get_document("a", None).await.unwrap_err();

    assert!(matches!(err, CouchError::Client { status: 500, ref reason } if reason == "Internal Server Error"));
}

#[tokio::test]
async fn test_delete_missing_document_echoes_identity() {
    let (client, transport) = client([MockReply::json(404, &json!({ "error": "not_found", "reason": "deleted" }))]);

    let result = client
        .database("db")
        .delete_document("a b", "3-z", true)
        .await
        .unwrap();

    assert_eq!(result.id.as_deref(), Some("a b"));
    assert_eq!(result.revision.as_deref(), Some("3-z"));
    assert!(result.is_ok());

    let request = transport.last_request().await.unwrap();
    assert_eq!(request.method, Method::DELETE);
    assert_eq!(request.url, "db/a%20b?rev=3-z&batch=ok");
}

#[tokio::test]
async fn test_delete_other_failure_is_surfaced() {
    let (client, transport) = client([MockReply::json(409, &json!({ "error": "conflict", "reason": "stale" }))]);

    let err = client
        .database("db")
        .delete_document("a", "1-x", false)
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(transport.last_request().await.unwrap().url, "db/a?rev=1-x");
}

#[tokio::test]
async fn test_list_all_projects_rows() {
    let (client, transport) = client([MockReply::json(
        200,
        &json!({
            "offset": 1,
            "total_rows": 2,
            "update_seq": 3,
            "rows": [
                { "id": "1", "key": "2", "value": { "rev": "3" }, "error": "4", "doc": { "n": 1 } }
            ]
        }),
    )]);

    let list = client
        .database("db")
        .list_all(&ListQuery::new().include_docs(true).limit(5), true)
        .await
        .unwrap();

    assert_eq!((list.offset, list.total_rows, list.update_seq), (1, 2, 3));
    assert_eq!(list.rows.len(), 1);

    let row = &list.rows[0];
    assert_eq!(row.id.as_deref(), Some("1"));
    assert_eq!(row.key.as_deref(), Some("2"));
    assert_eq!(row.revision.as_deref(), Some("3"));
    assert_eq!(row.error.as_ref().map(|e| e.raw_token()), Some("4"));
    assert_eq!(row.document, Some(json!({ "n": 1 })));

    assert_eq!(
        transport.last_request().await.unwrap().url,
        "db/_all_docs?include_docs=true&limit=5"
    );
}

#[tokio::test]
async fn test_list_all_extraction_requires_include_docs() {
    let (client, transport) = client([]);

    let err = client
        .database("db")
        .list_all(&ListQuery::new(), true)
        .await
        .unwrap_err();

    assert!(matches!(err, CouchError::InvalidArgument(_)));
    assert_eq!(transport.request_count().await, 0);
}

#[tokio::test]
async fn test_list_all_malformed_row() {
    let (client, _) = client([MockReply::json(200, &json!({ "rows": [{ "id": "a" }, 7] }))]);

    let err = client
        .database("db")
        .list_all(&ListQuery::new(), false)
        .await
        .unwrap_err();

    assert!(matches!(err, CouchError::MalformedResponse(m) if m.contains("row 1")));
}

#[tokio::test]
async fn test_get_many_posts_keys() {
    let (client, transport) = client([MockReply::json(
        200,
        &json!({
            "total_rows": 10,
            "rows": [
                { "id": "a", "key": "a", "value": { "rev": "1-a" }, "doc": { "_id": "a" } },
                { "key": "missing", "error": "not_found" }
            ]
        }),
    )]);

    let list = client
        .database("db")
        .get_many(&["a", "missing"], &ListQuery::new().include_docs(true), true)
        .await
        .unwrap();

    assert_eq!(list.documents().count(), 1);
    let errors: Vec<_> = list.errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].error.as_ref().unwrap().is(CommonErrorKind::NotFound));

    let request = transport.last_request().await.unwrap();
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.url, "db/_all_docs?include_docs=true");
    assert_eq!(request.body_text(), Some(r#"{"keys":["a","missing"]}"#));
}

#[tokio::test]
async fn test_bulk_save_values_splices_results() {
    let (client, transport) = client([MockReply::json(
        201,
        &json!([
            { "ok": true, "id": "a", "rev": "1-a" },
            { "id": "b", "error": "conflict", "reason": "Document update conflict." }
        ]),
    )]);

    let mut documents = vec![json!({ "n": 1 }), json!({ "_id": "b", "n": 2 })];

    let results = client
        .database("db")
        .bulk_save_values(&mut documents, true)
        .await
        .unwrap();

    assert_eq!(documents[0], json!({ "_id": "a", "_rev": "1-a", "n": 1 }));
    assert_eq!(documents[1], json!({ "_id": "b", "n": 2 }));
    assert!(results[0].is_ok());
    assert_eq!(
        results[1].error.as_ref().and_then(|e| e.classified()),
        Some(CommonErrorKind::Conflict)
    );

    let request = transport.last_request().await.unwrap();
    assert_eq!(request.url, "db/_bulk_docs");
    assert_eq!(
        request.body_text(),
        Some(r#"{"new_edits":true,"docs":[{"n":1},{"_id":"b","n":2}]}"#)
    );
}

#[tokio::test]
async fn test_bulk_save_empty_is_rejected_locally() {
    let (client, transport) = client([]);

    let err = client
        .database("db")
        .bulk_save::<&str>(&[], true)
        .await
        .unwrap_err();

    assert!(matches!(err, CouchError::InvalidArgument(_)));
    assert_eq!(transport.request_count().await, 0);
}

#[tokio::test]
async fn test_bulk_not_found_is_not_tolerated() {
    let (client, _) = client([MockReply::json(404, &json!({ "error": "not_found", "reason": "no_db_file" }))]);

    let err = client
        .database("missing")
        .bulk_save(&[r#"{"n":1}"#], true)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_bulk_delete_marks_tombstones() {
    let (client, transport) = client([MockReply::json(201, &json!([{ "ok": true, "id": "a", "rev": "2-a" }]))]);

    let mut documents = vec![json!({ "_id": "a", "_rev": "1-a" })];

    client
        .database("db")
        .bulk_delete(&mut documents)
        .await
        .unwrap();

    assert_eq!(documents[0]["_rev"], "2-a");
    assert_eq!(
        transport.last_request().await.unwrap().body_text(),
        Some(r#"{"new_edits":true,"docs":[{"_deleted":true,"_id":"a","_rev":"1-a"}]}"#)
    );
}

#[tokio::test]
async fn test_attachments() {
    let (client, transport) = client([
        MockReply::json(201, &json!({ "ok": true, "id": "a", "rev": "2-a" })),
        MockReply::Response(TransportResponse::new(200, "hello").with_header("Content-Type", "text/plain")),
        MockReply::json(404, &json!({ "error": "not_found", "reason": "missing" })),
        MockReply::json(404, &json!({ "error": "not_found", "reason": "missing" })),
    ]);
    let db = client.database("db");

    let saved = db
        .save_attachment("a", Some("1-a"), "notes.txt", "text/plain", b"hello".to_vec())
        .await
        .unwrap();
    assert_eq!(saved.revision.as_deref(), Some("2-a"));

    let attachment = db.get_attachment("a", "notes.txt", None).await.unwrap().unwrap();
    assert_eq!(attachment.data, b"hello");
    assert_eq!(attachment.content_type.as_deref(), Some("text/plain"));

    assert_eq!(db.get_attachment("a", "gone.txt", None).await.unwrap(), None);

    let removed = db.delete_attachment("a", "2-a", "gone.txt").await.unwrap();
    assert_eq!(removed.revision.as_deref(), Some("2-a"));

    let requests = transport.requests().await;
    assert_eq!(requests[0].method, Method::PUT);
    assert_eq!(requests[0].url, "db/a/notes.txt?rev=1-a");
    assert_eq!(requests[0].content_type.as_deref(), Some("text/plain"));
    assert_eq!(requests[0].body.as_deref(), Some(&b"hello"[..]));
    assert_eq!(requests[1].url, "db/a/notes.txt");
    assert_eq!(requests[3].url, "db/a/gone.txt?rev=2-a");
}

#[tokio::test]
async fn test_info_and_exists() {
    let (client, _) = client([
        MockReply::json(200, &json!({ "db_name": "db", "doc_count": 4, "update_seq": "9-g" })),
        MockReply::raw(200, ""),
        MockReply::raw(404, ""),
    ]);

    let info = client.database("db").info().await.unwrap();
    assert_eq!(info.db_name, "db");
    assert_eq!(info.doc_count, 4);
    assert_eq!(info.doc_del_count, 0);

    assert!(client.database("db").exists().await.unwrap());
    assert!(!client.database("other").exists().await.unwrap());
}
