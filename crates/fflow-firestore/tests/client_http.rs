//! Firestore client tests against a mock HTTP server.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fflow_firestore::{
    DocumentStore, FirestoreClient, FirestoreConfig, FirestoreError, StaticToken,
};
use fflow_models::{Fields, Query};

const DOCS: &str = "/v1/projects/demo/databases/(default)/documents";

fn client(server: &MockServer) -> FirestoreClient {
    let config = FirestoreConfig::new("demo")
        .with_endpoint(server.uri())
        .with_api_key("web-key");
    FirestoreClient::with_tokens(config, Arc::new(StaticToken("id-token".into()))).unwrap()
}

fn fields(value: serde_json::Value) -> Fields {
    serde_json::from_value(value).unwrap()
}

fn wire_doc(id: &str, created: &str) -> serde_json::Value {
    json!({
        "name": format!("projects/demo/databases/(default)/documents/products/{}", id),
        "fields": {
            "name": {"stringValue": id},
            "price": {"integerValue": "1200"},
            "createdAt": {"timestampValue": created}
        }
    })
}

#[tokio::test]
async fn test_add_posts_converted_fields_and_returns_server_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/products", DOCS)))
        .and(header("x-goog-api-key", "web-key"))
        .and(header("authorization", "Bearer id-token"))
        .and(body_partial_json(json!({
            "fields": {
                "price": {"integerValue": "1200"},
                "createdAt": {"timestampValue": "2024-05-01T10:00:00.000000Z"}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(wire_doc("srv42", "2024-05-01T10:00:00Z")))
        .expect(1)
        .mount(&server)
        .await;

    let id = client(&server)
        .add(
            "products",
            fields(json!({"price": 1200, "createdAt": "2024-05-01T10:00:00.000000Z"})),
        )
        .await
        .unwrap();
    assert_eq!(id, "srv42");
}

#[tokio::test]
async fn test_get_missing_document_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/products/ghost", DOCS)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "Document not found", "status": "NOT_FOUND"}
        })))
        .mount(&server)
        .await;

    assert!(client(&server).get("products", "ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_reads_fields_back_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/products/p1", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(wire_doc("p1", "2024-05-01T10:00:00Z")))
        .mount(&server)
        .await;

    let doc = client(&server).get("products", "p1").await.unwrap().unwrap();
    assert_eq!(doc.id, "p1");
    assert_eq!(doc.get("price"), Some(&json!(1200)));
    assert_eq!(doc.get_str("createdAt"), Some("2024-05-01T10:00:00Z"));
}

#[tokio::test]
async fn test_merge_sends_mask_and_existence_precondition() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{}/orders/o1", DOCS)))
        .and(query_param("updateMask.fieldPaths", "status"))
        .and(query_param("currentDocument.exists", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/demo/databases/(default)/documents/orders/o1",
            "fields": {"status": {"stringValue": "shipped"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .merge("orders", "o1", fields(json!({"status": "shipped"})))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_merge_on_missing_document_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server)
        .merge("orders", "missing", fields(json!({"status": "shipped"})))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_tolerates_missing_document() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    client(&server).delete("reviews", "r1").await.unwrap();
}

#[tokio::test]
async fn test_empty_id_never_reaches_the_server() {
    let server = MockServer::start().await;
    let client = client(&server);

    assert!(client.get("products", "").await.unwrap().is_none());
    let err = client
        .merge("products", "", fields(json!({"price": 1})))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    client.delete("products", "").await.unwrap();

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_permission_denied_surfaces_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "Missing or insufficient permissions.", "status": "PERMISSION_DENIED"}
        })))
        .mount(&server)
        .await;

    let err = client(&server).get("orders", "o1").await.unwrap_err();
    assert!(matches!(err, FirestoreError::PermissionDenied(_)));
    assert!(err.to_string().contains("insufficient permissions"));
}

#[tokio::test]
async fn test_query_posts_filter_and_ordering() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .and(body_partial_json(json!({
            "structuredQuery": {
                "from": [{"collectionId": "products"}],
                "where": {"fieldFilter": {
                    "field": {"fieldPath": "category"},
                    "op": "EQUAL",
                    "value": {"stringValue": "saree"}
                }},
                "orderBy": [{"field": {"fieldPath": "createdAt"}, "direction": "DESCENDING"}]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"document": wire_doc("b", "2024-05-02T00:00:00Z"), "readTime": "2024-05-03T00:00:00Z"},
            {"document": wire_doc("a", "2024-05-01T00:00:00Z"), "readTime": "2024-05-03T00:00:00Z"}
        ])))
        .mount(&server)
        .await;

    let docs = client(&server)
        .query("products", &Query::where_eq("category", "saree"))
        .await
        .unwrap();
    let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
}

#[tokio::test]
async fn test_query_with_no_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"readTime": "2024-05-03T00:00:00Z"}])),
        )
        .mount(&server)
        .await;

    let docs = client(&server).query("products", &Query::all()).await.unwrap();
    assert!(docs.is_empty());
}

#[tokio::test]
async fn test_watch_reopens_closed_stream_from_resume_token() {
    let server = MockServer::start().await;
    let first_body = json!([
        {"targetChange": {"targetChangeType": "ADD", "targetIds": [1]}},
        {"documentChange": {"document": wire_doc("a", "2024-05-01T00:00:00Z"), "targetIds": [1]}},
        {"documentChange": {"document": wire_doc("b", "2024-05-02T00:00:00Z"), "targetIds": [1]}},
        {"targetChange": {"targetChangeType": "CURRENT", "targetIds": [1], "resumeToken": "dG9rLTE="}},
        {"targetChange": {"readTime": "2024-05-03T00:00:00Z"}}
    ]);
    let second_body = json!([
        {"targetChange": {"targetChangeType": "ADD", "targetIds": [1]}},
        {"documentChange": {"document": wire_doc("c", "2024-05-04T00:00:00Z"), "targetIds": [1]}},
        {"targetChange": {"targetChangeType": "CURRENT", "targetIds": [1], "resumeToken": "dG9rLTI="}},
        {"targetChange": {"readTime": "2024-05-04T00:00:01Z"}}
    ]);
    Mock::given(method("POST"))
        .and(path(format!("{}:listen", DOCS)))
        .and(body_partial_json(json!({
            "database": "projects/demo/databases/(default)",
            "addTarget": {"targetId": 1}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(first_body))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}:listen", DOCS)))
        .and(body_partial_json(json!({
            "addTarget": {"targetId": 1, "resumeToken": "dG9rLTE="}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(second_body))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let mut snapshots = client(&server).watch("products", Query::all());
    let first = tokio::time::timeout(Duration::from_secs(5), snapshots.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let ids: Vec<&str> = first.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);

    // The first body ends; the stream reopens and keeps the held documents.
    let second = tokio::time::timeout(Duration::from_secs(5), snapshots.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let ids: Vec<&str> = second.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "b", "a"]);

    // The third open is rejected by the server, which ends the stream.
    let rejected = tokio::time::timeout(Duration::from_secs(5), snapshots.next())
        .await
        .unwrap()
        .unwrap();
    assert!(rejected.is_err());
    assert!(snapshots.next().await.is_none());
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_watch_skips_heartbeats_without_changes() {
    let server = MockServer::start().await;
    let body = json!([
        {"targetChange": {"targetChangeType": "ADD", "targetIds": [1]}},
        {"documentChange": {"document": wire_doc("a", "2024-05-01T00:00:00Z"), "targetIds": [1]}},
        {"targetChange": {"targetChangeType": "CURRENT", "targetIds": [1]}},
        {"targetChange": {"readTime": "2024-05-03T00:00:00Z"}},
        {"targetChange": {"readTime": "2024-05-03T00:00:10Z"}},
        {"targetChange": {"readTime": "2024-05-03T00:00:20Z"}},
        {"targetChange": {"targetChangeType": "REMOVE", "targetIds": [1]}}
    ]);
    Mock::given(method("POST"))
        .and(path(format!("{}:listen", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let mut snapshots = client(&server).watch("products", Query::all());
    let first = snapshots.next().await.unwrap().unwrap();
    assert_eq!(first.len(), 1);
    let removed = snapshots.next().await.unwrap();
    assert!(matches!(removed, Err(FirestoreError::ListenFailed(_))));
    assert!(snapshots.next().await.is_none());
}

#[tokio::test]
async fn test_watch_reports_rejected_listen() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:listen", DOCS)))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": 401, "message": "Request had invalid authentication credentials.", "status": "UNAUTHENTICATED"}
        })))
        .mount(&server)
        .await;

    let mut snapshots = client(&server).watch("orders", Query::where_eq("userId", "u1"));
    let first = snapshots.next().await.unwrap();
    assert!(matches!(first, Err(FirestoreError::AuthError(_))));
    assert!(snapshots.next().await.is_none());
}
