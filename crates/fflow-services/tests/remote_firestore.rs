//! Services over a mocked Firestore REST endpoint.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fflow_firestore::{FirestoreClient, FirestoreConfig, StaticToken};
use fflow_services::{Collection, CollectionService};

const LISTEN: &str = "/v1/projects/demo/databases/(default)/documents:listen";
const WAIT: Duration = Duration::from_secs(5);

fn wire_doc(id: &str, created: &str) -> serde_json::Value {
    json!({
        "name": format!("projects/demo/databases/(default)/documents/products/{}", id),
        "fields": {
            "name": {"stringValue": id},
            "createdAt": {"timestampValue": created}
        }
    })
}

fn listen_body(doc: serde_json::Value, token: &str, read_time: &str) -> serde_json::Value {
    json!([
        {"targetChange": {"targetChangeType": "ADD", "targetIds": [1]}},
        {"documentChange": {"document": doc, "targetIds": [1]}},
        {"targetChange": {"targetChangeType": "CURRENT", "targetIds": [1], "resumeToken": token}},
        {"targetChange": {"readTime": read_time}}
    ])
}

#[tokio::test]
async fn test_subscription_survives_server_closing_the_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LISTEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(listen_body(
            wire_doc("a", "2024-05-01T00:00:00Z"),
            "dG9rLTE=",
            "2024-05-01T00:00:01Z",
        )))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(LISTEN))
        .and(body_partial_json(json!({"addTarget": {"resumeToken": "dG9rLTE="}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(listen_body(
            wire_doc("b", "2024-05-02T00:00:00Z"),
            "dG9rLTI=",
            "2024-05-02T00:00:01Z",
        )))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let config = FirestoreConfig::new("demo").with_endpoint(server.uri());
    let client =
        FirestoreClient::with_tokens(config, Arc::new(StaticToken("id-token".into()))).unwrap();
    let products = CollectionService::new(Arc::new(client), Collection::Products);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let sub = products.subscribe_to_changes(move |docs| {
        let ids: Vec<String> = docs.into_iter().map(|d| d.id).collect();
        let _ = tx.send(ids);
    });

    assert_eq!(timeout(WAIT, rx.recv()).await.unwrap(), Some(vec!["a".to_string()]));
    assert_eq!(
        timeout(WAIT, rx.recv()).await.unwrap(),
        Some(vec!["b".to_string(), "a".to_string()])
    );
    sub.unsubscribe();
}

#[tokio::test]
async fn test_empty_id_is_not_found_like_in_memory() {
    let server = MockServer::start().await;
    let config = FirestoreConfig::new("demo").with_endpoint(server.uri());
    let client =
        FirestoreClient::with_tokens(config, Arc::new(StaticToken("id-token".into()))).unwrap();
    let products = CollectionService::new(Arc::new(client), Collection::Products);

    assert_eq!(products.get_by_id("").await.error(), Some("Product not found"));
    assert_eq!(
        products
            .update("", serde_json::from_value(json!({"price": 1})).unwrap())
            .await
            .error(),
        Some("Product not found")
    );
}
