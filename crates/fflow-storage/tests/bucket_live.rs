//! Bucket integration tests.

use chrono::Utc;
use fflow_storage::{object_key, BucketClient, ObjectStore};

/// Test bucket connectivity.
#[tokio::test]
#[ignore = "requires storage credentials"]
async fn test_bucket_connection() {
    dotenvy::dotenv().ok();

    let client = BucketClient::from_env()
        .await
        .expect("Failed to create bucket client");

    client
        .check_connectivity()
        .await
        .expect("Failed to check bucket connectivity");
}

/// Test upload, URL mapping and delete.
#[tokio::test]
#[ignore = "requires storage credentials"]
async fn test_upload_delete_cycle() {
    dotenvy::dotenv().ok();

    let client = BucketClient::from_env()
        .await
        .expect("Failed to create bucket client");

    let key = object_key("test/integration", "probe.txt", Utc::now());
    client
        .put(&key, b"Integration test content".to_vec(), "text/plain")
        .await
        .expect("Failed to upload");
    assert!(client.exists(&key).await.expect("Failed to check object"));

    let url = client.public_url(&key);
    assert_eq!(client.key_from_url(&url).expect("Failed to map URL"), key);

    client.delete(&key).await.expect("Failed to delete");
    assert!(!client.exists(&key).await.expect("Failed to check object"));
    assert!(client.delete(&key).await.unwrap_err().is_not_found());
}
