//! Firestore REST API client.
//!
//! - Pluggable access tokens (service account, signed-in user, none)
//! - HTTP client tuning (pooling, timeouts)
//! - Observability (tracing spans, metrics)
//!
//! Nothing is retried here; a failed request surfaces as an error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, info_span, Instrument};

use fflow_models::Query;

use crate::convert::{field_path, structured_query};
use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::{record_documents_returned, record_request};
use crate::tokens::{AccessTokenSource, Anonymous};
use crate::types::{
    Document, ListenRequest, QueryTarget, RunQueryRequest, RunQueryResponse, StructuredQuery,
    Target, Value,
};

/// Production Firestore endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://firestore.googleapis.com";

/// Header carrying the web API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Target id used for every listen stream; one target per stream.
pub(crate) const LISTEN_TARGET_ID: i32 = 1;

// =============================================================================
// Configuration
// =============================================================================

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    /// Web API key, sent with every request when set
    pub api_key: Option<String>,
    /// Scheme and host, e.g. the emulator at `http://localhost:8080`
    pub endpoint: String,
    /// Request timeout (not applied to listen streams)
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl FirestoreConfig {
    /// Config for a project with default database, endpoint and timeouts.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database_id: "(default)".to_string(),
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = std::env::var("FIREBASE_PROJECT_ID")
            .or_else(|_| std::env::var("GCP_PROJECT_ID"))
            .map_err(|_| {
                FirestoreError::auth_error(
                    "FIREBASE_PROJECT_ID or GCP_PROJECT_ID must be set to access Firestore",
                )
            })?;

        if project_id.is_empty() {
            return Err(FirestoreError::auth_error(
                "FIREBASE_PROJECT_ID or GCP_PROJECT_ID cannot be empty",
            ));
        }

        let connect_timeout_secs: u64 = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            api_key: std::env::var("FIREBASE_API_KEY").ok().filter(|k| !k.is_empty()),
            endpoint: std::env::var("FIRESTORE_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
        })
    }

    /// `projects/{project}/databases/{database}`
    pub fn database_name(&self) -> String {
        format!("projects/{}/databases/{}", self.project_id, self.database_id)
    }
}

// =============================================================================
// Client
// =============================================================================

/// Firestore REST API client.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    /// No overall timeout; listen responses stay open indefinitely.
    stream_http: Client,
    config: FirestoreConfig,
    base_url: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl FirestoreClient {
    /// Create a client that sends requests unauthenticated.
    pub fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        Self::with_tokens(config, Arc::new(Anonymous))
    }

    /// Create a client that authorizes requests with tokens from `tokens`.
    pub fn with_tokens(
        config: FirestoreConfig,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> FirestoreResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("fflow-firestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        let stream_http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("fflow-firestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        let base_url = format!(
            "{}/v1/{}/documents",
            config.endpoint.trim_end_matches('/'),
            config.database_name()
        );

        Ok(Self {
            http,
            stream_http,
            config,
            base_url,
            tokens,
        })
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    /// Full resource name of a document.
    pub fn full_document_name(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "{}/documents/{}/{}",
            self.config.database_name(),
            collection,
            doc_id
        )
    }

    fn document_path(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        )
    }

    /// Attach the API key and, when available, the bearer token.
    async fn authorize(&self, request: RequestBuilder) -> FirestoreResult<RequestBuilder> {
        let mut request = request;
        if let Some(key) = &self.config.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        if let Some(token) = self.tokens.access_token().await? {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    // =========================================================================
    // CRUD Operations
    // =========================================================================

    /// Get a document. A missing document is `Ok(None)`.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        // An empty id would address the collection itself.
        if doc_id.is_empty() {
            return Ok(None);
        }
        let url = self.document_path(collection, doc_id);

        self.execute_request("get_document", collection, Some(doc_id), async {
            let response = self.authorize(self.http.get(&url)).await?.send().await?;
            let status = response.status();

            match status {
                StatusCode::OK => Ok(Some(response.json().await?)),
                StatusCode::NOT_FOUND => Ok(None),
                _ => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Create a document with a server-assigned id.
    pub async fn create_document(
        &self,
        collection: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let url = format!("{}/{}", self.base_url, collection);
        let body = Document::new(fields);

        self.execute_request("create_document", collection, None, async {
            let response = self
                .authorize(self.http.post(&url))
                .await?
                .json(&body)
                .send()
                .await?;
            let status = response.status();

            match status {
                StatusCode::OK | StatusCode::CREATED => {
                    let doc: Document = response.json().await?;
                    debug!(name = ?doc.name, "Created document");
                    Ok(doc)
                }
                _ => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Merge `fields` into an existing document.
    ///
    /// Only the paths in `update_mask` are written. The document must exist;
    /// otherwise the call fails with `NotFound`.
    pub async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: &[String],
    ) -> FirestoreResult<Document> {
        if doc_id.is_empty() {
            return Err(FirestoreError::not_found(format!("{}/", collection)));
        }
        let mut params: Vec<String> = update_mask
            .iter()
            .map(|f| format!("updateMask.fieldPaths={}", urlencoding::encode(&field_path(f))))
            .collect();
        params.push("currentDocument.exists=true".to_string());
        let url = format!("{}?{}", self.document_path(collection, doc_id), params.join("&"));

        let body = Document::new(fields);

        self.execute_request("update_document", collection, Some(doc_id), async {
            let response = self
                .authorize(self.http.patch(&url))
                .await?
                .json(&body)
                .send()
                .await?;
            let status = response.status();

            match status {
                StatusCode::OK => Ok(response.json().await?),
                StatusCode::NOT_FOUND => Err(FirestoreError::not_found(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                _ => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Delete a document. Deleting a missing document succeeds.
    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<()> {
        if doc_id.is_empty() {
            return Ok(());
        }
        let url = self.document_path(collection, doc_id);

        self.execute_request("delete_document", collection, Some(doc_id), async {
            let response = self.authorize(self.http.delete(&url)).await?.send().await?;
            let status = response.status();

            match status {
                StatusCode::OK | StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(()),
                _ => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    // =========================================================================
    // Query Operations
    // =========================================================================

    /// Run a structured query against top-level collections.
    pub async fn run_query(&self, query: StructuredQuery) -> FirestoreResult<Vec<Document>> {
        let url = format!("{}:runQuery", self.base_url);
        let collection = query
            .from
            .first()
            .map(|c| c.collection_id.clone())
            .unwrap_or_default();
        let request = RunQueryRequest {
            structured_query: query,
        };

        self.execute_request("run_query", &collection, None, async {
            let response = self
                .authorize(self.http.post(&url))
                .await?
                .json(&request)
                .send()
                .await?;
            let status = response.status();

            match status {
                StatusCode::OK => {
                    let body = response.text().await?;
                    // runQuery returns a JSON array of RunQueryResponse objects
                    let responses: Vec<RunQueryResponse> =
                        serde_json::from_str(&body).map_err(|e| {
                            FirestoreError::InvalidResponse(format!(
                                "Failed to parse runQuery response: {} (body prefix: {})",
                                e,
                                body.chars().take(200).collect::<String>()
                            ))
                        })?;

                    let docs: Vec<Document> =
                        responses.into_iter().filter_map(|r| r.document).collect();
                    record_documents_returned(&collection, docs.len());

                    Ok(docs)
                }
                _ => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Open a listen stream for `query` on `collection`, resuming after
    /// `resume_token` when one is given.
    ///
    /// Returns the raw streaming response; `listen::watch` turns it into
    /// snapshots.
    pub async fn open_listen(
        &self,
        collection: &str,
        query: &Query,
        resume_token: Option<&str>,
    ) -> FirestoreResult<reqwest::Response> {
        let url = format!("{}:listen", self.base_url);
        let request = ListenRequest {
            database: self.config.database_name(),
            add_target: Some(Target {
                query: QueryTarget {
                    parent: format!("{}/documents", self.config.database_name()),
                    structured_query: structured_query(collection, query),
                },
                target_id: LISTEN_TARGET_ID,
                resume_token: resume_token.map(str::to_string),
            }),
        };

        self.execute_request("listen", collection, None, async {
            let response = self
                .authorize(self.stream_http.post(&url))
                .await?
                .json(&request)
                .send()
                .await?;
            let status = response.status();

            match status {
                StatusCode::OK => Ok(response),
                _ => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// Execute a request with tracing and metrics.
    async fn execute_request<T, F>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        fut: F,
    ) -> FirestoreResult<T>
    where
        F: std::future::Future<Output = FirestoreResult<T>>,
    {
        let span = if let Some(id) = doc_id {
            info_span!("firestore_request", operation = %operation, collection = %collection, doc_id = %id)
        } else {
            info_span!("firestore_request", operation = %operation, collection = %collection)
        };

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn handle_error_response(
        status: StatusCode,
        url: &str,
        response: reqwest::Response,
    ) -> FirestoreError {
        let body = response.text().await.unwrap_or_default();
        debug!(url = %url, status = status.as_u16(), "Firestore request failed");
        FirestoreError::from_http_status(status.as_u16(), body)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_from_env_validates_project_id() {
        std::env::remove_var("GCP_PROJECT_ID");
        std::env::remove_var("FIREBASE_PROJECT_ID");
        let result = FirestoreConfig::from_env();
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_config_default_values() {
        std::env::remove_var("FIREBASE_PROJECT_ID");
        std::env::set_var("GCP_PROJECT_ID", "test-project");
        std::env::remove_var("FIRESTORE_CONNECT_TIMEOUT_SECS");
        std::env::remove_var("FIRESTORE_ENDPOINT");
        std::env::remove_var("FIREBASE_API_KEY");
        let config = FirestoreConfig::from_env().unwrap();
        assert_eq!(config.project_id, "test-project");
        assert_eq!(config.database_id, "(default)");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert!(config.api_key.is_none());
        std::env::remove_var("GCP_PROJECT_ID");
    }

    #[test]
    #[serial]
    fn test_config_prefers_firebase_project_id() {
        std::env::set_var("FIREBASE_PROJECT_ID", "fashion-flow");
        std::env::set_var("GCP_PROJECT_ID", "other");
        let config = FirestoreConfig::from_env().unwrap();
        assert_eq!(config.project_id, "fashion-flow");
        std::env::remove_var("FIREBASE_PROJECT_ID");
        std::env::remove_var("GCP_PROJECT_ID");
    }

    #[test]
    fn test_paths() {
        let client = FirestoreClient::new(
            FirestoreConfig::new("demo").with_endpoint("http://localhost:8080/"),
        )
        .unwrap();
        assert_eq!(
            client.document_path("products", "abc"),
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents/products/abc"
        );
        assert_eq!(
            client.full_document_name("orders", "o1"),
            "projects/demo/databases/(default)/documents/orders/o1"
        );
    }
}
