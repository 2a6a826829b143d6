//! Media uploads.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures_util::future::join_all;
use tracing::{info, warn};

use fflow_models::{Outcome, StorageNamespace};
use fflow_storage::{object_key, ObjectStore, StorageError, UploadFile};

#[derive(Clone)]
pub struct StorageService {
    objects: Arc<dyn ObjectStore>,
}

impl StorageService {
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }

    /// Store `file` under `{namespace}/{epochMillis}_{name}`; returns its public URL.
    pub async fn upload(&self, file: UploadFile, namespace: &str) -> Outcome<String> {
        Outcome::from(self.put(file, namespace, Utc::now()).await)
    }

    /// `upload` into the default namespace (product images).
    pub async fn upload_product_image(&self, file: UploadFile) -> Outcome<String> {
        self.upload(file, StorageNamespace::default().as_str()).await
    }

    /// Upload all files concurrently. Returns the URLs of the uploads that
    /// succeeded, in input order; failed uploads are left out.
    ///
    /// Each file is keyed one millisecond after the previous one, so files
    /// sharing a name get distinct keys.
    pub async fn upload_many(&self, files: Vec<UploadFile>, namespace: &str) -> Outcome<Vec<String>> {
        let total = files.len();
        let started = Utc::now();
        let uploads = files.into_iter().zip(0i64..).map(|(file, index)| {
            self.put(file, namespace, started + Duration::milliseconds(index))
        });
        let urls: Vec<String> = join_all(uploads)
            .await
            .into_iter()
            .filter_map(Result::ok)
            .collect();

        if urls.len() < total {
            warn!(namespace, failed = total - urls.len(), total, "Some uploads failed");
        }
        Outcome::Success(urls)
    }

    /// Delete the object a previously returned URL points to.
    pub async fn delete(&self, url: &str) -> Outcome<()> {
        let result = async {
            let key = self.objects.key_from_url(url)?;
            self.objects.delete(&key).await?;
            info!(key = %key, "Deleted object");
            Ok::<_, StorageError>(())
        }
        .await;

        if let Err(e) = &result {
            warn!(url, error = %e, "Delete failed");
        }
        Outcome::from(result)
    }

    async fn put(
        &self,
        file: UploadFile,
        namespace: &str,
        at: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        let key = object_key(namespace, &file.name, at);
        let result = self.objects.put(&key, file.bytes, &file.content_type).await;
        match result {
            Ok(()) => {
                info!(key = %key, "Uploaded object");
                Ok(self.objects.public_url(&key))
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Upload failed");
                Err(e)
            }
        }
    }
}
