/// Object storage client for file attachments
///
/// Attachment bytes live in an S3-compatible HTTP store; the database
/// only keeps metadata and the storage key. Uploads must succeed before
/// any metadata row is written. Remote deletes are best-effort: a
/// failure is logged and the metadata delete proceeds, leaving at worst
/// an orphaned object.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::StorageConfig;

/// Errors from the object store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("object store returned {status}: {body}")]
    Store { status: u16, body: String },
}

/// Result of a successful upload
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Key the object was stored under
    pub key: String,

    /// Public URL for downloads
    pub url: String,
}

/// Abstraction over the object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads an object and returns its key and public URL
    async fn put(
        &self,
        filename: &str,
        mime_type: &str,
        data: Bytes,
    ) -> Result<StoredObject, StorageError>;

    /// Deletes an object by key
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Shared handle to the configured object store
pub type DynObjectStore = Arc<dyn ObjectStore>;

/// HTTP object store speaking plain PUT/DELETE against a bucket endpoint
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    api_token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            api_token: config.api_token.clone(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(
        &self,
        filename: &str,
        mime_type: &str,
        data: Bytes,
    ) -> Result<StoredObject, StorageError> {
        // Prefix with a UUID so concurrent uploads of the same filename
        // never collide.
        let key = format!("{}-{}", Uuid::new_v4(), filename);
        let url = self.object_url(&key);

        let mut request = self
            .client
            .put(&url)
            .header("Content-Type", mime_type)
            .body(data);

        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Store {
                status: status.as_u16(),
                body,
            });
        }

        Ok(StoredObject { key, url })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let url = self.object_url(key);

        let mut request = self.client.delete(&url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        // Missing objects are fine for delete
        if !status.is_success() && status.as_u16() != 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Store {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
