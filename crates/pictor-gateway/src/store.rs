use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::GatewayError;

/// Facade trait for durable object storage.
///
/// One `put` per successful request, under a freshly generated key; `presign`
/// derives a time-limited read link for the stored object.
pub trait ArtifactStore: Send + Sync {
    fn put<'a>(
        &'a self,
        key: &'a str,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>>;

    fn presign<'a>(
        &'a self,
        key: &'a str,
        expires_in: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send + 'a>>;
}

/// Object storage backed by S3.
pub struct S3ArtifactStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ArtifactStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

impl ArtifactStore for S3ArtifactStore {
    fn put<'a>(
        &'a self,
        key: &'a str,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>> {
        Box::pin(async move {
            let body = ByteStream::from_path(path)
                .await
                .map_err(|e| GatewayError::Storage(format!("reading {}: {e}", path.display())))?;

            tracing::debug!(bucket = %self.bucket, key, "Uploading artifact");
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(body)
                .send()
                .await
                .map_err(|e| GatewayError::Storage(format!("upload of {key}: {e}")))?;

            Ok(())
        })
    }

    fn presign<'a>(
        &'a self,
        key: &'a str,
        expires_in: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send + 'a>> {
        Box::pin(async move {
            let config = PresigningConfig::expires_in(expires_in)
                .map_err(|e| GatewayError::Storage(format!("presign config: {e}")))?;

            let request = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .presigned(config)
                .await
                .map_err(|e| GatewayError::Storage(format!("presigning {key}: {e}")))?;

            Ok(request.uri().to_string())
        })
    }
}

/// A stored object as the in-memory store saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub bytes: u64,
}

/// In-memory object store for tests.
///
/// Records uploads and presign requests; presigned URLs embed the expiry so
/// tests can assert it.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<Vec<StoredObject>>,
    presigned: Mutex<Vec<(String, Duration)>>,
    fail_put: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose uploads always fail.
    pub fn failing_put() -> Self {
        Self {
            fail_put: true,
            ..Self::default()
        }
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().expect("objects lock").clone()
    }

    pub fn presigned(&self) -> Vec<(String, Duration)> {
        self.presigned.lock().expect("presigned lock").clone()
    }
}

impl ArtifactStore for MemoryStore {
    fn put<'a>(
        &'a self,
        key: &'a str,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>> {
        Box::pin(async move {
            if self.fail_put {
                return Err(GatewayError::Storage("stub upload failure".into()));
            }

            let bytes = tokio::fs::metadata(path)
                .await
                .map_err(|e| GatewayError::Storage(format!("reading {}: {e}", path.display())))?
                .len();

            self.objects.lock().expect("objects lock").push(StoredObject {
                key: key.to_string(),
                bytes,
            });
            Ok(())
        })
    }

    fn presign<'a>(
        &'a self,
        key: &'a str,
        expires_in: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send + 'a>> {
        Box::pin(async move {
            self.presigned
                .lock()
                .expect("presigned lock")
                .push((key.to_string(), expires_in));
            Ok(format!(
                "https://stub-store.local/{key}?expires={}",
                expires_in.as_secs()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_records_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.png");
        tokio::fs::write(&path, b"png bytes").await.unwrap();

        let store = MemoryStore::new();
        store.put("abc.png", &path).await.unwrap();

        let objects = store.objects();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "abc.png");
        assert_eq!(objects[0].bytes, 9);
    }

    #[tokio::test]
    async fn memory_store_presign_embeds_expiry() {
        let store = MemoryStore::new();
        let url = store
            .presign("abc.png", Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(url, "https://stub-store.local/abc.png?expires=3600");
        assert_eq!(
            store.presigned(),
            vec![("abc.png".to_string(), Duration::from_secs(3600))]
        );
    }

    #[tokio::test]
    async fn failing_store_reports_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.png");
        tokio::fs::write(&path, b"png bytes").await.unwrap();

        let store = MemoryStore::failing_put();
        let err = store.put("abc.png", &path).await.unwrap_err();
        assert!(matches!(err, GatewayError::Storage(_)));
        assert_eq!(err.status_code(), 500);
    }
}
