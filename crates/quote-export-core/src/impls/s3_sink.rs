//! ObjectStoreSink - S3 互換 object storage への BlobSink 実装
//!
//! クライアントは invocation ごとに 1 回だけ作り、全 PUT で使い回す。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload, RetryConfig};
use tracing::debug;

use crate::config::StorageConfig;
use crate::domain::{BlobKey, ErrorKind, ExportError};
use crate::ports::BlobSink;

/// [`BlobSink`] backed by any [`ObjectStore`].
///
/// Each blob is one `put` request: the service swaps the object in whole,
/// so readers see either the old body or the new one.
pub struct ObjectStoreSink {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreSink {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Build an S3 client for the configured bucket.
    ///
    /// Requests are signed with SigV4 but the payload itself is sent
    /// unsigned (`UNSIGNED-PAYLOAD`), which skips hashing every body before
    /// upload. Integrity then relies on TLS to the endpoint.
    ///
    /// The client's own request retries are switched off; see
    /// `upload_retry_config`.
    pub fn from_config(config: &StorageConfig) -> Result<Self, ExportError> {
        let s3 = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_region(&config.region)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_unsigned_payload(true)
            .with_virtual_hosted_style_request(false)
            .with_retry(upload_retry_config())
            .build()
            .map_err(|e| ExportError::Configuration(format!("object storage client: {e}")))?;

        debug!(
            endpoint = %config.endpoint,
            bucket = %config.bucket,
            "object storage client ready"
        );
        Ok(Self::new(Arc::new(s3)))
    }
}

/// A failed PUT is returned as is. Recovery is the export re-run after a
/// transient error, not a per-object retry inside the client.
fn upload_retry_config() -> RetryConfig {
    RetryConfig {
        max_retries: 0,
        retry_timeout: Duration::from_secs(3),
        ..Default::default()
    }
}

/// Throttling and network failures surface as `Generic`. Everything else
/// (auth, bad path, precondition) is not going to change on a re-run.
fn classify(err: &object_store::Error) -> ErrorKind {
    match err {
        object_store::Error::Generic { .. } => ErrorKind::Transient,
        _ => ErrorKind::Fatal,
    }
}

#[async_trait]
impl BlobSink for ObjectStoreSink {
    async fn put(&self, key: &BlobKey, body: Bytes) -> Result<(), ExportError> {
        let path = Path::from(key.as_str());

        self.store
            .put(&path, PutPayload::from_bytes(body))
            .await
            .map_err(|e| ExportError::Upload {
                key: key.to_string(),
                kind: classify(&e),
                message: e.to_string(),
            })?;

        Ok(())
    }
}
