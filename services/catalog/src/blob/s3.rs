//! S3-backed blob store

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;
use uuid::Uuid;

use super::{BlobDownload, BlobError, BlobMetadata, BlobResult, BlobStore};

/// Blob store backed by an S3-compatible bucket
///
/// Objects are keyed by their generated identifier; the declared content
/// type is kept as object metadata.
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    /// Create a new S3 blob store over an existing client
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn store(&self, data: Vec<u8>, content_type: &str) -> BlobResult<Uuid> {
        let id = Uuid::new_v4();
        let size = data.len();

        debug!("PUT {} ({} bytes, {})", id, size, content_type);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(id.to_string())
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| BlobError::Upstream(e.to_string()))?;

        Ok(id)
    }

    async fn open(&self, id: Uuid) -> BlobResult<BlobDownload> {
        debug!("GET {}", id);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(id.to_string())
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") || e.to_string().contains("404") {
                    BlobError::NotFound
                } else {
                    BlobError::Upstream(e.to_string())
                }
            })?;

        let content_type = response
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let length = response.content_length().unwrap_or(0).max(0) as u64;

        Ok(BlobDownload {
            reader: Box::new(response.body.into_async_read()),
            content_type,
            length,
        })
    }

    async fn delete(&self, id: Uuid) -> BlobResult<()> {
        debug!("DELETE {}", id);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(id.to_string())
            .send()
            .await
            .map_err(|e| BlobError::Upstream(e.to_string()))?;

        Ok(())
    }

    async fn metadata(&self, id: Uuid) -> BlobResult<BlobMetadata> {
        debug!("HEAD {}", id);

        let response = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(id.to_string())
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NotFound") || e.to_string().contains("404") {
                    BlobError::NotFound
                } else {
                    BlobError::Upstream(e.to_string())
                }
            })?;

        Ok(BlobMetadata {
            content_type: response
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string(),
            length: response.content_length().unwrap_or(0).max(0) as u64,
        })
    }
}
