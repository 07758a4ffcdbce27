//! Blob store abstraction
//!
//! Products reference their images by opaque blob identifier; this module
//! owns how those blobs are stored and retrieved. The production
//! implementation is S3-backed; an in-memory implementation backs tests and
//! local development. The store handle is constructed at startup and
//! injected wherever blobs are touched; there is no ambient global.

pub mod memory;
pub mod s3;

pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;
use uuid::Uuid;

/// Errors surfaced by blob store implementations
#[derive(Error, Debug)]
pub enum BlobError {
    /// No blob exists under the given identifier
    #[error("Blob not found")]
    NotFound,

    /// The backing store failed
    #[error("Blob store failure: {0}")]
    Upstream(String),
}

/// Type alias for blob store results
pub type BlobResult<T> = Result<T, BlobError>;

/// Metadata kept alongside a stored blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMetadata {
    pub content_type: String,
    pub length: u64,
}

/// An opened blob ready to be streamed to a caller
pub struct BlobDownload {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    pub content_type: String,
    pub length: u64,
}

/// Content store keyed by generated identifiers
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a binary object under a freshly generated opaque identifier
    ///
    /// The identifier is random so that names cannot collide and original
    /// filenames never leak into the store.
    async fn store(&self, data: Vec<u8>, content_type: &str) -> BlobResult<Uuid>;

    /// Open a blob for streaming
    async fn open(&self, id: Uuid) -> BlobResult<BlobDownload>;

    /// Delete a blob; deleting an absent blob is not an error
    async fn delete(&self, id: Uuid) -> BlobResult<()>;

    /// Look up a blob's metadata without reading its content
    async fn metadata(&self, id: Uuid) -> BlobResult<BlobMetadata>;
}
