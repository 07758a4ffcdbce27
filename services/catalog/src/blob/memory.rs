//! In-memory blob store implementation

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use super::{BlobDownload, BlobError, BlobMetadata, BlobResult, BlobStore};

struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

/// In-memory blob store
///
/// Backs tests and local development. Delete failures can be injected per
/// identifier so the swallow-on-failure reconciliation policy is assertable.
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<Uuid, StoredObject>>,
    failing_deletes: RwLock<HashSet<Uuid>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            failing_deletes: RwLock::new(HashSet::new()),
        }
    }

    /// Whether a blob currently exists under the given identifier
    pub fn contains(&self, id: Uuid) -> bool {
        self.objects.read().unwrap().contains_key(&id)
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().unwrap().is_empty()
    }

    /// Make future deletes of the given identifier fail (for testing the
    /// swallow-on-failure policy)
    pub fn fail_delete_of(&self, id: Uuid) {
        self.failing_deletes.write().unwrap().insert(id);
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, data: Vec<u8>, content_type: &str) -> BlobResult<Uuid> {
        let id = Uuid::new_v4();
        self.objects.write().unwrap().insert(
            id,
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(id)
    }

    async fn open(&self, id: Uuid) -> BlobResult<BlobDownload> {
        let objects = self.objects.read().unwrap();
        let object = objects.get(&id).ok_or(BlobError::NotFound)?;

        Ok(BlobDownload {
            reader: Box::new(Cursor::new(object.data.clone())),
            content_type: object.content_type.clone(),
            length: object.data.len() as u64,
        })
    }

    async fn delete(&self, id: Uuid) -> BlobResult<()> {
        if self.failing_deletes.read().unwrap().contains(&id) {
            return Err(BlobError::Upstream("delete rejected".to_string()));
        }

        // Removing an absent blob succeeds, matching S3 semantics
        self.objects.write().unwrap().remove(&id);
        Ok(())
    }

    async fn metadata(&self, id: Uuid) -> BlobResult<BlobMetadata> {
        let objects = self.objects.read().unwrap();
        let object = objects.get(&id).ok_or(BlobError::NotFound)?;

        Ok(BlobMetadata {
            content_type: object.content_type.clone(),
            length: object.data.len() as u64,
        })
    }
}
