//! Image attachment lifecycle
//!
//! Reconciles the set of image blobs a product should reference against the
//! blob store. Uploads are stored concurrently under fresh opaque
//! identifiers and joined in request order; blobs that fall out of a
//! product's image list are deleted with a per-blob swallow-on-failure
//! policy, so a failed delete can orphan a blob but never aborts the
//! record-level operation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::blob::{BlobDownload, BlobError, BlobResult, BlobStore};
use crate::models::ImageRef;

/// Upper bound on files accepted per create/update request
pub const MAX_IMAGES_PER_REQUEST: usize = 10;

/// Upper bound on a single file, in bytes (5 MiB)
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_CONTENT_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// Whether a declared content type passes the image upload filter
pub fn is_allowed_content_type(content_type: &str) -> bool {
    ALLOWED_CONTENT_TYPES.contains(&content_type)
}

/// Check one upload against the content-type and size caps
pub fn check_upload(content_type: &str, size: usize) -> Result<(), String> {
    if !is_allowed_content_type(content_type) {
        return Err(format!(
            "Unsupported image type: {} (allowed: jpeg, jpg, png, gif, webp)",
            content_type
        ));
    }

    if size > MAX_IMAGE_BYTES {
        return Err("Image exceeds the 5 MiB size limit".to_string());
    }

    Ok(())
}

/// An upload accepted by the filter but not yet stored
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Result of one attempted blob delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub id: Uuid,
    pub ok: bool,
}

/// The new image list for a product and the blobs that fall out of it
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    pub new_list: Vec<ImageRef>,
    pub to_delete: Vec<Uuid>,
}

/// Image lifecycle manager over an injected blob store
#[derive(Clone)]
pub struct ImageLifecycle {
    store: Arc<dyn BlobStore>,
}

impl ImageLifecycle {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Store accepted uploads as new blobs, concurrently
    ///
    /// Tasks run in parallel but results are joined in request order, so the
    /// returned references preserve the order files appeared in the request.
    /// If any upload fails, the blobs that did store are deleted again
    /// (best effort) and the first error is returned.
    pub async fn store_uploads(&self, uploads: Vec<PendingUpload>) -> BlobResult<Vec<ImageRef>> {
        let mut handles = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let store = Arc::clone(&self.store);
            let PendingUpload {
                filename,
                content_type,
                data,
            } = upload;
            let declared = content_type.clone();
            let handle = tokio::spawn(async move { store.store(data, &declared).await });
            handles.push((filename, content_type, handle));
        }

        let mut stored = Vec::with_capacity(handles.len());
        let mut failure = None;
        for (filename, content_type, handle) in handles {
            match handle.await {
                Ok(Ok(id)) => stored.push(ImageRef {
                    id,
                    filename,
                    content_type,
                }),
                Ok(Err(e)) => {
                    failure.get_or_insert(e);
                }
                Err(e) => {
                    failure.get_or_insert(BlobError::Upstream(e.to_string()));
                }
            }
        }

        if let Some(err) = failure {
            let ids = stored.iter().map(|image| image.id).collect();
            self.delete_blobs(ids).await;
            return Err(err);
        }

        Ok(stored)
    }

    /// Compute a product's new image list and the blobs to delete
    ///
    /// Retained identifiers are honored in the order supplied, filtered to
    /// members of the previous list (a request cannot adopt blobs belonging
    /// to another product), with duplicates dropped. Newly stored uploads
    /// are appended after the retained references. Everything in the
    /// previous list that is absent from the new list is scheduled for
    /// deletion.
    pub fn reconcile(
        previous: &[ImageRef],
        retained_ids: &[Uuid],
        new_uploads: Vec<ImageRef>,
    ) -> ReconcilePlan {
        let by_id: HashMap<Uuid, &ImageRef> =
            previous.iter().map(|image| (image.id, image)).collect();

        let mut new_list = Vec::with_capacity(retained_ids.len() + new_uploads.len());
        let mut seen = HashSet::new();
        for id in retained_ids {
            if let Some(image) = by_id.get(id) {
                if seen.insert(*id) {
                    new_list.push((*image).clone());
                }
            }
        }
        new_list.extend(new_uploads);

        let kept: HashSet<Uuid> = new_list.iter().map(|image| image.id).collect();
        let to_delete = previous
            .iter()
            .map(|image| image.id)
            .filter(|id| !kept.contains(id))
            .collect();

        ReconcilePlan {
            new_list,
            to_delete,
        }
    }

    /// Delete blobs concurrently, swallowing per-item failures
    ///
    /// Every attempted delete is reported in the returned outcomes; a
    /// failure is logged and marked, never propagated.
    pub async fn delete_blobs(&self, ids: Vec<Uuid>) -> Vec<DeleteOutcome> {
        let mut handles = Vec::with_capacity(ids.len());
        for id in ids {
            let store = Arc::clone(&self.store);
            handles.push((id, tokio::spawn(async move { store.delete(id).await })));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            let ok = match handle.await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    warn!("Failed to delete blob {}: {}", id, e);
                    false
                }
                Err(e) => {
                    warn!("Delete task for blob {} failed: {}", id, e);
                    false
                }
            };
            outcomes.push(DeleteOutcome { id, ok });
        }

        outcomes
    }

    /// Open a blob for streaming to a caller
    pub async fn open(&self, id: Uuid) -> BlobResult<BlobDownload> {
        self.store.open(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;

    fn upload(name: &str) -> PendingUpload {
        PendingUpload {
            filename: name.to_string(),
            content_type: "image/png".to_string(),
            data: name.as_bytes().to_vec(),
        }
    }

    fn lifecycle() -> (Arc<MemoryBlobStore>, ImageLifecycle) {
        let store = Arc::new(MemoryBlobStore::new());
        let manager = ImageLifecycle::new(store.clone());
        (store, manager)
    }

    #[test]
    fn test_upload_filter_accepts_images_only() {
        assert!(check_upload("image/jpeg", 1024).is_ok());
        assert!(check_upload("image/webp", MAX_IMAGE_BYTES).is_ok());
        assert!(check_upload("application/pdf", 1024).is_err());
        assert!(check_upload("video/mp4", 1024).is_err());
        assert!(check_upload("image/png", MAX_IMAGE_BYTES + 1).is_err());
    }

    #[tokio::test]
    async fn test_store_uploads_preserves_request_order() {
        let (store, manager) = lifecycle();

        let images = manager
            .store_uploads(vec![upload("first.png"), upload("second.png"), upload("third.png")])
            .await
            .unwrap();

        assert_eq!(images.len(), 3);
        assert_eq!(images[0].filename, "first.png");
        assert_eq!(images[1].filename, "second.png");
        assert_eq!(images[2].filename, "third.png");

        // Identifiers are distinct and every blob is retrievable
        let ids: HashSet<Uuid> = images.iter().map(|image| image.id).collect();
        assert_eq!(ids.len(), 3);
        for image in &images {
            assert!(store.contains(image.id));
            assert!(manager.open(image.id).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_reconcile_retains_and_appends_then_deletes_the_rest() {
        let (store, manager) = lifecycle();

        let previous = manager
            .store_uploads(vec![upload("a.png"), upload("b.png"), upload("c.png")])
            .await
            .unwrap();
        let (a, b, c) = (previous[0].clone(), previous[1].clone(), previous[2].clone());

        let new_upload = manager.store_uploads(vec![upload("d.png")]).await.unwrap();
        let d = new_upload[0].clone();

        let plan = ImageLifecycle::reconcile(&previous, &[a.id, c.id], new_upload);

        let new_ids: Vec<Uuid> = plan.new_list.iter().map(|image| image.id).collect();
        assert_eq!(new_ids, vec![a.id, c.id, d.id]);
        assert_eq!(plan.to_delete, vec![b.id]);

        let outcomes = manager.delete_blobs(plan.to_delete).await;
        assert_eq!(outcomes, vec![DeleteOutcome { id: b.id, ok: true }]);

        assert!(manager.open(b.id).await.is_err());
        for id in [a.id, c.id, d.id] {
            assert!(manager.open(id).await.is_ok());
        }
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_reconcile_ignores_foreign_and_duplicate_retained_ids() {
        let previous = vec![
            ImageRef {
                id: Uuid::new_v4(),
                filename: "a.png".to_string(),
                content_type: "image/png".to_string(),
            },
            ImageRef {
                id: Uuid::new_v4(),
                filename: "b.png".to_string(),
                content_type: "image/png".to_string(),
            },
        ];
        let foreign = Uuid::new_v4();

        let plan = ImageLifecycle::reconcile(
            &previous,
            &[previous[0].id, foreign, previous[0].id],
            Vec::new(),
        );

        assert_eq!(plan.new_list, vec![previous[0].clone()]);
        assert_eq!(plan.to_delete, vec![previous[1].id]);
    }

    #[test]
    fn test_reconcile_with_empty_retained_list_removes_everything() {
        let previous = vec![ImageRef {
            id: Uuid::new_v4(),
            filename: "a.png".to_string(),
            content_type: "image/png".to_string(),
        }];

        let plan = ImageLifecycle::reconcile(&previous, &[], Vec::new());
        assert!(plan.new_list.is_empty());
        assert_eq!(plan.to_delete, vec![previous[0].id]);
    }

    #[tokio::test]
    async fn test_purging_a_product_deletes_every_blob() {
        let (store, manager) = lifecycle();

        let images = manager
            .store_uploads(vec![upload("a.png"), upload("b.png"), upload("c.png")])
            .await
            .unwrap();

        let ids: Vec<Uuid> = images.iter().map(|image| image.id).collect();
        let outcomes = manager.delete_blobs(ids.clone()).await;

        assert!(outcomes.iter().all(|outcome| outcome.ok));
        assert!(store.is_empty());
        for id in ids {
            assert!(manager.open(id).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_delete_failures_are_swallowed_and_reported() {
        let (store, manager) = lifecycle();

        let images = manager
            .store_uploads(vec![upload("keep-failing.png"), upload("fine.png")])
            .await
            .unwrap();
        let (failing, fine) = (images[0].id, images[1].id);

        store.fail_delete_of(failing);
        let outcomes = manager.delete_blobs(vec![failing, fine]).await;

        assert_eq!(
            outcomes,
            vec![
                DeleteOutcome {
                    id: failing,
                    ok: false
                },
                DeleteOutcome { id: fine, ok: true },
            ]
        );

        // The failed blob is orphaned, not resurrected as an error
        assert!(store.contains(failing));
        assert!(!store.contains(fine));
    }
}
