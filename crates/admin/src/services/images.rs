//! Product image management.
//!
//! Image bytes go to object storage and a row pointing at them goes to the
//! database. The two writes cannot share a transaction, so each operation
//! orders them so that a failure never leaves a row pointing at nothing:
//!
//! - **Upload**: check the file against the [`UploadPolicy`] before any
//!   network call, upload the object, then insert the row. If the insert
//!   fails the object is removed again.
//! - **Delete**: remove the object first. If that fails the row is kept
//!   and the caller is told; the row is only deleted once its object is gone.
//! - **Move**: apply the [`ReorderPlan`] one row at a time. If an update
//!   fails, the updates already applied are reverted in reverse order.

use std::future::Future;

use axum::body::Bytes;
use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use thiserror::Error;
use tracing::instrument;

use mytechgear_core::media::{
    Bucket, MoveDirection, ObjectKey, ReorderPlan, SortUpdate, UploadPolicy, UploadRejection,
    UploadedImage, object_path,
};
use mytechgear_core::{ImageId, ProductId, VariantId};

use crate::db::RepositoryError;
use crate::models::{ImageRecord, NewImage};
use crate::storage::{ObjectStorage, StorageError};

/// Length of the random part of object names.
const SUFFIX_LENGTH: usize = 8;

/// Image rows the service reads and writes.
pub trait ImageStore: Send + Sync {
    /// Images of a product in display order.
    fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<Vec<ImageRecord>, RepositoryError>> + Send;

    /// Images attached to one variant, in display order.
    fn list_for_variant(
        &self,
        variant_id: VariantId,
    ) -> impl Future<Output = Result<Vec<ImageRecord>, RepositoryError>> + Send;

    fn get(
        &self,
        id: ImageId,
    ) -> impl Future<Output = Result<Option<ImageRecord>, RepositoryError>> + Send;

    /// Insert a row after every existing image of the product.
    ///
    /// `NotFound` if the product does not exist.
    fn insert(
        &self,
        image: &NewImage,
    ) -> impl Future<Output = Result<ImageRecord, RepositoryError>> + Send;

    fn delete(&self, id: ImageId) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn set_sort_order(
        &self,
        id: ImageId,
        sort_order: i32,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// A file received from the browser.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::try_from(self.bytes.len()).unwrap_or(u64::MAX)
    }
}

/// Where an uploaded product image belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTarget {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub bucket: Bucket,
}

/// Image operation failures.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The file was refused before anything was sent to storage.
    #[error(transparent)]
    Rejected(#[from] UploadRejection),

    #[error("image not found")]
    NotFound,

    /// Already first (moving up) or last (moving down).
    #[error("image cannot move further")]
    AtEdge,

    /// Uploading the object failed; nothing was stored.
    #[error("upload failed: {0}")]
    Upload(#[source] StorageError),

    /// The object could not be removed, so its row was kept.
    #[error("could not remove {path} from storage, the image was kept: {source}")]
    StorageRemove {
        path: String,
        #[source]
        source: StorageError,
    },

    /// A reorder step failed. `restored` says whether earlier steps were undone.
    #[error("reorder failed (restored: {restored}): {source}")]
    Reorder {
        restored: bool,
        #[source]
        source: RepositoryError,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Object name role for images stored in `bucket`.
const fn kind_for(bucket: Bucket) -> &'static str {
    match bucket {
        Bucket::ProductImages => "main",
        Bucket::ProductGallery => "gallery",
        Bucket::VariantImages => "variant",
        Bucket::CategoryImages => "cover",
        Bucket::UiAssets => "asset",
    }
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LENGTH)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// Runs image operations against storage and the image table.
pub struct ImageService<'a, S, I> {
    storage: &'a S,
    images: &'a I,
    policy: UploadPolicy,
}

impl<'a, S: ObjectStorage, I: ImageStore> ImageService<'a, S, I> {
    #[must_use]
    pub const fn new(storage: &'a S, images: &'a I, policy: UploadPolicy) -> Self {
        Self {
            storage,
            images,
            policy,
        }
    }

    /// Upload one file under `owner` (and `variant`) in `bucket`.
    ///
    /// # Errors
    ///
    /// `Rejected` if the policy refuses the file, in which case storage was
    /// not contacted. `Upload` if storage refused it.
    #[instrument(skip(self, file), fields(bucket = %bucket, name = %file.file_name, size = file.size()))]
    pub async fn upload(
        &self,
        bucket: Bucket,
        owner: &str,
        variant: Option<&str>,
        file: &UploadFile,
    ) -> Result<UploadedImage, ImageError> {
        let extension = self.policy.check(&file.content_type, file.size())?;

        let suffix = random_suffix();
        let path = object_path(&ObjectKey {
            owner,
            variant,
            kind: kind_for(bucket),
            timestamp_ms: Utc::now().timestamp_millis(),
            suffix: &suffix,
            extension,
        });

        self.storage
            .upload(bucket, &path, &file.content_type, file.bytes.clone())
            .await
            .map_err(ImageError::Upload)?;

        Ok(UploadedImage {
            url: self.storage.public_url(bucket, &path),
            path,
            name: file.file_name.clone(),
            size: file.size(),
            content_type: file.content_type.clone(),
        })
    }

    /// Remove an object that is no longer referenced. Failures are logged.
    pub async fn discard(&self, bucket: Bucket, path: &str) {
        if let Err(e) = self.storage.remove(bucket, path).await {
            tracing::warn!(bucket = %bucket, path, error = %e, "Orphaned storage object");
        }
    }

    /// Remove the object behind a public URL. URLs this storage did not
    /// produce are left alone.
    pub async fn discard_url(&self, bucket: Bucket, url: &str) {
        match self.path_of(bucket, url) {
            Some(path) => self.discard(bucket, &path).await,
            None => tracing::debug!(bucket = %bucket, url, "Not a storage URL, nothing to remove"),
        }
    }

    /// Object path of a public URL produced by this storage, if it is one.
    #[must_use]
    pub fn path_of(&self, bucket: Bucket, url: &str) -> Option<String> {
        let prefix = self.storage.public_url(bucket, "");
        url.strip_prefix(&prefix)
            .filter(|path| !path.is_empty())
            .map(str::to_string)
    }

    /// Upload a file and record it as the product's last image.
    ///
    /// # Errors
    ///
    /// See [`Self::upload`]. `Repository(NotFound)` if the product is gone;
    /// the uploaded object is removed again in that case.
    #[instrument(skip(self, file, alt_text), fields(product_id = %target.product_id))]
    pub async fn add_product_image(
        &self,
        target: ImageTarget,
        alt_text: Option<String>,
        file: &UploadFile,
    ) -> Result<ImageRecord, ImageError> {
        let owner = target.product_id.to_string();
        let variant = target.variant_id.map(|v| v.to_string());
        let uploaded = self
            .upload(target.bucket, &owner, variant.as_deref(), file)
            .await?;

        let row = NewImage {
            product_id: target.product_id,
            variant_id: target.variant_id,
            bucket: target.bucket,
            storage_path: uploaded.path,
            url: uploaded.url,
            alt_text,
        };

        match self.images.insert(&row).await {
            Ok(record) => Ok(record),
            Err(e) => {
                self.discard(target.bucket, &row.storage_path).await;
                Err(e.into())
            }
        }
    }

    /// Add several files, one after another, in the given order.
    ///
    /// Every file gets its own result; a failure does not stop the rest.
    pub async fn add_product_images(
        &self,
        target: ImageTarget,
        files: &[UploadFile],
    ) -> Vec<Result<ImageRecord, ImageError>> {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            results.push(self.add_product_image(target, None, file).await);
        }
        results
    }

    /// Upload several files under `owner` without recording image rows.
    ///
    /// Every file gets its own result; a failure does not stop the rest.
    pub async fn upload_all(
        &self,
        bucket: Bucket,
        owner: &str,
        files: &[UploadFile],
    ) -> Vec<Result<UploadedImage, ImageError>> {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            results.push(self.upload(bucket, owner, None, file).await);
        }
        results
    }

    /// Delete an image: its object first, then its row.
    ///
    /// An object that is already gone counts as removed.
    ///
    /// # Errors
    ///
    /// `StorageRemove` if the object could not be removed; the row is kept.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ImageId) -> Result<(), ImageError> {
        let image = self.images.get(id).await?.ok_or(ImageError::NotFound)?;
        self.delete_record(&image).await
    }

    async fn delete_record(&self, image: &ImageRecord) -> Result<(), ImageError> {
        let path = &image.image.storage_path;
        match self.storage.remove(image.bucket, path).await {
            Ok(()) => {}
            Err(StorageError::NotFound(_)) => {
                tracing::warn!(image_id = %image.id(), path, "Storage object already missing");
            }
            Err(source) => {
                return Err(ImageError::StorageRemove {
                    path: path.clone(),
                    source,
                });
            }
        }

        self.images.delete(image.id()).await?;
        Ok(())
    }

    /// Delete every image of a product ahead of deleting the product.
    ///
    /// # Errors
    ///
    /// Stops at the first image that cannot be removed. Images before it
    /// are gone, it and the rest are kept.
    #[instrument(skip(self))]
    pub async fn purge_product(&self, product_id: ProductId) -> Result<(), ImageError> {
        for image in self.images.list_for_product(product_id).await? {
            self.delete_record(&image).await?;
        }
        Ok(())
    }

    /// Delete the images of one variant ahead of deleting the variant.
    ///
    /// # Errors
    ///
    /// Same as [`Self::purge_product`].
    #[instrument(skip(self))]
    pub async fn purge_variant(&self, variant_id: VariantId) -> Result<(), ImageError> {
        for image in self.images.list_for_variant(variant_id).await? {
            self.delete_record(&image).await?;
        }
        Ok(())
    }

    /// Swap an image with its neighbour and return the product's images in
    /// their new order.
    ///
    /// # Errors
    ///
    /// `AtEdge` if there is no neighbour in that direction. `Reorder` if an
    /// update failed; applied updates are rolled back where possible.
    #[instrument(skip(self))]
    pub async fn move_image(
        &self,
        id: ImageId,
        direction: MoveDirection,
    ) -> Result<Vec<ImageRecord>, ImageError> {
        let image = self.images.get(id).await?.ok_or(ImageError::NotFound)?;
        let product_id = image.product_id();

        let current: Vec<(ImageId, i32)> = self
            .images
            .list_for_product(product_id)
            .await?
            .iter()
            .map(|i| (i.id(), i.sort_order()))
            .collect();
        let plan = ReorderPlan::new(&current, id, direction).ok_or(ImageError::AtEdge)?;

        self.apply(&plan).await?;
        Ok(self.images.list_for_product(product_id).await?)
    }

    async fn apply(&self, plan: &ReorderPlan) -> Result<(), ImageError> {
        let mut applied: Vec<SortUpdate> = Vec::with_capacity(plan.updates.len());

        for update in &plan.updates {
            if let Err(source) = self.images.set_sort_order(update.id, update.to).await {
                let restored = self.revert(&applied).await;
                return Err(ImageError::Reorder { restored, source });
            }
            applied.push(*update);
        }
        Ok(())
    }

    /// Undo applied updates, newest first. Returns whether all succeeded.
    async fn revert(&self, applied: &[SortUpdate]) -> bool {
        let mut restored = true;
        for update in applied.iter().rev().map(|u| u.inverse()) {
            if let Err(e) = self.images.set_sort_order(update.id, update.to).await {
                tracing::error!(image_id = %update.id, error = %e, "Could not restore image order");
                restored = false;
            }
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_suffix_shape() {
        let suffix = random_suffix();
        assert_eq!(suffix.len(), SUFFIX_LENGTH);
        assert!(suffix.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
        assert_ne!(random_suffix(), random_suffix());
    }

    #[test]
    fn test_kind_per_bucket() {
        assert_eq!(kind_for(Bucket::ProductImages), "main");
        assert_eq!(kind_for(Bucket::VariantImages), "variant");
        assert_eq!(kind_for(Bucket::CategoryImages), "cover");
    }
}
