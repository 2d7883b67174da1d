//! Product image upload, deletion and ordering.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::instrument;

use mytechgear_core::media::{Bucket, MoveDirection, UploadedImage};
use mytechgear_core::{ImageId, ProductId, VariantId};

use crate::db::PgImageStore;
use crate::error::{AppError, Result};
use crate::models::ImageRecord;
use crate::services::{ImageService, ImageStore, ImageTarget, UploadFile};
use crate::state::AppState;

/// Most files accepted in one upload request.
pub const MAX_FILES_PER_UPLOAD: usize = 10;

/// Buckets that hold product images.
const PRODUCT_BUCKETS: [Bucket; 3] = [
    Bucket::ProductImages,
    Bucket::ProductGallery,
    Bucket::VariantImages,
];

#[derive(Debug, Serialize)]
pub struct FailedUpload {
    pub name: String,
    pub error: String,
}

/// Per-file outcome of a multi-file upload.
#[derive(Debug, Serialize)]
pub struct BatchUpload<T> {
    pub uploaded: Vec<T>,
    pub failed: Vec<FailedUpload>,
}

impl<T> BatchUpload<T> {
    /// Pair each file with its result, in upload order.
    pub fn collect<E: std::fmt::Display>(
        files: &[UploadFile],
        results: impl IntoIterator<Item = std::result::Result<T, E>>,
    ) -> Self {
        let mut batch = Self {
            uploaded: Vec::new(),
            failed: Vec::new(),
        };
        for (file, result) in files.iter().zip(results) {
            match result {
                Ok(item) => batch.uploaded.push(item),
                Err(e) => {
                    tracing::warn!(name = %file.file_name, error = %e, "Upload failed");
                    batch.failed.push(FailedUpload {
                        name: file.file_name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        batch
    }

    /// `201` when every file made it, `207` otherwise.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        if self.failed.is_empty() {
            StatusCode::CREATED
        } else {
            StatusCode::MULTI_STATUS
        }
    }
}

/// Parsed multipart upload form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<UploadFile>,
    pub bucket: Option<Bucket>,
    pub variant_id: Option<VariantId>,
    pub alt_text: Option<String>,
}

fn bad_multipart(e: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(format!("invalid upload: {e}"))
}

/// Read every part of an upload form.
///
/// Files arrive under `file`; `bucket`, `variant_id` and `alt_text` are
/// optional text fields.
///
/// # Errors
///
/// `BadRequest` for a malformed body, unknown bucket or variant ID, or too
/// many files.
pub async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                if form.files.len() == MAX_FILES_PER_UPLOAD {
                    return Err(AppError::BadRequest(format!(
                        "at most {MAX_FILES_PER_UPLOAD} files per upload"
                    )));
                }
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                form.files.push(UploadFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            "bucket" => {
                let value = field.text().await.map_err(bad_multipart)?;
                form.bucket = Some(value.trim().parse().map_err(AppError::BadRequest)?);
            }
            "variant_id" => {
                let value = field.text().await.map_err(bad_multipart)?;
                let value = value.trim();
                if !value.is_empty() {
                    form.variant_id = Some(value.parse().map_err(bad_multipart)?);
                }
            }
            "alt_text" => {
                let value = field.text().await.map_err(bad_multipart)?;
                let value = value.trim();
                if !value.is_empty() {
                    form.alt_text = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    if form.files.is_empty() {
        return Err(AppError::BadRequest("no file in upload".to_string()));
    }
    Ok(form)
}

/// `GET /admin/products/{id}/images`
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Vec<ImageRecord>>> {
    let images = PgImageStore::new(state.pool())
        .list_for_product(product_id)
        .await?;
    Ok(Json(images))
}

/// `POST /admin/products/{id}/images` (multipart)
///
/// A single file answers with the new image or its error. Several files are
/// uploaded one after another and answer with a per-file report.
#[instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Response> {
    let form = read_upload_form(multipart).await?;

    let bucket = form.bucket.unwrap_or(if form.variant_id.is_some() {
        Bucket::VariantImages
    } else {
        Bucket::ProductImages
    });
    if !PRODUCT_BUCKETS.contains(&bucket) {
        return Err(AppError::BadRequest(format!(
            "{bucket} does not hold product images"
        )));
    }
    let target = ImageTarget {
        product_id,
        variant_id: form.variant_id,
        bucket,
    };

    let images = PgImageStore::new(state.pool());
    let service = ImageService::new(state.storage(), &images, state.upload_policy());

    if let [file] = form.files.as_slice() {
        let record = service
            .add_product_image(target, form.alt_text, file)
            .await?;
        return Ok((StatusCode::CREATED, Json(record)).into_response());
    }

    let results = service.add_product_images(target, &form.files).await;
    let batch = BatchUpload::<ImageRecord>::collect(&form.files, results);
    Ok((batch.status(), Json(batch)).into_response())
}

/// Object folder for site-wide assets.
const ASSET_OWNER: &str = "site";

/// `POST /admin/assets` (multipart)
///
/// Stores banners and other site artwork in `ui-assets`. No image row is
/// written; the caller keeps the returned URLs. Answers with a per-file
/// report, `207` if any file failed.
#[instrument(skip(state, multipart))]
pub async fn upload_assets(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<BatchUpload<UploadedImage>>)> {
    let form = read_upload_form(multipart).await?;

    let images = PgImageStore::new(state.pool());
    let service = ImageService::new(state.storage(), &images, state.upload_policy());

    let results = service
        .upload_all(Bucket::UiAssets, ASSET_OWNER, &form.files)
        .await;
    let batch = BatchUpload::collect(&form.files, results);
    Ok((batch.status(), Json(batch)))
}

/// `DELETE /admin/images/{id}`
#[instrument(skip(state))]
pub async fn delete(State(state): State<AppState>, Path(id): Path<ImageId>) -> Result<StatusCode> {
    let images = PgImageStore::new(state.pool());
    ImageService::new(state.storage(), &images, state.upload_policy())
        .delete(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn move_image(
    state: &AppState,
    id: ImageId,
    direction: MoveDirection,
) -> Result<Json<Vec<ImageRecord>>> {
    let images = PgImageStore::new(state.pool());
    let ordered = ImageService::new(state.storage(), &images, state.upload_policy())
        .move_image(id, direction)
        .await?;
    Ok(Json(ordered))
}

/// `POST /admin/images/{id}/move-up`
#[instrument(skip(state))]
pub async fn move_up(
    State(state): State<AppState>,
    Path(id): Path<ImageId>,
) -> Result<Json<Vec<ImageRecord>>> {
    move_image(&state, id, MoveDirection::Up).await
}

/// `POST /admin/images/{id}/move-down`
#[instrument(skip(state))]
pub async fn move_down(
    State(state): State<AppState>,
    Path(id): Path<ImageId>,
) -> Result<Json<Vec<ImageRecord>>> {
    move_image(&state, id, MoveDirection::Down).await
}

#[cfg(test)]
mod tests {
    use axum::body::Bytes;

    use super::*;

    fn upload_file(name: &str) -> UploadFile {
        UploadFile {
            file_name: name.to_string(),
            content_type: "image/png".to_string(),
            bytes: Bytes::from_static(b"png"),
        }
    }

    #[test]
    fn test_batch_names_each_failed_file() {
        let files = [upload_file("a.png"), upload_file("b.png"), upload_file("c.png")];
        let batch = BatchUpload::collect(&files, [Ok(1), Err("refused"), Ok(3)]);

        assert_eq!(batch.uploaded, vec![1, 3]);
        assert_eq!(batch.failed.len(), 1);
        assert_eq!(batch.failed[0].name, "b.png");
        assert_eq!(batch.failed[0].error, "refused");
        assert_eq!(batch.status(), StatusCode::MULTI_STATUS);
    }

    #[test]
    fn test_clean_batch_is_created() {
        let files = [upload_file("a.png")];
        let batch = BatchUpload::<i32>::collect(&files, [Ok::<_, String>(1)]);
        assert_eq!(batch.status(), StatusCode::CREATED);
        assert!(batch.failed.is_empty());
    }
}
