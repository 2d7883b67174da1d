//! Category management.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use mytechgear_core::media::{Bucket, UploadedImage};
use mytechgear_core::CategoryId;
use mytechgear_core::catalog::Category;

use super::images::read_upload_form;
use crate::db::{CategoryRepository, PgImageStore};
use crate::error::{AppError, Result};
use crate::models::CategoryInput;
use crate::services::ImageService;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CategoryImage {
    pub category_id: CategoryId,
    #[serde(flatten)]
    pub image: UploadedImage,
}

/// `GET /admin/categories`
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(CategoryRepository::new(state.pool()).list().await?))
}

/// `POST /admin/categories`
#[instrument(skip(state, input))]
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    input.validate().map_err(AppError::Validation)?;
    let category = CategoryRepository::new(state.pool()).create(&input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// `PUT /admin/categories/{id}`
#[instrument(skip(state, input))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(input): Json<CategoryInput>,
) -> Result<StatusCode> {
    input.validate().map_err(AppError::Validation)?;
    CategoryRepository::new(state.pool()).update(id, &input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /admin/categories/{id}`
///
/// The cover image object goes once the row is gone.
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    let cover = CategoryRepository::new(state.pool()).delete(id).await?;
    if let Some(url) = cover {
        let images = PgImageStore::new(state.pool());
        ImageService::new(state.storage(), &images, state.upload_policy())
            .discard_url(Bucket::CategoryImages, &url)
            .await;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /admin/categories/{id}/image` (multipart, one file)
///
/// Replaces the category's cover image. The previous object is removed
/// once the category points at the new one.
#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CategoryImage>)> {
    let form = read_upload_form(multipart).await?;
    let [file] = form.files.as_slice() else {
        return Err(AppError::BadRequest("send exactly one file".to_string()));
    };

    let images = PgImageStore::new(state.pool());
    let service = ImageService::new(state.storage(), &images, state.upload_policy());
    let uploaded = service
        .upload(Bucket::CategoryImages, &id.to_string(), None, file)
        .await?;

    let previous = match CategoryRepository::new(state.pool())
        .set_image_url(id, &uploaded.url)
        .await
    {
        Ok(previous) => previous,
        Err(e) => {
            service.discard(Bucket::CategoryImages, &uploaded.path).await;
            return Err(e.into());
        }
    };

    if let Some(url) = previous {
        service.discard_url(Bucket::CategoryImages, &url).await;
    }

    Ok((
        StatusCode::CREATED,
        Json(CategoryImage {
            category_id: id,
            image: uploaded,
        }),
    ))
}
