//! Product image rows.
//!
//! Only the URL and object path live here; the bytes are in object storage.
//! The `bucket` column is plain text and decoded on read.

use sqlx::PgPool;
use tracing::instrument;

use mytechgear_core::media::Bucket;
use mytechgear_core::rows::ImageRow;
use mytechgear_core::{ImageId, ProductId, VariantId};

use super::{RepositoryError, expect_rows};
use crate::models::{ImageRecord, NewImage};
use crate::services::images::ImageStore;

#[derive(sqlx::FromRow)]
struct ImageRecordRow {
    id: ImageId,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    bucket: String,
    url: String,
    storage_path: String,
    alt_text: Option<String>,
    sort_order: i32,
}

impl TryFrom<ImageRecordRow> for ImageRecord {
    type Error = RepositoryError;

    fn try_from(row: ImageRecordRow) -> Result<Self, Self::Error> {
        let bucket: Bucket = row
            .bucket
            .parse()
            .map_err(|e: String| RepositoryError::DataCorruption(format!("product_images.bucket: {e}")))?;
        let image = ImageRow {
            id: row.id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            url: row.url,
            storage_path: row.storage_path,
            alt_text: row.alt_text,
            sort_order: row.sort_order,
        };
        Ok(Self {
            image: image.into(),
            bucket,
        })
    }
}

const COLUMNS: &str = "id, product_id, variant_id, bucket, url, storage_path, alt_text, sort_order";

/// [`ImageStore`] over the `product_images` table.
#[derive(Clone, Copy)]
pub struct PgImageStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgImageStore<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl ImageStore for PgImageStore<'_> {
    #[instrument(skip(self))]
    async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ImageRecord>, RepositoryError> {
        sqlx::query_as::<_, ImageRecordRow>(&format!(
            "SELECT {COLUMNS} FROM product_images WHERE product_id = $1 ORDER BY sort_order, created_at"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(ImageRecord::try_from)
        .collect()
    }

    #[instrument(skip(self))]
    async fn list_for_variant(
        &self,
        variant_id: VariantId,
    ) -> Result<Vec<ImageRecord>, RepositoryError> {
        sqlx::query_as::<_, ImageRecordRow>(&format!(
            "SELECT {COLUMNS} FROM product_images WHERE variant_id = $1 ORDER BY sort_order, created_at"
        ))
        .bind(variant_id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(ImageRecord::try_from)
        .collect()
    }

    #[instrument(skip(self))]
    async fn get(&self, id: ImageId) -> Result<Option<ImageRecord>, RepositoryError> {
        sqlx::query_as::<_, ImageRecordRow>(&format!(
            "SELECT {COLUMNS} FROM product_images WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .map(ImageRecord::try_from)
        .transpose()
    }

    #[instrument(skip(self, image), fields(product_id = %image.product_id, path = %image.storage_path))]
    async fn insert(&self, image: &NewImage) -> Result<ImageRecord, RepositoryError> {
        let row = sqlx::query_as::<_, ImageRecordRow>(&format!(
            r"
            INSERT INTO product_images (product_id, variant_id, bucket, storage_path, url, alt_text, sort_order)
            SELECT $1, $2, $3, $4, $5, $6,
                   COALESCE((SELECT MAX(sort_order) + 1 FROM product_images WHERE product_id = $1), 0)
            WHERE EXISTS (SELECT 1 FROM products WHERE id = $1)
            RETURNING {COLUMNS}
            "
        ))
        .bind(image.product_id)
        .bind(image.variant_id)
        .bind(image.bucket.as_str())
        .bind(&image.storage_path)
        .bind(&image.url)
        .bind(image.alt_text.as_deref())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: ImageId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM product_images WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        expect_rows(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn set_sort_order(&self, id: ImageId, sort_order: i32) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE product_images SET sort_order = $2 WHERE id = $1")
            .bind(id)
            .bind(sort_order)
            .execute(self.pool)
            .await?;
        expect_rows(result.rows_affected())
    }
}
