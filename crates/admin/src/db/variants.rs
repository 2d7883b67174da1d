//! Variant management.

use sqlx::PgPool;
use tracing::instrument;

use mytechgear_core::{ProductId, VariantId};

use super::{RepositoryError, expect_rows};
use crate::models::VariantInput;

fn attributes_json(input: &VariantInput) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(&input.attributes).map_err(|e| RepositoryError::DataCorruption(e.to_string()))
}

/// Repository for product variants.
pub struct VariantRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VariantRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add a variant to a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(
        &self,
        product_id: ProductId,
        input: &VariantInput,
    ) -> Result<VariantId, RepositoryError> {
        let id: Option<VariantId> = sqlx::query_scalar(
            r"
            INSERT INTO product_variants (product_id, name, price, sale_price, stock_quantity,
                                          in_stock, attributes, image_url, sort_order)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9
            WHERE EXISTS (SELECT 1 FROM products WHERE id = $1)
            RETURNING id
            ",
        )
        .bind(product_id)
        .bind(input.name.trim())
        .bind(input.price)
        .bind(input.sale_price)
        .bind(input.stock_quantity)
        .bind(input.in_stock())
        .bind(attributes_json(input)?)
        .bind(input.image_url.as_deref())
        .bind(input.sort_order)
        .fetch_optional(self.pool)
        .await?;

        id.ok_or(RepositoryError::NotFound)
    }

    /// Replace a variant's fields. `in_stock` follows the stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not exist.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn update(&self, id: VariantId, input: &VariantInput) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE product_variants
            SET name = $2, price = $3, sale_price = $4, stock_quantity = $5, in_stock = $6,
                attributes = $7, image_url = $8, sort_order = $9, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(input.price)
        .bind(input.sale_price)
        .bind(input.stock_quantity)
        .bind(input.in_stock())
        .bind(attributes_json(input)?)
        .bind(input.image_url.as_deref())
        .bind(input.sort_order)
        .execute(self.pool)
        .await?;
        expect_rows(result.rows_affected())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: VariantId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM product_variants WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        expect_rows(result.rows_affected())
    }
}
