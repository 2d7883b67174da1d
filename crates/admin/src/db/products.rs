//! Product management.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use mytechgear_core::ProductId;
use mytechgear_core::catalog::Product;
use mytechgear_core::rows::{ImageRow, ProductRow, VariantRow, assemble_products};

use super::{RepositoryError, conflict_on_unique, expect_rows};
use crate::models::ProductInput;

/// One row of the product table, including inactive products.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductListItem {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: i32,
    pub in_stock: bool,
    pub is_active: bool,
    pub category_name: Option<String>,
    pub variant_count: i64,
    pub image_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for product management.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every product, optionally filtered by a case-insensitive name or slug match.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<ProductListItem>, RepositoryError> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")));

        let rows = sqlx::query_as::<_, ProductListItem>(
            r"
            SELECT p.id, p.slug, p.name, p.price, p.sale_price, p.stock_quantity, p.in_stock,
                   p.is_active, c.name AS category_name,
                   (SELECT COUNT(*) FROM product_variants v WHERE v.product_id = p.id) AS variant_count,
                   (SELECT i.url FROM product_images i WHERE i.product_id = p.id
                    ORDER BY i.sort_order, i.created_at LIMIT 1) AS image_url,
                   p.updated_at
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE $1::TEXT IS NULL OR p.name ILIKE $1 OR p.slug ILIKE $1
            ORDER BY p.sort_order, p.name
            ",
        )
        .bind(pattern)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// A product with all its variants and images, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails, or
    /// `RepositoryError::DataCorruption` if a JSONB column is malformed.
    #[instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let Some(product) = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, slug, name, description, short_description, price, sale_price,
                   stock_quantity, in_stock, category_id, tags, features, specifications, is_active
            FROM products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let variants = sqlx::query_as::<_, VariantRow>(
            r"
            SELECT id, product_id, name, price, sale_price, stock_quantity, in_stock,
                   attributes, image_url, sort_order
            FROM product_variants
            WHERE product_id = $1
            ORDER BY sort_order, name
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        let images = sqlx::query_as::<_, ImageRow>(
            r"
            SELECT id, product_id, variant_id, url, storage_path, alt_text, sort_order
            FROM product_images
            WHERE product_id = $1
            ORDER BY sort_order, created_at
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(assemble_products(vec![product], variants, images)?.pop())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create(&self, input: &ProductInput) -> Result<ProductId, RepositoryError> {
        let specifications = serde_json::to_value(&input.specifications)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        let id: ProductId = sqlx::query_scalar(
            r"
            INSERT INTO products (slug, name, description, short_description, price, sale_price,
                                  stock_quantity, in_stock, category_id, tags, features,
                                  specifications, is_active, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id
            ",
        )
        .bind(&input.slug)
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(input.short_description.as_deref())
        .bind(input.price)
        .bind(input.sale_price)
        .bind(input.stock_quantity)
        .bind(input.in_stock())
        .bind(input.category_id)
        .bind(&input.tags)
        .bind(&input.features)
        .bind(specifications)
        .bind(input.is_active)
        .bind(input.sort_order)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("a product with this slug already exists"))?;

        Ok(id)
    }

    /// Replace every editable field. `in_stock` is recomputed from the stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist, or
    /// `RepositoryError::Conflict` if the new slug is taken.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn update(&self, id: ProductId, input: &ProductInput) -> Result<(), RepositoryError> {
        let specifications = serde_json::to_value(&input.specifications)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        let result = sqlx::query(
            r"
            UPDATE products
            SET slug = $2, name = $3, description = $4, short_description = $5, price = $6,
                sale_price = $7, stock_quantity = $8, in_stock = $9, category_id = $10,
                tags = $11, features = $12, specifications = $13, is_active = $14,
                sort_order = $15, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&input.slug)
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(input.short_description.as_deref())
        .bind(input.price)
        .bind(input.sale_price)
        .bind(input.stock_quantity)
        .bind(input.in_stock())
        .bind(input.category_id)
        .bind(&input.tags)
        .bind(&input.features)
        .bind(specifications)
        .bind(input.is_active)
        .bind(input.sort_order)
        .execute(self.pool)
        .await
        .map_err(conflict_on_unique("a product with this slug already exists"))?;

        expect_rows(result.rows_affected())
    }

    /// Delete a product. Variants and image rows go with it.
    ///
    /// Storage objects are not touched here; remove them first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        expect_rows(result.rows_affected())
    }

    /// Whether a product exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(exists)
    }
}
