//! Catalog reads: categories and active products with their variants and images.

use sqlx::PgPool;
use tracing::instrument;

use mytechgear_core::catalog::{Category, Product};
use mytechgear_core::rows::{CategoryRow, ImageRow, ProductRow, VariantRow, assemble_products};
use mytechgear_core::ProductId;

use super::RepositoryError;

const PRODUCT_COLUMNS: &str = "p.id, p.slug, p.name, p.description, p.short_description, \
     p.price, p.sale_price, p.stock_quantity, p.in_stock, p.category_id, \
     p.tags, p.features, p.specifications, p.is_active";

const VARIANT_COLUMNS: &str = "v.id, v.product_id, v.name, v.price, v.sale_price, \
     v.stock_quantity, v.in_stock, v.attributes, v.image_url, v.sort_order";

const IMAGE_COLUMNS: &str =
    "i.id, i.product_id, i.variant_id, i.url, i.storage_path, i.alt_text, i.sort_order";

/// Repository for catalog reads.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories, ordered for navigation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT id, slug, name, description, image_url
            FROM categories
            ORDER BY sort_order, name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    /// Every active product with variants and images attached.
    ///
    /// Products are ordered by `sort_order` then name, variants and images by
    /// their own `sort_order`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails, or
    /// `RepositoryError::DataCorruption` if a JSONB column is malformed.
    #[instrument(skip(self))]
    pub async fn list_active_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             WHERE p.is_active \
             ORDER BY p.sort_order, p.name"
        ))
        .fetch_all(self.pool)
        .await?;

        let variants = sqlx::query_as::<_, VariantRow>(&format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variants v \
             JOIN products p ON p.id = v.product_id \
             WHERE p.is_active \
             ORDER BY v.sort_order, v.name"
        ))
        .fetch_all(self.pool)
        .await?;

        let images = sqlx::query_as::<_, ImageRow>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM product_images i \
             JOIN products p ON p.id = i.product_id \
             WHERE p.is_active \
             ORDER BY i.sort_order, i.created_at"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(assemble_products(products, variants, images)?)
    }

    /// One active product with variants and images, read fresh.
    ///
    /// The cart snapshots price and stock from this rather than from the
    /// catalog cache, which may trail admin edits.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails, or
    /// `RepositoryError::DataCorruption` if a JSONB column is malformed.
    #[instrument(skip(self))]
    pub async fn active_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let Some(product) = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1 AND p.is_active"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let variants = sqlx::query_as::<_, VariantRow>(&format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variants v \
             WHERE v.product_id = $1 \
             ORDER BY v.sort_order, v.name"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        let images = sqlx::query_as::<_, ImageRow>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM product_images i \
             WHERE i.product_id = $1 \
             ORDER BY i.sort_order, i.created_at"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(assemble_products(vec![product], variants, images)?
            .into_iter()
            .next())
    }
}
