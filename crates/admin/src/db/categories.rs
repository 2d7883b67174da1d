//! Category management.

use sqlx::PgPool;
use tracing::instrument;

use mytechgear_core::CategoryId;
use mytechgear_core::catalog::Category;
use mytechgear_core::rows::CategoryRow;

use super::{RepositoryError, conflict_on_unique, expect_rows};
use crate::models::CategoryInput;

const SLUG_TAKEN: &str = "a category with this slug already exists";

/// Repository for categories.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, slug, name, description, image_url FROM categories ORDER BY sort_order, name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create(&self, input: &CategoryInput) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO categories (slug, name, description, sort_order)
            VALUES ($1, $2, $3, $4)
            RETURNING id, slug, name, description, image_url
            ",
        )
        .bind(&input.slug)
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(input.sort_order)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique(SLUG_TAKEN))?;
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist, or
    /// `RepositoryError::Conflict` if the new slug is taken.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn update(&self, id: CategoryId, input: &CategoryInput) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE categories
            SET slug = $2, name = $3, description = $4, sort_order = $5, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&input.slug)
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(input.sort_order)
        .execute(self.pool)
        .await
        .map_err(conflict_on_unique(SLUG_TAKEN))?;
        expect_rows(result.rows_affected())
    }

    /// Delete a category and return its cover image URL, if it had one.
    /// Its products are kept, uncategorized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: CategoryId) -> Result<Option<String>, RepositoryError> {
        let cover: Option<Option<String>> =
            sqlx::query_scalar("DELETE FROM categories WHERE id = $1 RETURNING image_url")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        cover.ok_or(RepositoryError::NotFound)
    }

    /// Point a category at a newly uploaded image, returning the previous URL.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    #[instrument(skip(self))]
    pub async fn set_image_url(
        &self,
        id: CategoryId,
        url: &str,
    ) -> Result<Option<String>, RepositoryError> {
        let previous: Option<Option<String>> = sqlx::query_scalar(
            r"
            UPDATE categories c
            SET image_url = $2, updated_at = NOW()
            FROM (SELECT image_url FROM categories WHERE id = $1 FOR UPDATE) old
            WHERE c.id = $1
            RETURNING old.image_url
            ",
        )
        .bind(id)
        .bind(url)
        .fetch_optional(self.pool)
        .await?;

        previous.ok_or(RepositoryError::NotFound)
    }
}
