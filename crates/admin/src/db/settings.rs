//! Store settings database operations.
//!
//! Settings are key/value JSON rows in `store_settings`.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;
use sqlx::PgPool;

use super::RepositoryError;

/// Get every setting row.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn get_all(pool: &PgPool) -> Result<BTreeMap<String, JsonValue>, RepositoryError> {
    let rows: Vec<(String, JsonValue)> = sqlx::query_as("SELECT key, value FROM store_settings")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().collect())
}

/// Get a single setting value.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn get_setting(pool: &PgPool, key: &str) -> Result<Option<JsonValue>, RepositoryError> {
    let value = sqlx::query_scalar("SELECT value FROM store_settings WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

/// Upsert several settings in one transaction.
///
/// # Errors
///
/// Returns an error if any write fails; none are applied in that case.
pub async fn set_many(pool: &PgPool, rows: &[(&str, JsonValue)]) -> Result<(), RepositoryError> {
    let mut tx = pool.begin().await?;
    for (key, value) in rows {
        sqlx::query(
            r"
            INSERT INTO store_settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}
