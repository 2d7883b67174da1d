//! Database operations for the storefront.
//!
//! ## Tables read or written here
//!
//! - `categories`, `products`, `product_variants`, `product_images` - catalog (read only)
//! - `users`, `user_passwords`, `user_roles` - site authentication
//! - `profiles` - customer name, phone and default address
//! - `orders`, `order_items` - checkout writes, order history reads
//! - `tower_sessions.session` - session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p mytechgear-cli -- migrate
//! ```

pub mod catalog;
pub mod orders;
pub mod profiles;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::error::ErrorKind;
use sqlx::postgres::PgPoolOptions;

use mytechgear_core::rows::RowError;

pub use catalog::CatalogRepository;
pub use orders::OrderRepository;
pub use profiles::ProfileRepository;
pub use users::UserRepository;

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Whether the same write may succeed if tried again.
    ///
    /// Only raw database failures (connection, timeout, serialization)
    /// qualify. Constraint violations are mapped to `Conflict` first.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

impl From<RowError> for RepositoryError {
    fn from(err: RowError) -> Self {
        Self::DataCorruption(err.to_string())
    }
}

/// Map a unique-constraint violation to `Conflict`, everything else to `Database`.
pub(crate) fn conflict_on_unique(message: &str) -> impl FnOnce(sqlx::Error) -> RepositoryError {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(message.to_owned());
        }
        RepositoryError::Database(e)
    }
}

/// Map any constraint violation (unique, foreign key, check, not null) to
/// `Conflict`, everything else to `Database`.
pub(crate) fn conflict_on_constraint(message: &str) -> impl FnOnce(sqlx::Error) -> RepositoryError {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && matches!(
                db_err.kind(),
                ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
                    | ErrorKind::CheckViolation
                    | ErrorKind::NotNullViolation
            )
        {
            return RepositoryError::Conflict(format!(
                "{message}: {}",
                db_err.constraint().unwrap_or_else(|| db_err.message())
            ));
        }
        RepositoryError::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_raw_database_errors_are_transient() {
        assert!(RepositoryError::Database(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!RepositoryError::Conflict("order_items_product_id_fkey".into()).is_transient());
        assert!(!RepositoryError::DataCorruption("bad quantity".into()).is_transient());
        assert!(!RepositoryError::NotFound.is_transient());
    }
}
