//! Database operations for the back office.
//!
//! The admin binary shares the storefront's database. It owns every write
//! to the catalog, order status, invoices, roles and settings.
//!
//! ## Tables written here
//!
//! - `products`, `product_variants`, `categories` - catalog management
//! - `product_images` - image rows (objects live in object storage)
//! - `orders`, `order_items` - staff edits and deletion
//! - `invoices` - invoices issued against orders
//! - `user_roles` - granting and revoking the admin role
//! - `store_settings` - store-wide key/value settings
//!
//! # Migrations
//!
//! Migrations live in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p mytechgear-cli -- migrate
//! ```

pub mod categories;
pub mod dashboard;
pub mod images;
pub mod invoices;
pub mod orders;
pub mod products;
pub mod settings;
pub mod users;
pub mod variants;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use mytechgear_core::rows::RowError;

pub use categories::CategoryRepository;
pub use dashboard::DashboardRepository;
pub use images::PgImageStore;
pub use invoices::InvoiceRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::{PgRoleSource, UserRepository};
pub use variants::VariantRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
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

    /// Constraint violation (e.g., duplicate slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
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

/// `NotFound` when a write touched no row.
pub(crate) const fn expect_rows(rows_affected: u64) -> Result<(), RepositoryError> {
    if rows_affected == 0 {
        Err(RepositoryError::NotFound)
    } else {
        Ok(())
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
