//! Dashboard figures.

use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use mytechgear_core::{Cents, OrderStatus, ProductId};

use super::RepositoryError;

/// A product or variant at or below the low-stock threshold.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LowStockItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub stock_quantity: i32,
}

/// Headline numbers for the back-office home page.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    /// Every status appears, including those with no orders.
    pub orders_by_status: Vec<(OrderStatus, i64)>,
    pub paid_revenue: Cents,
    pub product_count: i64,
    pub low_stock: Vec<LowStockItem>,
}

impl DashboardSummary {
    #[must_use]
    pub fn total_orders(&self) -> i64 {
        self.orders_by_status.iter().map(|(_, n)| n).sum()
    }
}

/// Read-only aggregate queries.
pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn summary(&self, low_stock_threshold: i32) -> Result<DashboardSummary, RepositoryError> {
        let counts: Vec<(OrderStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
                .fetch_all(self.pool)
                .await?;
        let orders_by_status = OrderStatus::ALL
            .into_iter()
            .map(|status| {
                let n = counts
                    .iter()
                    .find(|(s, _)| *s == status)
                    .map_or(0, |(_, n)| *n);
                (status, n)
            })
            .collect();

        let paid_revenue: Cents = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_amount), 0)::BIGINT FROM orders WHERE payment_status = 'paid'",
        )
        .fetch_one(self.pool)
        .await?;

        let product_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(self.pool)
            .await?;

        let low_stock = sqlx::query_as::<_, LowStockItem>(
            r"
            SELECT p.id AS product_id, p.name AS product_name, NULL::TEXT AS variant_name,
                   p.stock_quantity
            FROM products p
            WHERE p.is_active
              AND p.stock_quantity <= $1
              AND NOT EXISTS (SELECT 1 FROM product_variants v WHERE v.product_id = p.id)
            UNION ALL
            SELECT p.id, p.name, v.name, v.stock_quantity
            FROM product_variants v
            JOIN products p ON p.id = v.product_id
            WHERE p.is_active AND v.stock_quantity <= $1
            ORDER BY stock_quantity, product_name
            LIMIT 50
            ",
        )
        .bind(low_stock_threshold)
        .fetch_all(self.pool)
        .await?;

        Ok(DashboardSummary {
            orders_by_status,
            paid_revenue,
            product_count,
            low_stock,
        })
    }
}
