//! Order administration.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use mytechgear_core::order::{Order, OrderUpdate};
use mytechgear_core::rows::{OrderItemRow, OrderRow};
use mytechgear_core::{Cents, OrderId, OrderStatus, PaymentMethod, PaymentStatus, UserId};

use super::{RepositoryError, expect_rows};

/// One row of the order table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminOrderSummary {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub customer_email: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub total_amount: Cents,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Repository for staff-side order management.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Orders newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<AdminOrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminOrderSummary>(
            r"
            SELECT o.id, o.order_number, o.user_id, u.email AS customer_email, o.status,
                   o.payment_status, o.payment_method, o.total_amount,
                   (SELECT COUNT(*) FROM order_items i WHERE i.order_id = o.id) AS item_count,
                   o.created_at
            FROM orders o
            JOIN users u ON u.id = o.user_id
            WHERE $1::order_status IS NULL OR o.status = $1
            ORDER BY o.created_at DESC
            ",
        )
        .bind(status)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// An order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored address is malformed.
    #[instrument(skip(self))]
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let Some(order) = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, order_number, user_id, status, payment_status, payment_method,
                   shipping_address, billing_address, notes, total_amount, created_at, updated_at
            FROM orders
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, order_id, product_id, product_variant_id, product_name, variant_name,
                   unit_price, quantity, total_price
            FROM order_items
            WHERE order_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(order.into_order(items)?))
    }

    /// Apply a staff edit. Absent fields keep their value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    #[instrument(skip(self, update))]
    pub async fn update(&self, id: OrderId, update: &OrderUpdate) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET status = COALESCE($2, status),
                payment_status = COALESCE($3, payment_status),
                notes = COALESCE($4, notes),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(update.status)
        .bind(update.payment_status)
        .bind(update.notes.as_deref())
        .execute(self.pool)
        .await?;
        expect_rows(result.rows_affected())
    }

    /// Delete an order, items first, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist; nothing
    /// is deleted in that case.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        expect_rows(result.rows_affected())?;

        tx.commit().await?;
        Ok(())
    }
}
