//! Order persistence for checkout and order history.

use sqlx::PgPool;
use tracing::instrument;

use mytechgear_core::order::{NewOrderItem, Order, OrderDraft, OrderRef, OrderSummary};
use mytechgear_core::rows::{OrderItemRow, OrderRow};
use mytechgear_core::{OrderId, UserId};

use super::{RepositoryError, conflict_on_constraint};
use crate::services::checkout::OrderStore;

const ORDER_COLUMNS: &str = "id, order_number, user_id, status, payment_status, payment_method, \
     shipping_address, billing_address, notes, total_amount, created_at, updated_at";

/// Repository for the customer's side of orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert the order header. The number comes from `generate_order_number()`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails, or
    /// `RepositoryError::DataCorruption` if an address cannot be encoded.
    #[instrument(skip(self, draft), fields(user_id = %draft.user_id, total = %draft.total_amount))]
    pub async fn insert_header(&self, draft: &OrderDraft) -> Result<OrderRef, RepositoryError> {
        let shipping = serde_json::to_value(&draft.shipping_address)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let billing = serde_json::to_value(&draft.billing_address)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        let (id, order_number): (OrderId, String) = sqlx::query_as(
            r"
            INSERT INTO orders (order_number, user_id, status, payment_status, payment_method,
                                shipping_address, billing_address, notes, total_amount)
            VALUES (generate_order_number(), $1, 'pending', 'pending', $2, $3, $4, $5, $6)
            RETURNING id, order_number
            ",
        )
        .bind(draft.user_id)
        .bind(draft.payment_method)
        .bind(shipping)
        .bind(billing)
        .bind(draft.notes.as_deref())
        .bind(draft.total_amount)
        .fetch_one(self.pool)
        .await?;

        Ok(OrderRef { id, order_number })
    }

    /// Insert all item rows of an order in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a row breaks a constraint (a
    /// product deleted since it was added to the cart, for example), or
    /// `RepositoryError::Database` for other failures. No item rows are kept
    /// in either case.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn insert_items(
        &self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for item in items {
            let quantity = i32::try_from(item.quantity)
                .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
            sqlx::query(
                r"
                INSERT INTO order_items (order_id, product_id, product_variant_id, product_name,
                                         variant_name, unit_price, quantity, total_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(order_id)
            .bind(item.product_id)
            .bind(item.variant_id)
            .bind(&item.product_name)
            .bind(item.variant_name.as_deref())
            .bind(item.unit_price)
            .bind(quantity)
            .bind(item.total_price)
            .execute(&mut *tx)
            .await
            .map_err(conflict_on_constraint("order item rejected"))?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Whether the order already has item rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_items(&self, order_id: OrderId) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM order_items WHERE order_id = $1)")
                .bind(order_id)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Names of the items whose product or variant is no longer sold.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn unsellable_items(
        &self,
        items: &[NewOrderItem],
    ) -> Result<Vec<String>, RepositoryError> {
        let mut unsellable = Vec::new();
        for item in items {
            let sellable: bool = sqlx::query_scalar(
                r"
                SELECT EXISTS (
                    SELECT 1 FROM products p
                    WHERE p.id = $1 AND p.is_active
                      AND CASE
                          WHEN $2::uuid IS NULL THEN NOT EXISTS (
                              SELECT 1 FROM product_variants v WHERE v.product_id = p.id)
                          ELSE EXISTS (
                              SELECT 1 FROM product_variants v
                              WHERE v.id = $2 AND v.product_id = p.id)
                      END
                )
                ",
            )
            .bind(item.product_id)
            .bind(item.variant_id)
            .fetch_one(self.pool)
            .await?;

            if !sellable {
                unsellable.push(match &item.variant_name {
                    Some(variant) => format!("{} – {variant}", item.product_name),
                    None => item.product_name.clone(),
                });
            }
        }
        Ok(unsellable)
    }

    /// Cancel a pending order that has no items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    #[instrument(skip(self))]
    pub async fn cancel_if_empty(&self, order_id: OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET status = 'cancelled', updated_at = NOW()
            WHERE id = $1
              AND status = 'pending'
              AND NOT EXISTS (SELECT 1 FROM order_items WHERE order_id = $1)
            ",
        )
        .bind(order_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// An order with its items, only if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails, or
    /// `RepositoryError::DataCorruption` if the stored address is malformed.
    #[instrument(skip(self))]
    pub async fn get_for_user(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2"
        ))
        .bind(order_id)
        .bind(user_id)
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
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(row.into_order(items)?))
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderSummary>(
            r"
            SELECT o.id, o.order_number, o.user_id, o.status, o.payment_status, o.total_amount,
                   COALESCE(SUM(i.quantity), 0)::BIGINT AS item_count, o.created_at
            FROM orders o
            LEFT JOIN order_items i ON i.order_id = o.id
            WHERE o.user_id = $1
            GROUP BY o.id
            ORDER BY o.created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

impl OrderStore for OrderRepository<'_> {
    async fn create_header(&self, draft: &OrderDraft) -> Result<OrderRef, RepositoryError> {
        self.insert_header(draft).await
    }

    async fn create_items(
        &self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<(), RepositoryError> {
        self.insert_items(order_id, items).await
    }

    async fn items_recorded(&self, order_id: OrderId) -> Result<bool, RepositoryError> {
        self.has_items(order_id).await
    }

    async fn unavailable_lines(
        &self,
        items: &[NewOrderItem],
    ) -> Result<Vec<String>, RepositoryError> {
        self.unsellable_items(items).await
    }

    async fn cancel_header(&self, order_id: OrderId) -> Result<bool, RepositoryError> {
        self.cancel_if_empty(order_id).await
    }
}
