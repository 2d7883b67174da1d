//! Invoices issued against orders.

use sqlx::PgPool;
use tracing::instrument;

use mytechgear_core::invoice::{Invoice, InvoiceDraft};
use mytechgear_core::rows::InvoiceRow;
use mytechgear_core::{InvoiceId, InvoiceStatus};

use super::{RepositoryError, conflict_on_unique, expect_rows};

/// Repository for invoices.
pub struct InvoiceRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InvoiceRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an invoice numbered by `generate_invoice_number()`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    #[instrument(skip(self, draft), fields(order_id = %draft.order_id))]
    pub async fn create(&self, draft: &InvoiceDraft) -> Result<Invoice, RepositoryError> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            r"
            WITH inserted AS (
                INSERT INTO invoices (invoice_number, order_id, status, total_amount, issue_date, due_date)
                SELECT generate_invoice_number(), o.id, $2, $3, $4, $5
                FROM orders o
                WHERE o.id = $1
                RETURNING id, invoice_number, order_id, status, total_amount, issue_date,
                          due_date, created_at
            )
            SELECT i.id, i.invoice_number, i.order_id, o.order_number, i.status,
                   i.total_amount, i.issue_date, i.due_date, i.created_at
            FROM inserted i
            JOIN orders o ON o.id = i.order_id
            ",
        )
        .bind(draft.order_id)
        .bind(draft.status)
        .bind(draft.total_amount)
        .bind(draft.issue_date)
        .bind(draft.due_date)
        .fetch_optional(self.pool)
        .await
        .map_err(conflict_on_unique("invoice number collision, try again"))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Every invoice, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Invoice>, RepositoryError> {
        let rows = sqlx::query_as::<_, InvoiceRow>(
            r"
            SELECT i.id, i.invoice_number, i.order_id, o.order_number, i.status,
                   i.total_amount, i.issue_date, i.due_date, i.created_at
            FROM invoices i
            LEFT JOIN orders o ON o.id = i.order_id
            ORDER BY i.created_at DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Invoice::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the invoice does not exist.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: InvoiceId,
        status: InvoiceStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE invoices SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(self.pool)
        .await?;
        expect_rows(result.rows_affected())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the invoice does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: InvoiceId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        expect_rows(result.rows_affected())
    }
}
