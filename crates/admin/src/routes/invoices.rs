//! Invoices.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use mytechgear_core::invoice::{Invoice, InvoiceDraft};
use mytechgear_core::{InvoiceId, InvoiceStatus, OrderId};

use crate::db::{InvoiceRepository, OrderRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateInvoice {
    pub order_id: OrderId,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInvoice {
    pub status: InvoiceStatus,
}

/// `GET /admin/invoices`
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Invoice>>> {
    Ok(Json(InvoiceRepository::new(state.pool()).list().await?))
}

/// `POST /admin/invoices`
///
/// The total is copied from the order; the due date is today plus the
/// configured payment term.
#[instrument(skip(state))]
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateInvoice>,
) -> Result<(StatusCode, Json<Invoice>)> {
    let order = OrderRepository::new(state.pool())
        .get(request.order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {}", request.order_id)))?;

    let today = Utc::now().date_naive();
    let draft = InvoiceDraft::for_order(&order, today, state.config().invoice_due_days)
        .ok_or_else(|| AppError::Validation("due date is out of range".to_string()))?;

    let invoice = InvoiceRepository::new(state.pool()).create(&draft).await?;
    tracing::info!(
        invoice_number = %invoice.invoice_number,
        order_number = %order.order_number,
        "Invoice created"
    );
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// `PATCH /admin/invoices/{id}`
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<InvoiceId>,
    Json(request): Json<UpdateInvoice>,
) -> Result<StatusCode> {
    InvoiceRepository::new(state.pool())
        .update_status(id, request.status)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /admin/invoices/{id}`
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<InvoiceId>,
) -> Result<StatusCode> {
    InvoiceRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
