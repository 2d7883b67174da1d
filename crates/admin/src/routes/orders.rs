//! Order management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use mytechgear_core::order::{Order, OrderUpdate};
use mytechgear_core::{OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::db::orders::AdminOrderSummary;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

/// `GET /admin/orders?status=`
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<AdminOrderSummary>>> {
    Ok(Json(OrderRepository::new(state.pool()).list(filter.status).await?))
}

/// `GET /admin/orders/{id}`
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<OrderId>) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

/// `PATCH /admin/orders/{id}`
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(update): Json<OrderUpdate>,
) -> Result<StatusCode> {
    if update.status.is_none() && update.payment_status.is_none() && update.notes.is_none() {
        return Err(AppError::Validation("nothing to update".to_string()));
    }
    OrderRepository::new(state.pool()).update(id, &update).await?;
    tracing::info!(
        order_id = %id,
        status = ?update.status,
        payment_status = ?update.payment_status,
        "Order updated"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /admin/orders/{id}`
#[instrument(skip(state))]
pub async fn delete(State(state): State<AppState>, Path(id): Path<OrderId>) -> Result<StatusCode> {
    OrderRepository::new(state.pool()).delete(id).await?;
    tracing::info!(order_id = %id, "Order deleted");
    Ok(StatusCode::NO_CONTENT)
}
