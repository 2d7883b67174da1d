//! Checkout and order confirmation handlers.
//!
//! A checkout whose header was written but whose items were not is kept in
//! the session under `pending_checkout` until `/api/checkout/retry`
//! completes it or `DELETE /api/checkout/pending` cancels it. While it
//! exists, new checkouts are refused.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use mytechgear_core::OrderId;
use mytechgear_core::order::{CheckoutForm, Order, OrderRef};

use super::cart::{load_cart, save_cart};
use crate::db::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::session::keys;
use crate::services::checkout::{Abandoned, CheckoutError, CheckoutService, PendingCheckout};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub order_number: String,
}

impl From<OrderRef> for CheckoutResponse {
    fn from(order: OrderRef) -> Self {
        Self {
            order_id: order.id,
            order_number: order.order_number,
        }
    }
}

/// Keep the session's pending checkout in line with a failed attempt,
/// then hand the error on.
///
/// A retryable failure is recorded; a rejected one drops any pending state
/// so the customer is not locked out of checkout.
async fn record_failure(session: &Session, err: CheckoutError) -> AppError {
    let recorded = match &err {
        CheckoutError::ItemsFailed { pending, .. } => session
            .insert(keys::PENDING_CHECKOUT, pending.as_ref())
            .await,
        CheckoutError::ItemsRejected { .. } => session
            .remove::<PendingCheckout>(keys::PENDING_CHECKOUT)
            .await
            .map(|_| ()),
        _ => Ok(()),
    };
    if let Err(session_err) = recorded {
        tracing::error!(error = %session_err, "Could not update pending checkout");
    }
    err.into()
}

/// `POST /api/checkout`
#[instrument(skip(state, session, form), fields(user_id = %user.id))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(form): Json<CheckoutForm>,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    if let Some(pending) = session
        .get::<PendingCheckout>(keys::PENDING_CHECKOUT)
        .await?
        .filter(|p| p.user_id == user.id)
    {
        return Err(CheckoutError::AlreadyPending(pending.order).into());
    }

    let mut cart = load_cart(&session).await?;
    let store = OrderRepository::new(state.pool());
    let service = CheckoutService::new(&store, state.order_lists());

    let order = match service.place_order(user.id, &mut cart, form).await {
        Ok(order) => order,
        Err(err) => return Err(record_failure(&session, err).await),
    };

    save_cart(&session, &cart).await?;
    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_number", order.order_number.as_str())]),
    );

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// `POST /api/checkout/retry`
#[instrument(skip(state, session), fields(user_id = %user.id))]
pub async fn retry(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    let pending = session
        .get::<PendingCheckout>(keys::PENDING_CHECKOUT)
        .await?
        .filter(|p| p.user_id == user.id)
        .ok_or(CheckoutError::NothingPending)?;

    let mut cart = load_cart(&session).await?;
    let store = OrderRepository::new(state.pool());
    let service = CheckoutService::new(&store, state.order_lists());

    let order = match service.resume(&mut cart, pending).await {
        Ok(order) => order,
        Err(err) => return Err(record_failure(&session, err).await),
    };

    session
        .remove::<PendingCheckout>(keys::PENDING_CHECKOUT)
        .await?;
    save_cart(&session, &cart).await?;

    Ok((StatusCode::CREATED, Json(order.into())))
}

#[derive(Debug, Serialize)]
pub struct AbandonResponse {
    pub order_id: OrderId,
    pub order_number: String,
    /// `false` when the order turned out to be complete and stands.
    pub cancelled: bool,
}

/// `DELETE /api/checkout/pending`
///
/// Gives up on a checkout whose items could not be saved. Its header is
/// cancelled and a new checkout can start.
#[instrument(skip(state, session), fields(user_id = %user.id))]
pub async fn abandon(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Json<AbandonResponse>> {
    let pending = session
        .get::<PendingCheckout>(keys::PENDING_CHECKOUT)
        .await?
        .filter(|p| p.user_id == user.id)
        .ok_or(CheckoutError::NothingPending)?;

    let mut cart = load_cart(&session).await?;
    let store = OrderRepository::new(state.pool());
    let outcome = CheckoutService::new(&store, state.order_lists())
        .abandon(&mut cart, pending)
        .await?;

    session
        .remove::<PendingCheckout>(keys::PENDING_CHECKOUT)
        .await?;
    save_cart(&session, &cart).await?;

    let (order, cancelled) = match outcome {
        Abandoned::Cancelled(order) => (order, true),
        Abandoned::AlreadyPlaced(order) => (order, false),
    };
    Ok(Json(AbandonResponse {
        order_id: order.id,
        order_number: order.order_number,
        cancelled,
    }))
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub formatted_total: String,
}

/// `GET /api/orders/{order_id}`, readable only by the owner.
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn show_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let order = OrderRepository::new(state.pool())
        .get_for_user(order_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;

    Ok(Json(OrderView {
        formatted_total: state.config().currency.format(order.total_amount),
        order,
    }))
}
