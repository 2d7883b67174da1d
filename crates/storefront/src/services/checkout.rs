//! Checkout: turning the session cart into an order.
//!
//! The header and the item rows are two separate writes. Checkout runs them
//! as a saga with a recorded intermediate state:
//!
//! 1. Freeze the cart into an [`OrderDraft`] (validation, totals) and check
//!    every line against the live catalog. Lines no longer sold stop the
//!    checkout before anything is written.
//! 2. Insert the order header. On failure nothing was written.
//! 3. Insert the item rows. A transient failure leaves the header without
//!    items and the caller gets [`CheckoutError::ItemsFailed`] carrying a
//!    [`PendingCheckout`] to keep in the session and resume with
//!    [`CheckoutService::resume`]. A failure that can never succeed (the
//!    rows break a constraint) cancels the header instead and returns
//!    [`CheckoutError::ItemsRejected`].
//! 4. Clear the cart and invalidate the user's cached order list.
//!
//! The cart is only cleared in step 4, so a failure at any step leaves it
//! exactly as it was. A pending checkout can also be given up with
//! [`CheckoutService::abandon`], which cancels its header.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use mytechgear_core::cart::Cart;
use mytechgear_core::order::{CheckoutForm, NewOrderItem, OrderDraft, OrderDraftError, OrderRef};
use mytechgear_core::{OrderId, UserId};

use super::cache::OrderListCache;
use crate::db::RepositoryError;

/// Backend writes checkout depends on.
pub trait OrderStore: Send + Sync {
    /// Insert the order header and return its generated identity.
    fn create_header(
        &self,
        draft: &OrderDraft,
    ) -> impl Future<Output = Result<OrderRef, RepositoryError>> + Send;

    /// Insert every item row of an order, all or nothing.
    fn create_items(
        &self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Whether item rows already exist for this order.
    fn items_recorded(
        &self,
        order_id: OrderId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Display names of the lines the catalog no longer sells: the product
    /// is gone or inactive, the variant is gone, or a product that now has
    /// variants was bought without one.
    fn unavailable_lines(
        &self,
        items: &[NewOrderItem],
    ) -> impl Future<Output = Result<Vec<String>, RepositoryError>> + Send;

    /// Cancel a header that never got its items.
    ///
    /// Returns `false` if the order has items or is no longer pending.
    fn cancel_header(
        &self,
        order_id: OrderId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

/// An order whose header exists but whose items still need writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCheckout {
    pub user_id: UserId,
    pub order: OrderRef,
    pub items: Vec<NewOrderItem>,
}

/// Checkout failures.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// The cart or form is not acceptable; nothing was written.
    #[error(transparent)]
    Invalid(#[from] OrderDraftError),

    /// Writing the order header failed; nothing was written.
    #[error("order could not be created: {0}")]
    Backend(#[source] RepositoryError),

    /// Some cart lines are no longer sold; nothing was written.
    #[error("no longer available: {}", .0.join(", "))]
    Unavailable(Vec<String>),

    /// The header was written but the items were not. Retryable.
    #[error("order {} was created but its items were not saved: {source}", .pending.order.order_number)]
    ItemsFailed {
        pending: Box<PendingCheckout>,
        #[source]
        source: RepositoryError,
    },

    /// The items can never be written. The header was cancelled unless
    /// `cancelled` is false, in which case staff must clean it up.
    #[error("order {} could not be completed: {source}", .order.order_number)]
    ItemsRejected {
        order: OrderRef,
        cancelled: bool,
        #[source]
        source: RepositoryError,
    },

    /// A previous checkout is still waiting for its items.
    #[error("order {} is waiting for its items to be saved", .0.order_number)]
    AlreadyPending(OrderRef),

    /// Retry requested with nothing to retry.
    #[error("no pending checkout")]
    NothingPending,
}

/// How an abandoned checkout ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Abandoned {
    /// The header was cancelled (or had already been closed by staff).
    Cancelled(OrderRef),
    /// The items had been written after all; the order stands and the cart
    /// was cleared.
    AlreadyPlaced(OrderRef),
}

/// Runs the checkout saga against an [`OrderStore`].
pub struct CheckoutService<'a, S> {
    store: &'a S,
    order_lists: &'a OrderListCache,
}

impl<'a, S: OrderStore> CheckoutService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, order_lists: &'a OrderListCache) -> Self {
        Self { store, order_lists }
    }

    /// Place an order for everything in `cart`.
    ///
    /// On success `cart` is emptied. On any error it is left untouched.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`]. `ItemsFailed` carries the state needed by
    /// [`Self::resume`].
    #[instrument(skip(self, cart, form), fields(lines = cart.items().len()))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        cart: &mut Cart,
        form: CheckoutForm,
    ) -> Result<OrderRef, CheckoutError> {
        let draft = OrderDraft::from_cart(user_id, cart, form)?;

        let unavailable = self
            .store
            .unavailable_lines(&draft.items)
            .await
            .map_err(CheckoutError::Backend)?;
        if !unavailable.is_empty() {
            return Err(CheckoutError::Unavailable(unavailable));
        }

        let order = self
            .store
            .create_header(&draft)
            .await
            .map_err(CheckoutError::Backend)?;
        self.order_lists.invalidate(user_id).await;
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %draft.total_amount,
            "Order header created"
        );

        let pending = PendingCheckout {
            user_id,
            order,
            items: draft.items,
        };
        self.write_items(cart, pending).await
    }

    /// Retry the item step of a checkout that failed after its header.
    ///
    /// If the items turn out to be recorded already, the checkout completes
    /// without writing them again.
    ///
    /// # Errors
    ///
    /// Returns `ItemsFailed` again (with the same pending state) if the
    /// items still cannot be written, or `ItemsRejected` if they never can.
    #[instrument(skip(self, cart, pending), fields(order_id = %pending.order.id))]
    pub async fn resume(
        &self,
        cart: &mut Cart,
        pending: PendingCheckout,
    ) -> Result<OrderRef, CheckoutError> {
        match self.store.items_recorded(pending.order.id).await {
            Ok(true) => {
                tracing::info!("Order items already recorded");
                Ok(self.complete(cart, pending).await)
            }
            Ok(false) => self.write_items(cart, pending).await,
            Err(source) => Err(CheckoutError::ItemsFailed {
                pending: Box::new(pending),
                source,
            }),
        }
    }

    /// Give up on a pending checkout.
    ///
    /// The header is cancelled so it no longer blocks the customer. If the
    /// items turn out to be recorded, the order stands and completes.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the header could not be read or updated; the
    /// checkout is still pending in that case.
    #[instrument(skip(self, cart, pending), fields(order_id = %pending.order.id))]
    pub async fn abandon(
        &self,
        cart: &mut Cart,
        pending: PendingCheckout,
    ) -> Result<Abandoned, CheckoutError> {
        let cancelled = self
            .store
            .cancel_header(pending.order.id)
            .await
            .map_err(CheckoutError::Backend)?;
        if cancelled {
            self.order_lists.invalidate(pending.user_id).await;
            tracing::info!(order_number = %pending.order.order_number, "Pending checkout cancelled");
            return Ok(Abandoned::Cancelled(pending.order));
        }

        if self
            .store
            .items_recorded(pending.order.id)
            .await
            .map_err(CheckoutError::Backend)?
        {
            return Ok(Abandoned::AlreadyPlaced(self.complete(cart, pending).await));
        }
        tracing::warn!(
            order_number = %pending.order.order_number,
            "Pending order was already closed"
        );
        Ok(Abandoned::Cancelled(pending.order))
    }

    async fn write_items(
        &self,
        cart: &mut Cart,
        pending: PendingCheckout,
    ) -> Result<OrderRef, CheckoutError> {
        let Err(source) = self
            .store
            .create_items(pending.order.id, &pending.items)
            .await
        else {
            return Ok(self.complete(cart, pending).await);
        };

        if source.is_transient() {
            tracing::error!(
                order_id = %pending.order.id,
                order_number = %pending.order.order_number,
                error = %source,
                "Order items failed, order awaiting retry"
            );
            return Err(CheckoutError::ItemsFailed {
                pending: Box::new(pending),
                source,
            });
        }

        let cancelled = match self.store.cancel_header(pending.order.id).await {
            Ok(cancelled) => cancelled,
            Err(e) => {
                tracing::error!(order_id = %pending.order.id, error = %e, "Could not cancel order header");
                false
            }
        };
        self.order_lists.invalidate(pending.user_id).await;
        tracing::error!(
            order_id = %pending.order.id,
            order_number = %pending.order.order_number,
            cancelled,
            error = %source,
            "Order items rejected"
        );
        Err(CheckoutError::ItemsRejected {
            order: pending.order,
            cancelled,
            source,
        })
    }

    async fn complete(&self, cart: &mut Cart, pending: PendingCheckout) -> OrderRef {
        cart.clear();
        self.order_lists.invalidate(pending.user_id).await;
        tracing::info!(order_number = %pending.order.order_number, "Checkout complete");
        pending.order
    }
}
