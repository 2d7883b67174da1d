//! Checkout against an in-memory order store.
//!
//! Covers the saga: header, then items, then clearing the cart, the retry
//! path when the item write fails, and the ways a checkout is given up.

use std::time::Duration;

use rust_decimal::Decimal;

use mytechgear_core::UserId;
use mytechgear_core::cart::Cart;
use mytechgear_core::order::OrderDraftError;
use mytechgear_integration_tests::MemoryOrderStore;
use mytechgear_integration_tests::fixtures::{checkout_form, falcon, product};
use mytechgear_storefront::services::{
    Abandoned, CheckoutError, CheckoutService, OrderListCache,
};

fn order_lists() -> OrderListCache {
    OrderListCache::new(Duration::from_secs(60))
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn test_falcon_checkout_totals_in_cents() {
    let store = MemoryOrderStore::new();
    let lists = order_lists();
    let service = CheckoutService::new(&store, &lists);

    let mut cart = Cart::new();
    cart.add(&falcon(), None, 1).unwrap();

    let order = service
        .place_order(UserId::random(), &mut cart, checkout_form())
        .await
        .unwrap();

    let headers = store.headers().await;
    assert_eq!(headers.len(), 1);
    let (header, draft) = &headers[0];
    assert_eq!(header, &order);
    assert_eq!(draft.total_amount.get(), 24900);

    let items = store.items_of(order.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].total_price.get(), 24900);
    assert_eq!(items[0].quantity, 1);
    assert_eq!(items[0].product_name, "Falcon");

    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_total_is_sum_of_lines() {
    let store = MemoryOrderStore::new();
    let lists = order_lists();
    let service = CheckoutService::new(&store, &lists);

    let mut cart = Cart::new();
    cart.add(&falcon(), None, 2).unwrap();
    cart.add(&product("Etui", Decimal::new(1990, 2)), None, 3)
        .unwrap();

    let order = service
        .place_order(UserId::random(), &mut cart, checkout_form())
        .await
        .unwrap();

    let items = store.items_of(order.id).await.unwrap();
    let line_sum: i64 = items.iter().map(|i| i.total_price.get()).sum();
    let (_, draft) = &store.headers().await[0];
    assert_eq!(line_sum, 2 * 24900 + 3 * 1990);
    assert_eq!(draft.total_amount.get(), line_sum);
    // Billing defaults to the shipping address
    assert_eq!(draft.billing_address, draft.shipping_address);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_empty_cart_writes_nothing() {
    let store = MemoryOrderStore::new();
    let lists = order_lists();
    let service = CheckoutService::new(&store, &lists);

    let result = service
        .place_order(UserId::random(), &mut Cart::new(), checkout_form())
        .await;

    assert!(matches!(
        result,
        Err(CheckoutError::Invalid(OrderDraftError::EmptyCart))
    ));
    assert!(store.headers().await.is_empty());
}

#[tokio::test]
async fn test_invalid_address_keeps_cart() {
    let store = MemoryOrderStore::new();
    let lists = order_lists();
    let service = CheckoutService::new(&store, &lists);

    let mut cart = Cart::new();
    cart.add(&falcon(), None, 1).unwrap();
    let before = cart.clone();

    let mut form = checkout_form();
    form.shipping_address.city = String::new();

    let result = service
        .place_order(UserId::random(), &mut cart, form)
        .await;

    assert!(matches!(
        result,
        Err(CheckoutError::Invalid(OrderDraftError::Shipping(_)))
    ));
    assert_eq!(cart, before);
    assert!(store.headers().await.is_empty());
}

#[tokio::test]
async fn test_failed_items_keep_cart_and_resume() {
    let store = MemoryOrderStore::new();
    let lists = order_lists();
    let service = CheckoutService::new(&store, &lists);
    let user = UserId::random();

    let mut cart = Cart::new();
    cart.add(&falcon(), None, 1).unwrap();
    let before = cart.clone();

    store.fail_items(true);
    let Err(CheckoutError::ItemsFailed { pending, .. }) =
        service.place_order(user, &mut cart, checkout_form()).await
    else {
        panic!("expected the item step to fail");
    };

    // Header exists, items do not, cart untouched
    assert_eq!(store.headers().await.len(), 1);
    assert!(store.items_of(pending.order.id).await.is_none());
    assert_eq!(cart, before);

    // A second failure hands back the same pending order
    let Err(CheckoutError::ItemsFailed { pending: again, .. }) =
        service.resume(&mut cart, *pending.clone()).await
    else {
        panic!("expected the retry to fail");
    };
    assert_eq!(again.order, pending.order);
    assert_eq!(cart, before);

    store.fail_items(false);
    let order = service.resume(&mut cart, *pending).await.unwrap();

    assert_eq!(store.headers().await.len(), 1, "retry must not add a header");
    assert_eq!(store.items_of(order.id).await.unwrap().len(), 1);
    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_resume_skips_items_already_recorded() {
    let store = MemoryOrderStore::new();
    let lists = order_lists();
    let service = CheckoutService::new(&store, &lists);

    let mut cart = Cart::new();
    cart.add(&falcon(), None, 1).unwrap();
    let order = service
        .place_order(UserId::random(), &mut cart, checkout_form())
        .await
        .unwrap();

    // Pretend the session still held the pending state
    let (header, draft) = store.headers().await.remove(0);
    let pending = mytechgear_storefront::services::PendingCheckout {
        user_id: draft.user_id,
        order: header,
        items: draft.items,
    };
    store.fail_items(true);

    let mut stale_cart = Cart::new();
    stale_cart.add(&falcon(), None, 1).unwrap();
    let resumed = service.resume(&mut stale_cart, pending).await.unwrap();

    assert_eq!(resumed, order);
    assert!(stale_cart.is_empty());
}

#[tokio::test]
async fn test_failed_header_writes_nothing() {
    let store = MemoryOrderStore::new();
    let lists = order_lists();
    let service = CheckoutService::new(&store, &lists);

    let mut cart = Cart::new();
    cart.add(&falcon(), None, 2).unwrap();
    let before = cart.clone();

    store.fail_headers(true);
    let result = service
        .place_order(UserId::random(), &mut cart, checkout_form())
        .await;

    assert!(matches!(result, Err(CheckoutError::Backend(_))));
    assert_eq!(cart, before);
    assert!(store.headers().await.is_empty());
}

#[tokio::test]
async fn test_discontinued_product_writes_nothing() {
    let store = MemoryOrderStore::new();
    let lists = order_lists();
    let service = CheckoutService::new(&store, &lists);

    let gone = product("Kestrel", Decimal::new(18900, 2));
    let mut cart = Cart::new();
    cart.add(&falcon(), None, 1).unwrap();
    cart.add(&gone, None, 1).unwrap();
    let before = cart.clone();
    store.discontinue(gone.id).await;

    let Err(CheckoutError::Unavailable(names)) = service
        .place_order(UserId::random(), &mut cart, checkout_form())
        .await
    else {
        panic!("expected the stale line to be refused");
    };

    assert_eq!(names, vec!["Kestrel".to_string()]);
    assert_eq!(cart, before);
    assert!(store.headers().await.is_empty());
}

#[tokio::test]
async fn test_rejected_items_cancel_the_header() {
    let store = MemoryOrderStore::new();
    let lists = order_lists();
    let service = CheckoutService::new(&store, &lists);
    let user = UserId::random();

    let mut cart = Cart::new();
    cart.add(&falcon(), None, 1).unwrap();
    let before = cart.clone();

    store.reject_items(true);
    let Err(CheckoutError::ItemsRejected {
        order, cancelled, ..
    }) = service.place_order(user, &mut cart, checkout_form()).await
    else {
        panic!("expected a permanent item failure");
    };

    assert!(cancelled);
    assert!(store.is_cancelled(order.id).await);
    assert!(store.items_of(order.id).await.is_none());
    assert_eq!(cart, before);

    // Nothing is left pending, so a fresh checkout goes through
    store.reject_items(false);
    let placed = service
        .place_order(user, &mut cart, checkout_form())
        .await
        .unwrap();
    assert_ne!(placed, order);
    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_rejected_resume_cancels_the_header() {
    let store = MemoryOrderStore::new();
    let lists = order_lists();
    let service = CheckoutService::new(&store, &lists);

    let mut cart = Cart::new();
    cart.add(&falcon(), None, 1).unwrap();

    store.fail_items(true);
    let Err(CheckoutError::ItemsFailed { pending, .. }) = service
        .place_order(UserId::random(), &mut cart, checkout_form())
        .await
    else {
        panic!("expected the item step to fail");
    };

    // The product disappeared between the two attempts
    store.fail_items(false);
    store.reject_items(true);
    let result = service.resume(&mut cart, *pending.clone()).await;

    assert!(matches!(
        result,
        Err(CheckoutError::ItemsRejected { cancelled: true, .. })
    ));
    assert!(store.is_cancelled(pending.order.id).await);
    assert!(!cart.is_empty());
}

#[tokio::test]
async fn test_abandon_cancels_pending_checkout() {
    let store = MemoryOrderStore::new();
    let lists = order_lists();
    let service = CheckoutService::new(&store, &lists);
    let user = UserId::random();

    let mut cart = Cart::new();
    cart.add(&falcon(), None, 1).unwrap();
    let before = cart.clone();

    store.fail_items(true);
    let Err(CheckoutError::ItemsFailed { pending, .. }) =
        service.place_order(user, &mut cart, checkout_form()).await
    else {
        panic!("expected the item step to fail");
    };

    let outcome = service.abandon(&mut cart, *pending.clone()).await.unwrap();

    assert_eq!(outcome, Abandoned::Cancelled(pending.order.clone()));
    assert!(store.is_cancelled(pending.order.id).await);
    assert_eq!(cart, before);

    store.fail_items(false);
    let placed = service
        .place_order(user, &mut cart, checkout_form())
        .await
        .unwrap();
    assert_eq!(store.headers().await.len(), 2);
    assert_eq!(store.items_of(placed.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_abandon_after_items_landed_keeps_the_order() {
    let store = MemoryOrderStore::new();
    let lists = order_lists();
    let service = CheckoutService::new(&store, &lists);

    let mut cart = Cart::new();
    cart.add(&falcon(), None, 1).unwrap();
    let order = service
        .place_order(UserId::random(), &mut cart, checkout_form())
        .await
        .unwrap();

    let (header, draft) = store.headers().await.remove(0);
    let pending = mytechgear_storefront::services::PendingCheckout {
        user_id: draft.user_id,
        order: header,
        items: draft.items,
    };
    let mut stale_cart = Cart::new();
    stale_cart.add(&falcon(), None, 1).unwrap();

    let outcome = service.abandon(&mut stale_cart, pending).await.unwrap();

    assert_eq!(outcome, Abandoned::AlreadyPlaced(order.clone()));
    assert!(!store.is_cancelled(order.id).await);
    assert!(stale_cart.is_empty());
}
