//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                    - Liveness
//! GET    /health/ready              - Readiness (database)
//!
//! # Catalog
//! GET    /api/categories            - Category list
//! GET    /api/products              - Flattened catalog (?category=&tag=&available=)
//! GET    /api/products/{slug}       - Product detail with one option per variant
//!
//! # Cart and wishlist (session)
//! GET    /api/cart                  - Cart contents and totals
//! DELETE /api/cart                  - Empty the cart
//! POST   /api/cart/items            - Add a line (merges duplicates)
//! PATCH  /api/cart/items/{key}      - Set quantity (0 removes)
//! DELETE /api/cart/items/{key}      - Remove a line
//! GET    /api/wishlist              - Wishlisted products
//! POST   /api/wishlist/{product_id} - Toggle a product
//!
//! # Auth
//! POST   /api/auth/register         - Create account and sign in
//! POST   /api/auth/login            - Sign in
//! POST   /api/auth/logout           - Sign out
//! GET    /api/auth/me               - Current user, if any
//! POST   /api/auth/password         - Change password (requires auth)
//!
//! # Account (requires auth)
//! GET    /api/account/profile       - Profile
//! PUT    /api/account/profile       - Update profile, then default address
//! GET    /api/account/orders        - Order history
//!
//! # Checkout (requires auth)
//! POST   /api/checkout              - Place an order from the cart
//! POST   /api/checkout/retry        - Finish an order whose items failed
//! DELETE /api/checkout/pending      - Cancel an order whose items failed
//! GET    /api/orders/{order_id}     - Order confirmation
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth API routes router.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/password", post(auth::change_password))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .merge(limited)
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(catalog::categories))
        .route("/products", get(catalog::index))
        .route("/products/{slug}", get(catalog::show))
}

/// Create the cart and wishlist routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show).delete(cart::clear))
        .route("/cart/items", post(cart::add))
        .route(
            "/cart/items/{key}",
            patch(cart::update).delete(cart::remove),
        )
        .route("/wishlist", get(cart::wishlist))
        .route("/wishlist/{product_id}", post(cart::toggle_wishlist))
        .layer(api_rate_limiter())
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(account::profile).put(account::update_profile),
        )
        .route("/orders", get(account::orders))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout::place_order))
        .route("/checkout/retry", post(checkout::retry))
        .route("/checkout/pending", delete(checkout::abandon))
        .route("/orders/{order_id}", get(checkout::show_order))
        .layer(api_rate_limiter())
}

/// Create all API routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(catalog_routes())
        .merge(cart_routes())
        .merge(checkout_routes())
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
}
