//! HTTP route handlers for the back office.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                         - Liveness
//! GET    /health/ready                   - Readiness (database)
//!
//! # Auth (outside the gate)
//! GET    /auth/login                     - Login page
//! POST   /auth/login                     - Sign in (form)
//! POST   /auth/logout                    - Sign out
//!
//! # Back office (admin role required)
//! GET    /admin                          - Dashboard
//! GET    /admin/products                 - Product table (?q=)
//! POST   /admin/products                 - Create product
//! GET    /admin/products/{id}            - Product with variants and images
//! PUT    /admin/products/{id}            - Update product
//! DELETE /admin/products/{id}            - Delete product and its images
//! POST   /admin/products/{id}/variants   - Add variant
//! PUT    /admin/variants/{id}            - Update variant
//! DELETE /admin/variants/{id}            - Delete variant
//! GET    /admin/products/{id}/images     - Images in display order
//! POST   /admin/products/{id}/images     - Upload one or more images (multipart)
//! DELETE /admin/images/{id}              - Delete image (object, then row)
//! POST   /admin/images/{id}/move-up      - Swap with previous image
//! POST   /admin/images/{id}/move-down    - Swap with next image
//! POST   /admin/assets                   - Upload site artwork (multipart)
//! GET    /admin/categories               - Category list
//! POST   /admin/categories               - Create category
//! PUT    /admin/categories/{id}          - Update category
//! DELETE /admin/categories/{id}          - Delete category
//! POST   /admin/categories/{id}/image    - Replace cover image (multipart)
//! GET    /admin/orders                   - Orders (?status=)
//! GET    /admin/orders/{id}              - Order with items
//! PATCH  /admin/orders/{id}              - Status, payment status, notes
//! DELETE /admin/orders/{id}              - Delete order and items
//! GET    /admin/invoices                 - Invoices
//! POST   /admin/invoices                 - Issue invoice for an order
//! PATCH  /admin/invoices/{id}            - Invoice status
//! DELETE /admin/invoices/{id}            - Delete invoice
//! GET    /admin/users                    - Users with roles
//! PUT    /admin/users/{id}/role          - Grant or revoke admin
//! GET    /admin/settings                 - Store settings
//! PUT    /admin/settings                 - Update store settings
//! ```

pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod images;
pub mod invoices;
pub mod orders;
pub mod products;
pub mod settings;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
};

use crate::db::PgRoleSource;
use crate::middleware::require_admin;
use crate::state::AppState;

/// Multipart overhead allowed on top of the file bytes.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Body limit for upload routes.
///
/// Large enough for a full batch at the configured per-file maximum, so an
/// oversized file is rejected by the upload policy with a clear error rather
/// than by the body limit.
fn upload_body_limit(max_image_bytes: u64) -> usize {
    usize::try_from(max_image_bytes)
        .unwrap_or(usize::MAX)
        .saturating_mul(images::MAX_FILES_PER_UPLOAD)
        .saturating_add(MULTIPART_OVERHEAD)
}

/// Create the login/logout routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the catalog management routes router.
fn catalog_routes(upload_limit: usize) -> Router<AppState> {
    let uploads = Router::new()
        .route(
            "/admin/products/{id}/images",
            get(images::list).post(images::upload),
        )
        .route(
            "/admin/categories/{id}/image",
            post(categories::upload_image),
        )
        .route("/admin/assets", post(images::upload_assets))
        .layer(DefaultBodyLimit::max(upload_limit));

    Router::new()
        .route(
            "/admin/products",
            get(products::index).post(products::create),
        )
        .route(
            "/admin/products/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route(
            "/admin/products/{id}/variants",
            post(products::create_variant),
        )
        .route(
            "/admin/variants/{id}",
            put(products::update_variant).delete(products::delete_variant),
        )
        .route("/admin/images/{id}", axum::routing::delete(images::delete))
        .route("/admin/images/{id}/move-up", post(images::move_up))
        .route("/admin/images/{id}/move-down", post(images::move_down))
        .route(
            "/admin/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/admin/categories/{id}",
            put(categories::update).delete(categories::delete),
        )
        .merge(uploads)
}

/// Create the order and invoice routes router.
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/orders", get(orders::list))
        .route(
            "/admin/orders/{id}",
            get(orders::show)
                .patch(orders::update)
                .delete(orders::delete),
        )
        .route(
            "/admin/invoices",
            get(invoices::list).post(invoices::create),
        )
        .route(
            "/admin/invoices/{id}",
            patch(invoices::update).delete(invoices::delete),
        )
}

/// Create the user and settings routes router.
fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(users::list))
        .route("/admin/users/{id}/role", put(users::set_role))
        .route(
            "/admin/settings",
            get(settings::show).put(settings::update),
        )
}

/// Create the gated `/admin` routes router.
///
/// Every matched route passes through [`require_admin`], which re-reads the
/// signed-in user's role on each request.
pub fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard::index))
        .merge(catalog_routes(upload_body_limit(
            state.config().max_image_bytes,
        )))
        .merge(order_routes())
        .merge(store_routes())
        .route_layer(axum::middleware::from_fn_with_state(
            state.roles().clone(),
            require_admin::<PgRoleSource>,
        ))
}

/// Create all routes for the back office.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .merge(admin_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_limit_fits_a_full_batch() {
        let max = 5 * 1024 * 1024;
        let limit = upload_body_limit(max);
        assert!(limit > usize::try_from(max).unwrap_or(0) * images::MAX_FILES_PER_UPLOAD);
    }
}
