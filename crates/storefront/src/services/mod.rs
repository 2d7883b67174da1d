//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration, password login and password change
//! - `cache` - Catalog and order-list read caches
//! - `checkout` - Cart to order, with a resumable item step
//! - `invalidation` - `LISTEN` task that drops stale cache entries

pub mod auth;
pub mod cache;
pub mod checkout;
pub mod invalidation;

pub use auth::{AuthError, AuthService};
pub use cache::{CatalogCache, OrderListCache};
pub use checkout::{Abandoned, CheckoutError, CheckoutService, OrderStore, PendingCheckout};
