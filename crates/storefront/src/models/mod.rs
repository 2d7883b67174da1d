//! Domain models owned by the storefront.
//!
//! Catalog, cart and order types live in `mytechgear-core`; this module only
//! holds the account-side types and what the session stores.

pub mod session;
pub mod user;

pub use session::CurrentUser;
pub use user::{Profile, ProfileUpdate, User};
