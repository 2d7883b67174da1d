//! Session-related types for back-office authentication.
//!
//! Only the identity is stored. The role is looked up again on every gated
//! request, so a demotion takes effect immediately.

use serde::{Deserialize, Serialize};

use mytechgear_core::{Email, UserId};

/// Session-stored identity of the signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentStaff {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_STAFF: &str = "current_staff";
}
