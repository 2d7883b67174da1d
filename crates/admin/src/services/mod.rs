//! Business logic services for the back office.
//!
//! # Services
//!
//! - `auth` - Staff password login
//! - `gate` - Role lookups behind the `/admin` gate
//! - `images` - Image upload, deletion and reordering across storage and database

pub mod auth;
pub mod gate;
pub mod images;

pub use auth::{AuthError, AuthService};
pub use gate::{RoleSource, check_access};
pub use images::{ImageError, ImageService, ImageStore, ImageTarget, UploadFile};
