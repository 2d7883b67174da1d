//! Domain models for the back office.
//!
//! Request bodies are validated here before any repository call.

pub mod catalog;
pub mod image;
pub mod session;
pub mod settings;

pub use catalog::{CategoryInput, ProductInput, VariantInput};
pub use image::{ImageRecord, NewImage};
pub use session::{CurrentStaff, keys as session_keys};
pub use settings::{StoreSettings, StoreSettingsUpdate};
