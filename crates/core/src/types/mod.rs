//! Core types for MyTechGear.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use address::{Address, AddressError};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Cents, Currency, MoneyError};
pub use status::*;
