//! MyTechGear Core - Shared domain library.
//!
//! This crate provides the types and pure logic used across all MyTechGear components:
//! - `storefront` - Customer-facing catalog, cart and checkout
//! - `admin` - Back office (products, orders, invoices, users, settings)
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything that touches the network lives in the
//! binaries and reaches this crate through plain values.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, addresses and statuses
//! - [`catalog`] - Products, variants, variant expansion and price resolution
//! - [`cart`] - Session cart with price snapshots
//! - [`order`] - Turning a cart into an order draft with frozen line items
//! - [`invoice`] - Invoice drafting from an order
//! - [`media`] - Image upload policy, storage paths and reordering
//! - [`access`] - Role gate state machine for back-office routes
//! - `rows` - Database row shapes and their conversions (`postgres` feature)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod cart;
pub mod catalog;
pub mod invoice;
pub mod media;
pub mod order;
#[cfg(feature = "postgres")]
pub mod rows;
pub mod types;

pub use types::*;
