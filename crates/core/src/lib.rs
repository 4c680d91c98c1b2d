//! Storefront Cart Core - Shared types library.
//!
//! This crate provides common types used across all storefront cart components:
//! - `storefront` - Cart reconciliation, remote cart client, local store
//! - `cli` - Command-line shopper front end
//!
//! # Architecture
//!
//! The core crate contains only types and pure cart arithmetic - no I/O, no
//! HTTP clients, no persistence. This keeps it lightweight and allows it to
//! be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, quantities, products and the cart model

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
