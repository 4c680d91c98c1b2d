//! Core types for the storefront cart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod price;
pub mod product;
pub mod quantity;

pub use cart::{Cart, CartItem};
pub use id::*;
pub use price::{CurrencyCode, Price, PriceError};
pub use product::{Product, ProductVariant};
pub use quantity::{Quantity, QuantityError};
