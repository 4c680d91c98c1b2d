//! Storefront cart reconciliation.
//!
//! Keeps the shopper's cart consistent between a remote cart API and a
//! device-local store, and keeps working offline when the API is down.
//!
//! # Modules
//!
//! - [`api`] - remote cart API client and its [`api::CartBackend`] seam
//! - [`cart`] - [`cart::CartController`], the reconciliation logic
//! - [`store`] - durable key-value mirror of client state
//! - [`session`] - signed-in user summary
//! - [`wishlist`] - device-local wishlist
//! - [`config`] - environment-driven configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod session;
pub mod store;
pub mod wishlist;
