//! Remote cart API client.
//!
//! # Architecture
//!
//! - [`CartBackend`] is the seam the reconciliation controller talks to
//! - [`HttpCartClient`] implements it over JSON/HTTP with `reqwest`
//! - Every response is an [`Envelope`]; `success: false` is an error even
//!   when the HTTP status is 200
//! - Product lookups are cached in memory via `moka`; cart calls never are
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_cart::api::{CartBackend, HttpCartClient, LineInput};
//!
//! let client = HttpCartClient::new(&config.api)?;
//!
//! let cart = client.create_cart(None).await?;
//! client.add_item(&cart.id, &LineInput {
//!     product: product.id.clone(),
//!     variant: product.variants[0].id.clone(),
//!     quantity: Quantity::ONE,
//! }).await?;
//! let cart = client.fetch_cart(&cart.id).await?;
//! ```

mod client;
pub mod types;

pub use client::HttpCartClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use storefront_cart_core::{CartId, CustomerId, LineItemId, Product, ProductId, Quantity};

/// Errors that can occur when talking to the remote cart API.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Transport-level failure (connection refused, DNS, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The envelope reported `success: false`.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Non-success HTTP status without a readable envelope.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// A successful envelope was missing its payload.
    #[error("Response missing data: {0}")]
    MissingData(&'static str),

    /// A route could not be built from the base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl RemoteError {
    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout | Self::RateLimited(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Parse(_)
            | Self::Rejected(_)
            | Self::NotFound(_)
            | Self::MissingData(_)
            | Self::Url(_) => false,
        }
    }
}

/// Operations the reconciliation controller needs from the remote cart API.
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// Create a cart, optionally owned by a customer.
    async fn create_cart(&self, customer: Option<&CustomerId>) -> Result<RemoteCart, RemoteError>;

    /// Fetch a cart by ID.
    async fn fetch_cart(&self, id: &CartId) -> Result<RemoteCart, RemoteError>;

    /// Fetch the active cart of a customer.
    async fn fetch_customer_cart(&self, customer: &CustomerId) -> Result<RemoteCart, RemoteError>;

    /// Add a line to a cart.
    async fn add_item(&self, cart: &CartId, line: &LineInput) -> Result<(), RemoteError>;

    /// Change the quantity of a line.
    async fn update_item(&self, item: &LineItemId, quantity: Quantity) -> Result<(), RemoteError>;

    /// Delete a line.
    async fn remove_item(&self, item: &LineItemId) -> Result<(), RemoteError>;

    /// Look up a product.
    async fn get_product(&self, id: &ProductId) -> Result<Product, RemoteError>;
}
