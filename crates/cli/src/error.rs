//! CLI error type with Sentry reporting.

use std::io::Write;

use thiserror::Error;

use storefront_cart::api::RemoteError;
use storefront_cart::cart::CartError;
use storefront_cart::config::ConfigError;
use storefront_cart::store::StoreError;
use storefront_cart::wishlist::WishlistError;
use storefront_cart_core::{PriceError, QuantityError};

/// Errors that end a CLI invocation.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local state could not be read or written.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// The cart API client could not be built.
    #[error("Cart API error: {0}")]
    Remote(#[from] RemoteError),

    /// A cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// A wishlist operation failed.
    #[error("Wishlist error: {0}")]
    Wishlist(#[from] WishlistError),

    /// A quantity argument was out of range.
    #[error("Invalid quantity: {0}")]
    Quantity(#[from] QuantityError),

    /// Totals could not be computed.
    #[error("Price error: {0}")]
    Price(#[from] PriceError),

    /// Writing output failed.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    /// Encoding JSON output failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shown when the cart API timed out or was briefly unavailable.
const RETRY_HINT: &str = "The cart service did not respond in time. Please try again.";

impl CliError {
    /// Log the error, capturing unexpected failures to Sentry.
    ///
    /// Transient remote failures are not reported; `out` gets a retry hint
    /// instead.
    pub fn report(&self, out: &mut impl Write) {
        if self.is_transient() {
            tracing::warn!(error = %self, "Command failed, cart API unavailable");
            if let Err(e) = writeln!(out, "{RETRY_HINT}") {
                tracing::debug!(error = %e, "Failed to write retry hint");
            }
        } else if self.is_unexpected() {
            let event_id = sentry::capture_error(self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "Command failed");
        } else {
            tracing::error!(error = %self, "Command failed");
        }
    }

    /// Remote failures the user may clear by retrying.
    const fn is_transient(&self) -> bool {
        match self {
            Self::Remote(err) => err.is_transient(),
            Self::Cart(err) | Self::Wishlist(WishlistError::Cart(err)) => err.is_transient(),
            _ => false,
        }
    }

    /// Failures worth an error report, as opposed to bad input.
    const fn is_unexpected(&self) -> bool {
        match self {
            Self::Store(_) | Self::Remote(_) | Self::Output(_) | Self::Json(_) => true,
            Self::Cart(err) => matches!(err, CartError::Remote { .. } | CartError::Price(_)),
            Self::Wishlist(err) => !matches!(err, WishlistError::NotListed(_)),
            Self::Config(_) | Self::Quantity(_) | Self::Price(_) => false,
        }
    }
}

/// Associate subsequent Sentry events with a customer.
pub fn set_sentry_user(customer_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(customer_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Stop associating Sentry events with a customer.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Record a user action as a Sentry breadcrumb.
pub fn add_breadcrumb(category: &str, message: &str) {
    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    });
}
