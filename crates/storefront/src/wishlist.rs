//! Device-local wishlist.
//!
//! The wishlist never talks to the cart API. Entries are kept in insertion
//! order under [`keys::WISHLIST`] and are unique by product.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use storefront_cart_core::{Product, ProductId, Quantity};

use crate::api::CartBackend;
use crate::cart::{CartController, CartError};
use crate::store::{LocalStore, LocalStoreExt, StoreError, keys};

/// Errors from wishlist operations.
#[derive(Debug, Error)]
pub enum WishlistError {
    /// The wishlist could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Moving an entry into the cart failed; the entry is kept.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The product is not on the wishlist.
    #[error("Product {0} is not on the wishlist")]
    NotListed(ProductId),
}

/// A saved product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    /// Saved product.
    pub product_id: ProductId,
    /// Title at the time it was saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// When the entry was added.
    pub added_at: DateTime<Utc>,
}

/// Wishlist backed by a [`LocalStore`].
pub struct Wishlist<S> {
    store: S,
}

impl<S: LocalStore> Wishlist<S> {
    /// Wrap a store.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// All entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read or holds an invalid
    /// wishlist.
    pub fn entries(&self) -> Result<Vec<WishlistEntry>, StoreError> {
        Ok(self
            .store
            .get_json::<Vec<WishlistEntry>>(keys::WISHLIST)?
            .unwrap_or_default())
    }

    /// Whether `product` is saved.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    pub fn contains(&self, product: &ProductId) -> Result<bool, StoreError> {
        Ok(self.entries()?.iter().any(|e| &e.product_id == product))
    }

    /// Save a product. Returns `false` if it was already saved.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read or written.
    pub fn add(&self, product: &Product) -> Result<bool, StoreError> {
        let mut entries = self.entries()?;
        if entries.iter().any(|e| e.product_id == product.id) {
            debug!(product_id = %product.id, "Already on wishlist");
            return Ok(false);
        }
        entries.push(WishlistEntry {
            product_id: product.id.clone(),
            title: product.display_title(),
            added_at: Utc::now(),
        });
        self.save(&entries)?;
        Ok(true)
    }

    /// Remove a product. Returns `false` if it was not saved.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read or written.
    pub fn remove(&self, product: &ProductId) -> Result<bool, StoreError> {
        let mut entries = self.entries()?;
        let before = entries.len();
        entries.retain(|e| &e.product_id != product);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(&entries)?;
        Ok(true)
    }

    /// Add the product if absent, remove it otherwise. Returns whether it is
    /// saved afterwards.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read or written.
    pub fn toggle(&self, product: &Product) -> Result<bool, StoreError> {
        if self.remove(&product.id)? {
            Ok(false)
        } else {
            self.add(product)
        }
    }

    /// Add one unit of a saved product to the cart and drop it from the
    /// wishlist. The entry stays if the cart add fails.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::NotListed` if the product is not saved,
    /// `WishlistError::Cart` if the cart add fails, and
    /// `WishlistError::Store` on storage failure.
    pub async fn move_to_cart<B, C>(
        &self,
        product: &Product,
        cart: &mut CartController<B, C>,
    ) -> Result<(), WishlistError>
    where
        B: CartBackend,
        C: LocalStore,
    {
        if !self.contains(&product.id)? {
            return Err(WishlistError::NotListed(product.id.clone()));
        }
        cart.add_item(product, Quantity::ONE, None).await?;
        self.remove(&product.id)?;
        info!(product_id = %product.id, "Moved wishlist entry to cart");
        Ok(())
    }

    fn save(&self, entries: &[WishlistEntry]) -> Result<(), StoreError> {
        if entries.is_empty() {
            self.store.remove(keys::WISHLIST)
        } else {
            self.store.set_json(keys::WISHLIST, entries)
        }
    }
}
