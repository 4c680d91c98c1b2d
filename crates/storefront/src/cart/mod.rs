//! Cart reconciliation.
//!
//! [`CartController`] keeps one consistent view of what is in the cart. It
//! prefers the remote cart API as system of record and degrades to a
//! device-local cart when the remote is unreachable.
//!
//! # Failure semantics
//!
//! - Reads (`initialize`, verification inside `ensure_cart`) never fail:
//!   remote errors are logged and the cached state is kept.
//! - Creation failure yields an `Unsynced` cart; the shopper keeps working
//!   offline. Local lines move onto a new remote cart all together or not
//!   at all: if any line fails to replay the local cart is kept.
//! - Mutations of a `Synced` cart surface remote errors and leave the
//!   in-memory cart untouched. Nothing is applied optimistically: a
//!   successful remote mutation is followed by a full refetch.
//!
//! # Persistence
//!
//! After every successful in-memory change the items and cart identifier are
//! mirrored to the [`LocalStore`] in a single batch. Mirror failures are logged, not returned;
//! the in-memory cart stays authoritative for the life of the process.

mod view;


pub use view::{CartLineView, CartView};

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use storefront_cart_core::{
    Cart, CartId, CartItem, CartRef, CustomerId, LocalCartId, Price, PriceError, Product,
    ProductId, Quantity, QuantityError, VariantId,
};

use crate::api::{CartBackend, LineInput, RemoteCart, RemoteError};
use crate::config::CartConfig;
use crate::store::{LocalStore, LocalStoreExt, StoreWrite, keys};

/// Errors surfaced by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// A remote call failed while mutating a synced cart.
    #[error("Remote {operation} failed: {source}")]
    Remote {
        /// Operation that failed (e.g., "add item").
        operation: &'static str,
        /// Underlying remote error.
        #[source]
        source: RemoteError,
    },

    /// The product has no variant and the product-ID fallback is disabled.
    #[error("Product {0} has no variant to add")]
    MissingVariant(ProductId),

    /// A remote cart line has no server ID even after a refetch.
    #[error("Line for product {0} is not on the remote cart")]
    UnknownLine(ProductId),

    /// The requested quantity cannot be represented.
    #[error("Invalid quantity: {0}")]
    Quantity(#[from] QuantityError),

    /// Cart totals could not be computed.
    #[error("Price error: {0}")]
    Price(#[from] PriceError),
}

impl CartError {
    const fn remote(operation: &'static str, source: RemoteError) -> Self {
        Self::Remote { operation, source }
    }

    /// Whether the same call may succeed if the shopper retries later.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Remote { source, .. } => source.is_transient(),
            Self::MissingVariant(_) | Self::UnknownLine(_) | Self::Quantity(_) | Self::Price(_) => {
                false
            }
        }
    }
}

/// Behavior knobs for the controller, usually taken from [`CartConfig`].
#[derive(Debug, Clone)]
pub struct CartSettings {
    /// Unit price for lines that carry none.
    pub fallback_unit_price: Price,
    /// Send the product ID as variant ID when a product has no variants.
    ///
    /// Compatibility shim for cart APIs that require a variant on every
    /// line. When disabled, adding such a product fails with
    /// [`CartError::MissingVariant`].
    pub variant_fallback: bool,
}

impl From<&CartConfig> for CartSettings {
    fn from(config: &CartConfig) -> Self {
        Self {
            fallback_unit_price: config.fallback_unit_price,
            variant_fallback: config.variant_fallback,
        }
    }
}

/// Owns the shopper's cart and reconciles it with the remote cart API.
///
/// Methods take `&mut self`, so operations on one controller never
/// interleave; the most recent successful refetch wins.
pub struct CartController<B, S> {
    backend: B,
    store: S,
    settings: CartSettings,
    customer: Option<CustomerId>,
    cart: Option<Cart>,
}

impl<B: CartBackend, S: LocalStore> CartController<B, S> {
    /// Create a controller with no cart loaded. Call
    /// [`initialize`](Self::initialize) to restore persisted state.
    ///
    /// `customer` is the signed-in customer new carts are created for.
    pub const fn new(
        backend: B,
        store: S,
        settings: CartSettings,
        customer: Option<CustomerId>,
    ) -> Self {
        Self {
            backend,
            store,
            settings,
            customer,
            cart: None,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The current cart, if one has been created.
    #[must_use]
    pub const fn cart(&self) -> Option<&Cart> {
        self.cart.as_ref()
    }

    /// Current lines (empty when no cart exists).
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        self.cart.as_ref().map(Cart::items).unwrap_or_default()
    }

    /// Identity of the current cart.
    #[must_use]
    pub fn cart_ref(&self) -> Option<CartRef> {
        self.cart.as_ref().map(Cart::cart_ref)
    }

    /// Sum of line quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.cart.as_ref().map_or(0, Cart::total_quantity)
    }

    /// Sum of line totals, pricing unpriced lines at the fallback price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError` if lines mix currencies or the total overflows.
    pub fn subtotal(&self) -> Result<Price, PriceError> {
        let fallback = &self.settings.fallback_unit_price;
        self.cart
            .as_ref()
            .map_or(Ok(Price::zero(fallback.currency_code)), |cart| {
                cart.subtotal(fallback)
            })
    }

    /// Display-ready snapshot of the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Price` if totals cannot be computed.
    pub fn view(&self) -> Result<CartView, CartError> {
        let fallback = &self.settings.fallback_unit_price;
        match &self.cart {
            Some(cart) => Ok(CartView::from_cart(cart, fallback)?),
            None => Ok(CartView::empty(fallback.currency_code)),
        }
    }

    /// Replace the customer context (sign-in or sign-out).
    ///
    /// Affects carts created from now on; the current cart is kept.
    pub fn set_customer(&mut self, customer: Option<CustomerId>) {
        debug!(customer = ?customer.as_ref().map(CustomerId::as_str), "Customer context changed");
        self.customer = customer;
    }

    /// Look up a product, falling back to a bare product when the catalog is
    /// unreachable so the shopper can still add it offline.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Product {
        match self.backend.get_product(id).await {
            Ok(product) => product,
            Err(e) => {
                warn!(error = %e, "Product lookup failed, continuing without catalog data");
                Product::bare(id.clone())
            }
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Restore persisted state and reconcile it with the remote.
    ///
    /// A persisted remote cart is refetched and its items replace the cached
    /// ones. If the refetch fails the cached items are kept. With no
    /// persisted cart and a signed-in customer, the customer's remote cart is
    /// adopted when there is one.
    #[instrument(skip(self))]
    pub async fn initialize(&mut self) {
        let items = self.load_items();
        let stored = self.load_cart_ref();

        self.cart = match stored {
            Some(CartRef::Remote(id)) => match self.backend.fetch_cart(&id).await {
                Ok(remote) => {
                    info!(cart_id = %id, "Restored cart from remote");
                    Some(remote.into_cart())
                }
                Err(e) => {
                    warn!(cart_id = %id, error = %e, "Remote cart unavailable, using cached items");
                    Some(Cart::Synced {
                        id,
                        customer: self.customer.clone(),
                        items,
                    })
                }
            },
            Some(CartRef::Local(local_id)) => {
                debug!(cart_id = %local_id, "Restored local cart");
                Some(Cart::Unsynced { local_id, items })
            }
            None => self.restore_without_id(items).await,
        };

        self.persist();
    }

    async fn restore_without_id(&self, items: Vec<CartItem>) -> Option<Cart> {
        if !items.is_empty() {
            debug!("Cached items without a cart ID, keeping them in a local cart");
            return Some(Cart::Unsynced {
                local_id: LocalCartId::generate(),
                items,
            });
        }

        let customer = self.customer.as_ref()?;
        match self.backend.fetch_customer_cart(customer).await {
            Ok(remote) => {
                info!(cart_id = %remote.id, "Adopted customer's remote cart");
                Some(remote.into_cart())
            }
            Err(e) => {
                debug!(error = %e, "No remote cart for customer");
                None
            }
        }
    }

    /// Return a usable cart identity, creating a cart if needed.
    ///
    /// Never fails. A held remote ID is verified first and discarded if the
    /// remote no longer knows it. Creation is attempted for the current
    /// customer; if it fails a local cart is used instead. When creation
    /// succeeds while local items exist, those items are replayed onto the
    /// new remote cart.
    #[instrument(skip(self))]
    pub async fn ensure_cart(&mut self) -> CartRef {
        if let Some(Cart::Synced { id, .. }) = &self.cart {
            let id = id.clone();
            match self.backend.fetch_cart(&id).await {
                Ok(_) => return CartRef::Remote(id),
                Err(e) => {
                    warn!(cart_id = %id, error = %e, "Cart failed verification, discarding ID");
                    self.demote_to_local();
                }
            }
        }

        match self.backend.create_cart(self.customer.as_ref()).await {
            Ok(remote) => {
                info!(cart_id = %remote.id, "Created remote cart");
                let cart_ref = self.adopt_created(remote).await;
                self.persist();
                cart_ref
            }
            Err(e) => {
                warn!(error = %e, "Cart creation failed, continuing with a local cart");
                let cart = self.cart.get_or_insert_with(Cart::unsynced);
                let cart_ref = cart.cart_ref();
                self.persist();
                cart_ref
            }
        }
    }

    /// Turn the current synced cart into a local one with the same lines,
    /// stripped of server line IDs that no longer mean anything.
    fn demote_to_local(&mut self) {
        let items = self
            .cart
            .take()
            .map(Cart::into_items)
            .unwrap_or_default()
            .into_iter()
            .map(|item| CartItem {
                item_id: None,
                ..item
            })
            .collect();
        self.cart = Some(Cart::Unsynced {
            local_id: LocalCartId::generate(),
            items,
        });
    }

    /// Switch to a freshly created remote cart, replaying local lines onto
    /// it first.
    ///
    /// The remote cart is adopted only once every line is replayed and the
    /// cart refetched. Otherwise the local cart is kept unchanged and the next
    /// [`ensure_cart`](Self::ensure_cart) starts over with another remote cart.
    async fn adopt_created(&mut self, remote: RemoteCart) -> CartRef {
        let id = remote.id.clone();
        let pending = self.items();
        if pending.is_empty() {
            self.cart = Some(remote.into_cart());
            return CartRef::Remote(id);
        }

        let total = pending.len();
        let replayed = self.replay(&id, pending).await;
        match replayed {
            Ok(cart) => {
                info!(cart_id = %id, total, "Replayed local lines onto remote cart");
                self.cart = Some(cart);
                CartRef::Remote(id)
            }
            Err(e) => {
                warn!(cart_id = %id, error = %e, "Replay failed, keeping local cart");
                self.cart.get_or_insert_with(Cart::unsynced).cart_ref()
            }
        }
    }

    async fn replay(&self, id: &CartId, items: &[CartItem]) -> Result<Cart, CartError> {
        for item in items {
            let variant = self
                .remote_variant(&item.product, item.variant.as_ref())
                .ok_or_else(|| CartError::MissingVariant(item.product.clone()))?;
            let line = LineInput {
                product: item.product.clone(),
                variant,
                quantity: item.quantity,
            };
            self.backend
                .add_item(id, &line)
                .await
                .map_err(|source| CartError::remote("replay line", source))?;
        }
        let remote = self
            .backend
            .fetch_cart(id)
            .await
            .map_err(|source| CartError::remote("refetch", source))?;
        Ok(remote.into_cart())
    }

    /// Empty the cart and forget its identifier. The remote cart itself is
    /// left alone.
    #[instrument(skip(self))]
    pub fn clear_cart(&mut self) {
        if let Some(cart) = self.cart.take() {
            info!(cart_id = %cart.cart_ref(), "Cleared cart");
        }
        self.persist();
    }

    /// Destroy the cart after a completed checkout.
    #[instrument(skip(self))]
    pub fn complete_checkout(&mut self) {
        if let Some(cart) = &self.cart {
            info!(
                cart_id = %cart.cart_ref(),
                items = cart.total_quantity(),
                "Checkout completed"
            );
        }
        self.clear_cart();
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of a product.
    ///
    /// The variant is `variant` if given, else the product's first variant.
    /// On a remote cart the line is added remotely and the cart refetched;
    /// on a local cart the matching line is incremented or a new one
    /// appended.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Remote` if the remote cart rejects the add or the
    /// refetch fails (the cart is left unchanged), and
    /// `CartError::MissingVariant` if no variant can be resolved.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_item(
        &mut self,
        product: &Product,
        quantity: Quantity,
        variant: Option<&VariantId>,
    ) -> Result<(), CartError> {
        let variant = variant
            .cloned()
            .or_else(|| product.first_variant().map(|v| v.id.clone()));
        if variant.is_none() && !self.settings.variant_fallback {
            return Err(CartError::MissingVariant(product.id.clone()));
        }

        match self.ensure_cart().await {
            CartRef::Remote(id) => {
                let remote_variant = self
                    .remote_variant(&product.id, variant.as_ref())
                    .ok_or_else(|| CartError::MissingVariant(product.id.clone()))?;
                let line = LineInput {
                    product: product.id.clone(),
                    variant: remote_variant,
                    quantity,
                };
                self.backend
                    .add_item(&id, &line)
                    .await
                    .map_err(|source| CartError::remote("add item", source))?;
                self.refetch(&id).await
            }
            CartRef::Local(_) => {
                let unit_price = product.unit_price(variant.as_ref());
                let line = CartItem {
                    title: product.display_title(),
                    unit_price,
                    ..CartItem::new(product.id.clone(), variant, quantity)
                };
                if let Some(cart) = self.cart.as_mut() {
                    cart.merge_line(line);
                }
                self.persist();
                Ok(())
            }
        }
    }

    /// Remove the first line for `product` (and `variant`, when given).
    ///
    /// Removing a product that is not in the cart is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Remote` if the cart is remote and the delete or
    /// refetch fails; the cart is left unchanged.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &mut self,
        product: &ProductId,
        variant: Option<&VariantId>,
    ) -> Result<(), CartError> {
        let Some((cart_ref, line)) = self.locate_for_mutation(product, variant).await? else {
            debug!("Product not in cart, nothing to remove");
            return Ok(());
        };

        match (cart_ref, line.item_id) {
            (CartRef::Remote(id), Some(item_id)) => {
                self.backend
                    .remove_item(&item_id)
                    .await
                    .map_err(|source| CartError::remote("remove item", source))?;
                self.refetch(&id).await
            }
            (CartRef::Remote(_), None) => Err(CartError::UnknownLine(product.clone())),
            (CartRef::Local(_), _) => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.remove_line(product, variant);
                }
                self.persist();
                Ok(())
            }
        }
    }

    /// Set the quantity of the first line for `product`.
    ///
    /// A quantity of 0 or less removes the line, exactly like
    /// [`remove_item`](Self::remove_item).
    ///
    /// # Errors
    ///
    /// Returns `CartError::Remote` if the cart is remote and the update or
    /// refetch fails (the cart is left unchanged), and
    /// `CartError::Quantity` if the quantity exceeds `u32::MAX`.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &mut self,
        product: &ProductId,
        variant: Option<&VariantId>,
        new_quantity: i64,
    ) -> Result<(), CartError> {
        let quantity = match Quantity::try_from(new_quantity) {
            Ok(quantity) => quantity,
            Err(QuantityError::NotPositive(_)) => {
                return self.remove_item(product, variant).await;
            }
            Err(e) => return Err(e.into()),
        };

        let Some((cart_ref, line)) = self.locate_for_mutation(product, variant).await? else {
            debug!("Product not in cart, nothing to update");
            return Ok(());
        };

        match (cart_ref, line.item_id) {
            (CartRef::Remote(id), Some(item_id)) => {
                self.backend
                    .update_item(&item_id, quantity)
                    .await
                    .map_err(|source| CartError::remote("update item", source))?;
                self.refetch(&id).await
            }
            (CartRef::Remote(_), None) => Err(CartError::UnknownLine(product.clone())),
            (CartRef::Local(_), _) => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.set_quantity(product, variant, quantity);
                }
                self.persist();
                Ok(())
            }
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn locate(
        &self,
        product: &ProductId,
        variant: Option<&VariantId>,
    ) -> Option<(CartRef, CartItem)> {
        let cart = self.cart.as_ref()?;
        let line = cart.find(product, variant)?.clone();
        Some((cart.cart_ref(), line))
    }

    /// Like [`locate`](Self::locate), but a remote cart line without a server
    /// ID (restored from the local cache) triggers a refetch first so the
    /// mutation can go to the remote.
    async fn locate_for_mutation(
        &mut self,
        product: &ProductId,
        variant: Option<&VariantId>,
    ) -> Result<Option<(CartRef, CartItem)>, CartError> {
        let Some((cart_ref, line)) = self.locate(product, variant) else {
            return Ok(None);
        };
        match cart_ref.remote() {
            Some(id) if line.item_id.is_none() => {
                debug!(cart_id = %id, "Line has no server ID, refetching before mutation");
                self.refetch(id).await?;
                Ok(self.locate(product, variant))
            }
            _ => Ok(Some((cart_ref, line))),
        }
    }

    /// Variant ID to send to the remote, applying the product-ID shim when
    /// enabled.
    fn remote_variant(&self, product: &ProductId, variant: Option<&VariantId>) -> Option<VariantId> {
        if let Some(variant) = variant {
            return Some(variant.clone());
        }
        if !self.settings.variant_fallback {
            return None;
        }
        warn!(product = %product, "No variant known, sending product ID as variant ID");
        VariantId::parse(product.as_str()).ok()
    }

    /// Replace the cart with the remote's current state.
    async fn refetch(&mut self, id: &CartId) -> Result<(), CartError> {
        let remote = self
            .backend
            .fetch_cart(id)
            .await
            .map_err(|source| CartError::remote("refetch", source))?;
        debug!(cart_id = %id, lines = remote.items.len(), "Refetched cart");
        self.cart = Some(remote.into_cart());
        self.persist();
        Ok(())
    }

    fn load_items(&self) -> Vec<CartItem> {
        match self.store.get_json::<Vec<CartItem>>(keys::CART_ITEMS) {
            Ok(items) => items.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Cached cart items unreadable, starting empty");
                Vec::new()
            }
        }
    }

    fn load_cart_ref(&self) -> Option<CartRef> {
        let raw = match self.store.get_raw(keys::CART_ID) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Cached cart ID unreadable");
                return None;
            }
        };
        match CartRef::from_persisted(&raw) {
            Ok(cart_ref) => Some(cart_ref),
            Err(e) => {
                warn!(error = %e, "Discarding malformed cached cart ID");
                None
            }
        }
    }

    /// Mirror the in-memory cart to the local store. Items and identifier
    /// are written together so the store never pairs one cart's ID with
    /// another's lines.
    fn persist(&self) {
        let writes = match &self.cart {
            Some(cart) => StoreWrite::json(keys::CART_ITEMS, cart.items()).map(|items| {
                vec![
                    StoreWrite::Set(keys::CART_ID, cart.cart_ref().to_persisted()),
                    items,
                ]
            }),
            None => Ok(vec![
                StoreWrite::Remove(keys::CART_ID),
                StoreWrite::Remove(keys::CART_ITEMS),
            ]),
        };

        if let Err(e) = writes.and_then(|writes| self.store.write_batch(writes)) {
            error!(error = %e, "Failed to mirror cart to local store");
        }
    }
}
