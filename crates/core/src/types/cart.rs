//! Cart and line item types.
//!
//! A [`Cart`] is either `Unsynced` (lives only on this device, identified by a
//! [`LocalCartId`]) or `Synced` (owned by the remote cart API). The pure line
//! operations here are what the reconciliation layer applies when it works
//! offline; synced carts are only ever replaced wholesale by a refetch.

use serde::{Deserialize, Serialize};

use super::id::{CartId, CartRef, CustomerId, LineItemId, LocalCartId, ProductId, VariantId};
use super::price::{Price, PriceError};
use super::quantity::Quantity;

/// A single line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product on this line.
    pub product: ProductId,
    /// Selected variant, if known.
    #[serde(default)]
    pub variant: Option<VariantId>,
    /// Number of units (always at least 1).
    pub quantity: Quantity,
    /// Server-assigned line ID. Present only once the line exists remotely.
    #[serde(default)]
    pub item_id: Option<LineItemId>,
    /// Product title captured when the line was added.
    #[serde(default)]
    pub title: Option<String>,
    /// Unit price captured when the line was added.
    #[serde(default)]
    pub unit_price: Option<Price>,
}

impl CartItem {
    /// A new local line with no server ID.
    #[must_use]
    pub const fn new(product: ProductId, variant: Option<VariantId>, quantity: Quantity) -> Self {
        Self {
            product,
            variant,
            quantity,
            item_id: None,
            title: None,
            unit_price: None,
        }
    }

    /// Whether this line matches a product and, when given, a variant.
    ///
    /// With `variant == None` any variant of the product matches.
    #[must_use]
    pub fn matches(&self, product: &ProductId, variant: Option<&VariantId>) -> bool {
        &self.product == product && variant.is_none_or(|v| self.variant.as_ref() == Some(v))
    }

    /// Line total using `fallback` when the line carries no unit price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the total exceeds the decimal range.
    pub fn line_total(&self, fallback: &Price) -> Result<Price, PriceError> {
        self.unit_price.unwrap_or(*fallback).times(self.quantity)
    }
}

/// The shopper's cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cart {
    /// No remote cart backs these items; they live only on this device.
    Unsynced {
        /// Device-local identifier.
        local_id: LocalCartId,
        /// Lines in insertion order.
        items: Vec<CartItem>,
    },
    /// The remote cart API is the source of truth for these items.
    Synced {
        /// Server-issued identifier.
        id: CartId,
        /// Owning customer, absent for anonymous carts.
        customer: Option<CustomerId>,
        /// Lines as last fetched from the remote.
        items: Vec<CartItem>,
    },
}

impl Cart {
    /// A new, empty local cart.
    #[must_use]
    pub fn unsynced() -> Self {
        Self::Unsynced {
            local_id: LocalCartId::generate(),
            items: Vec::new(),
        }
    }

    /// Reference to this cart's identity.
    #[must_use]
    pub fn cart_ref(&self) -> CartRef {
        match self {
            Self::Unsynced { local_id, .. } => CartRef::Local(local_id.clone()),
            Self::Synced { id, .. } => CartRef::Remote(id.clone()),
        }
    }

    /// Whether the remote cart API owns this cart.
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Synced { .. })
    }

    /// Lines in order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        match self {
            Self::Unsynced { items, .. } | Self::Synced { items, .. } => items,
        }
    }

    /// Consume the cart and return its lines.
    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        match self {
            Self::Unsynced { items, .. } | Self::Synced { items, .. } => items,
        }
    }

    /// First line matching a product and optional variant.
    #[must_use]
    pub fn find(&self, product: &ProductId, variant: Option<&VariantId>) -> Option<&CartItem> {
        self.items().iter().find(|item| item.matches(product, variant))
    }

    /// Sum of line quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items()
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }

    /// Sum of line totals, pricing unpriced lines at `fallback`.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::CurrencyMismatch` if lines use different currencies.
    pub fn subtotal(&self, fallback: &Price) -> Result<Price, PriceError> {
        self.items()
            .iter()
            .try_fold(Price::zero(fallback.currency_code), |acc, item| {
                acc.checked_add(&item.line_total(fallback)?)
            })
    }

    fn items_mut(&mut self) -> &mut Vec<CartItem> {
        match self {
            Self::Unsynced { items, .. } | Self::Synced { items, .. } => items,
        }
    }

    /// Merge a line into the cart: bump the quantity of a line for the same
    /// product and variant, or append it.
    pub fn merge_line(&mut self, line: CartItem) {
        let items = self.items_mut();
        if let Some(existing) = items
            .iter_mut()
            .find(|item| item.product == line.product && item.variant == line.variant)
        {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
            if existing.unit_price.is_none() {
                existing.unit_price = line.unit_price;
            }
            if existing.title.is_none() {
                existing.title = line.title;
            }
        } else {
            items.push(line);
        }
    }

    /// Remove the first line matching a product and optional variant.
    pub fn remove_line(
        &mut self,
        product: &ProductId,
        variant: Option<&VariantId>,
    ) -> Option<CartItem> {
        let items = self.items_mut();
        let index = items.iter().position(|item| item.matches(product, variant))?;
        Some(items.remove(index))
    }

    /// Set the quantity of the first matching line. Returns `false` if no
    /// line matched.
    pub fn set_quantity(
        &mut self,
        product: &ProductId,
        variant: Option<&VariantId>,
        quantity: Quantity,
    ) -> bool {
        match self
            .items_mut()
            .iter_mut()
            .find(|item| item.matches(product, variant))
        {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::CurrencyCode;

    fn pid(s: &str) -> ProductId {
        ProductId::parse(s).unwrap()
    }

    fn vid(s: &str) -> VariantId {
        VariantId::parse(s).unwrap()
    }

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[test]
    fn test_merge_line_sums_quantities() {
        let mut cart = Cart::unsynced();
        for n in [2, 3, 5] {
            cart.merge_line(CartItem::new(pid("a"), Some(vid("a-1")), qty(n)));
        }
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.find(&pid("a"), None).unwrap().quantity.get(), 10);
    }

    #[test]
    fn test_merge_line_keeps_variants_apart() {
        let mut cart = Cart::unsynced();
        cart.merge_line(CartItem::new(pid("a"), Some(vid("a-1")), qty(1)));
        cart.merge_line(CartItem::new(pid("a"), Some(vid("a-2")), qty(1)));
        cart.merge_line(CartItem::new(pid("a"), None, qty(1)));
        assert_eq!(cart.items().len(), 3);
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_remove_line() {
        let mut cart = Cart::unsynced();
        cart.merge_line(CartItem::new(pid("a"), None, qty(1)));
        cart.merge_line(CartItem::new(pid("b"), None, qty(2)));

        let removed = cart.remove_line(&pid("a"), None).unwrap();
        assert_eq!(removed.product, pid("a"));
        assert!(cart.find(&pid("a"), None).is_none());
        assert!(cart.remove_line(&pid("zzz"), None).is_none());
        assert_eq!(cart.total_quantity(), 2);
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = Cart::unsynced();
        cart.merge_line(CartItem::new(pid("a"), Some(vid("a-1")), qty(1)));
        assert!(cart.set_quantity(&pid("a"), None, qty(7)));
        assert!(!cart.set_quantity(&pid("a"), Some(&vid("a-9")), qty(7)));
        assert_eq!(cart.total_quantity(), 7);
    }

    #[test]
    fn test_subtotal_uses_fallback_price() {
        let mut cart = Cart::unsynced();
        let mut priced = CartItem::new(pid("a"), None, qty(2));
        priced.unit_price = Some(Price::new(Decimal::new(1000, 2), CurrencyCode::USD));
        cart.merge_line(priced);
        cart.merge_line(CartItem::new(pid("b"), None, qty(3)));

        let fallback = Price::new(Decimal::new(100, 2), CurrencyCode::USD);
        let subtotal = cart.subtotal(&fallback).unwrap();
        assert_eq!(subtotal.amount, Decimal::new(2300, 2));
    }

    #[test]
    fn test_subtotal_rejects_mixed_currencies() {
        let mut cart = Cart::unsynced();
        let mut item = CartItem::new(pid("a"), None, qty(1));
        item.unit_price = Some(Price::new(Decimal::ONE, CurrencyCode::EUR));
        cart.merge_line(item);

        let fallback = Price::zero(CurrencyCode::USD);
        assert!(matches!(
            cart.subtotal(&fallback),
            Err(PriceError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_cart_ref_matches_variant() {
        let cart = Cart::Synced {
            id: CartId::parse("cart-1").unwrap(),
            customer: None,
            items: Vec::new(),
        };
        assert!(cart.is_synced());
        assert_eq!(cart.cart_ref(), CartRef::Remote(CartId::parse("cart-1").unwrap()));
        assert!(!Cart::unsynced().cart_ref().is_synced());
    }
}
