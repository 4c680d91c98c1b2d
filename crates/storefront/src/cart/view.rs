//! Display-ready cart snapshots for front ends.

use serde::Serialize;

use storefront_cart_core::{Cart, CartItem, CurrencyCode, Price, PriceError};

/// A cart line ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub title: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    /// Whether the remote cart knows this line.
    pub synced: bool,
}

/// A cart ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub cart_id: Option<String>,
    pub items: Vec<CartLineView>,
    pub subtotal: String,
    pub item_count: u64,
    /// True when the cart lives only on this device.
    pub offline: bool,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty(currency_code: CurrencyCode) -> Self {
        Self {
            cart_id: None,
            items: Vec::new(),
            subtotal: Price::zero(currency_code).display(),
            item_count: 0,
            offline: false,
        }
    }

    /// Snapshot a cart, pricing unpriced lines at `fallback`.
    ///
    /// # Errors
    ///
    /// Returns `PriceError` if lines mix currencies or a total overflows.
    pub fn from_cart(cart: &Cart, fallback: &Price) -> Result<Self, PriceError> {
        let items = cart
            .items()
            .iter()
            .map(|item| CartLineView::from_item(item, fallback))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            cart_id: Some(cart.cart_ref().to_string()),
            items,
            subtotal: cart.subtotal(fallback)?.display(),
            item_count: cart.total_quantity(),
            offline: !cart.is_synced(),
        })
    }
}

impl CartLineView {
    fn from_item(item: &CartItem, fallback: &Price) -> Result<Self, PriceError> {
        let unit_price = item.unit_price.unwrap_or(*fallback);
        Ok(Self {
            product_id: item.product.to_string(),
            variant_id: item.variant.as_ref().map(ToString::to_string),
            title: item
                .title
                .clone()
                .unwrap_or_else(|| item.product.to_string()),
            quantity: item.quantity.get(),
            price: unit_price.display(),
            line_price: item.line_total(fallback)?.display(),
            synced: item.item_id.is_some(),
        })
    }
}
