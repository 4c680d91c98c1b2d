//! Command implementations.
//!
//! Each command writes its result to `out`, as text or as JSON when the
//! `--json` flag is set.

pub mod cart;
pub mod session;
pub mod wishlist;

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;

use storefront_cart::api::HttpCartClient;
use storefront_cart::cart::{CartController, CartView};
use storefront_cart::store::FileStore;

use crate::error::CliError;

/// State shared by all commands.
pub struct App {
    pub cart: CartController<HttpCartClient, Arc<FileStore>>,
    pub store: Arc<FileStore>,
    pub json: bool,
}

/// Write `value` as pretty JSON followed by a newline.
pub fn write_json(out: &mut impl Write, value: &impl Serialize) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Write a cart as text.
pub fn write_cart(out: &mut impl Write, view: &CartView) -> std::io::Result<()> {
    let Some(cart_id) = &view.cart_id else {
        return writeln!(out, "Cart is empty");
    };

    let status = if view.offline { " (offline)" } else { "" };
    writeln!(out, "Cart {cart_id}{status}")?;

    if view.items.is_empty() {
        writeln!(out, "  (no items)")?;
    }
    for line in &view.items {
        let variant = line
            .variant_id
            .as_deref()
            .map(|v| format!(" [{v}]"))
            .unwrap_or_default();
        let pending = if line.synced { "" } else { " *" };
        writeln!(
            out,
            "  {:>3} x {}{variant}  {} each  {}{pending}",
            line.quantity, line.title, line.price, line.line_price
        )?;
    }

    writeln!(out, "Items: {}  Subtotal: {}", view.item_count, view.subtotal)
}

/// Write the cart in the requested format.
pub fn print_cart(app: &App, out: &mut impl Write) -> Result<(), CliError> {
    let view = app.cart.view()?;
    if app.json {
        write_json(out, &view)
    } else {
        write_cart(out, &view)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storefront_cart::cart::CartLineView;
    use storefront_cart_core::CurrencyCode;

    use super::*;

    fn render(view: &CartView) -> String {
        let mut buf = Vec::new();
        write_cart(&mut buf, view).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_write_empty_cart() {
        assert_eq!(render(&CartView::empty(CurrencyCode::USD)), "Cart is empty\n");
    }

    #[test]
    fn test_write_offline_cart() {
        let view = CartView {
            cart_id: Some("local_1_abc".to_string()),
            items: vec![CartLineView {
                product_id: "mug".to_string(),
                variant_id: Some("mug-blue".to_string()),
                title: "Mug".to_string(),
                quantity: 2,
                price: "$7.50".to_string(),
                line_price: "$15.00".to_string(),
                synced: false,
            }],
            subtotal: "$15.00".to_string(),
            item_count: 2,
            offline: true,
        };

        let text = render(&view);

        assert!(text.starts_with("Cart local_1_abc (offline)\n"));
        assert!(text.contains("2 x Mug [mug-blue]  $7.50 each  $15.00 *"));
        assert!(text.ends_with("Items: 2  Subtotal: $15.00\n"));
    }

    #[test]
    fn test_write_json() {
        let mut buf = Vec::new();
        write_json(&mut buf, &CartView::empty(CurrencyCode::EUR)).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["item_count"], 0);
        assert_eq!(value["subtotal"], "€0.00");
    }
}
