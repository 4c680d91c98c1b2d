//! Wishlist commands.

use std::io::Write;
use std::sync::Arc;

use storefront_cart::store::FileStore;
use storefront_cart::wishlist::{Wishlist, WishlistEntry};
use storefront_cart_core::ProductId;

use super::{App, print_cart, write_json};
use crate::error::{CliError, add_breadcrumb};

fn wishlist(app: &App) -> Wishlist<Arc<FileStore>> {
    Wishlist::new(Arc::clone(&app.store))
}

fn write_entries(out: &mut impl Write, entries: &[WishlistEntry]) -> std::io::Result<()> {
    if entries.is_empty() {
        return writeln!(out, "Wishlist is empty");
    }
    for entry in entries {
        let title = entry.title.as_deref().unwrap_or_else(|| entry.product_id.as_str());
        writeln!(
            out,
            "  {}  {title}  (saved {})",
            entry.product_id,
            entry.added_at.format("%Y-%m-%d")
        )?;
    }
    Ok(())
}

/// List saved products.
pub fn list(app: &App, out: &mut impl Write) -> Result<(), CliError> {
    let entries = wishlist(app).entries()?;
    if app.json {
        write_json(out, &entries)
    } else {
        write_entries(out, &entries)?;
        Ok(())
    }
}

/// Save a product.
pub async fn add(app: &App, out: &mut impl Write, product: &ProductId) -> Result<(), CliError> {
    let product = app.cart.product(product).await;
    let added = wishlist(app).add(&product)?;
    if !app.json {
        let message = if added { "Saved" } else { "Already saved" };
        writeln!(out, "{message} {}", product.id)?;
    }
    list(app, out)
}

/// Remove a saved product.
pub fn remove(app: &App, out: &mut impl Write, product: &ProductId) -> Result<(), CliError> {
    let removed = wishlist(app).remove(product)?;
    if !app.json {
        let message = if removed { "Removed" } else { "Not saved:" };
        writeln!(out, "{message} {product}")?;
    }
    list(app, out)
}

/// Move a saved product into the cart.
pub async fn move_to_cart(
    app: &mut App,
    out: &mut impl Write,
    product: &ProductId,
) -> Result<(), CliError> {
    add_breadcrumb("wishlist", &format!("Move {product} to cart"));
    let product = app.cart.product(product).await;
    let wishlist = wishlist(app);
    wishlist.move_to_cart(&product, &mut app.cart).await?;
    print_cart(app, out)
}
