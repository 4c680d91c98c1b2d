//! Cart commands.

use std::io::Write;

use storefront_cart_core::{ProductId, Quantity, VariantId};

use super::{App, print_cart};
use crate::error::{CliError, add_breadcrumb};

/// Print the cart.
pub fn show(app: &App, out: &mut impl Write) -> Result<(), CliError> {
    print_cart(app, out)
}

/// Add `quantity` units of a product, looking it up in the catalog first.
pub async fn add(
    app: &mut App,
    out: &mut impl Write,
    product: &ProductId,
    quantity: u32,
    variant: Option<&VariantId>,
) -> Result<(), CliError> {
    add_breadcrumb("cart", &format!("Add {quantity} x {product}"));
    let quantity = Quantity::new(quantity)?;
    let product = app.cart.product(product).await;
    app.cart.add_item(&product, quantity, variant).await?;
    print_cart(app, out)
}

/// Set a line's quantity.
pub async fn update(
    app: &mut App,
    out: &mut impl Write,
    product: &ProductId,
    quantity: i64,
    variant: Option<&VariantId>,
) -> Result<(), CliError> {
    add_breadcrumb("cart", &format!("Update {product} to {quantity}"));
    app.cart.update_quantity(product, variant, quantity).await?;
    print_cart(app, out)
}

/// Remove a line.
pub async fn remove(
    app: &mut App,
    out: &mut impl Write,
    product: &ProductId,
    variant: Option<&VariantId>,
) -> Result<(), CliError> {
    add_breadcrumb("cart", &format!("Remove {product}"));
    app.cart.remove_item(product, variant).await?;
    print_cart(app, out)
}

/// Empty the cart.
pub fn clear(app: &mut App, out: &mut impl Write) -> Result<(), CliError> {
    app.cart.clear_cart();
    print_cart(app, out)
}

/// Discard the cart after checkout.
pub fn checkout_complete(app: &mut App, out: &mut impl Write) -> Result<(), CliError> {
    app.cart.complete_checkout();
    print_cart(app, out)
}
