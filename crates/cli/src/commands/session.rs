//! Sign-in commands.
//!
//! Signing in or out changes which customer new carts are created for. The
//! current cart is kept either way.

use std::io::Write;

use storefront_cart::session::{self, SessionUser};
use storefront_cart_core::CustomerId;

use super::{App, write_json};
use crate::error::{CliError, clear_sentry_user, set_sentry_user};

/// Sign in as `customer`.
pub fn login(
    app: &mut App,
    out: &mut impl Write,
    customer: CustomerId,
    name: Option<String>,
) -> Result<(), CliError> {
    let user = SessionUser {
        display_name: name.unwrap_or_else(|| customer.to_string()),
        id: customer,
    };
    session::sign_in(&app.store, &user)?;
    app.cart.set_customer(Some(user.id.clone()));
    set_sentry_user(&user.id);
    tracing::info!(customer = %user.id, "Signed in");

    if app.json {
        write_json(out, &user)
    } else {
        writeln!(out, "Signed in as {} ({})", user.display_name, user.id)?;
        Ok(())
    }
}

/// Sign out.
pub fn logout(app: &mut App, out: &mut impl Write) -> Result<(), CliError> {
    let previous = session::current_user(&app.store)?;
    session::sign_out(&app.store)?;
    app.cart.set_customer(None);
    clear_sentry_user();

    match (previous, app.json) {
        (Some(user), true) => write_json(out, &user),
        (None, true) => write_json(out, &serde_json::Value::Null),
        (Some(user), false) => {
            writeln!(out, "Signed out {}", user.display_name)?;
            Ok(())
        }
        (None, false) => {
            writeln!(out, "Not signed in")?;
            Ok(())
        }
    }
}
