//! Storefront cart CLI.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! cart-cli show
//!
//! # Add two units of a product
//! cart-cli add prod-123 --quantity 2
//!
//! # Change or remove a line
//! cart-cli update prod-123 5
//! cart-cli remove prod-123
//!
//! # Sign in so new carts belong to the customer
//! cart-cli login cust-42 --name "Ada"
//!
//! # Wishlist
//! cart-cli wishlist add prod-123
//! cart-cli wishlist move prod-123
//! ```
//!
//! # Environment Variables
//!
//! - `CART_API_BASE_URL` - Base URL of the cart API (required)
//! - `CART_API_TOKEN` - Bearer token for the cart API
//! - `CART_STORE_PATH` - Local state file
//! - `SENTRY_DSN` - Sentry error reporting
//! - `RUST_LOG` - Log filter (default `storefront_cart=info,cart_cli=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_cart::api::HttpCartClient;
use storefront_cart::cart::{CartController, CartSettings};
use storefront_cart::config::CartConfig;
use storefront_cart::session;
use storefront_cart::store::FileStore;
use storefront_cart_core::{CustomerId, ProductId, VariantId};

mod commands;
mod error;

use commands::App;
use error::CliError;

#[derive(Parser)]
#[command(name = "cart-cli")]
#[command(author, version, about = "Storefront cart CLI")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cart
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        product: ProductId,

        /// Units to add
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        quantity: u32,

        /// Variant ID (defaults to the product's first variant)
        #[arg(short, long)]
        variant: Option<VariantId>,
    },
    /// Set the quantity of a line (0 or less removes it)
    Update {
        /// Product ID
        product: ProductId,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,

        /// Variant ID of the line
        #[arg(short, long)]
        variant: Option<VariantId>,
    },
    /// Remove a line from the cart
    Remove {
        /// Product ID
        product: ProductId,

        /// Variant ID of the line
        #[arg(short, long)]
        variant: Option<VariantId>,
    },
    /// Empty the cart and forget its ID
    Clear,
    /// Discard the cart after a completed checkout
    CheckoutComplete,
    /// Sign in as a customer
    Login {
        /// Customer ID
        customer: CustomerId,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Sign out
    Logout,
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
}

#[derive(Subcommand)]
enum WishlistAction {
    /// List saved products
    List,
    /// Save a product
    Add {
        /// Product ID
        product: ProductId,
    },
    /// Remove a saved product
    Remove {
        /// Product ID
        product: ProductId,
    },
    /// Move a saved product into the cart
    Move {
        /// Product ID
        product: ProductId,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CartConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Logs go to stderr so stdout carries only command output.
fn init_tracing(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storefront_cart=info,cart_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Configuration is needed for Sentry, which must start before tracing
    let config = CartConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing(cli.log_json);

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report(&mut std::io::stderr().lock());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: CartConfig) -> Result<(), CliError> {
    let store = Arc::new(FileStore::open(&config.store_path)?);
    let user = session::current_user(&store)?;
    if let Some(user) = &user {
        error::set_sentry_user(&user.id);
    }

    let client = HttpCartClient::new(&config.api)?;
    let mut cart = CartController::new(
        client,
        Arc::clone(&store),
        CartSettings::from(&config),
        user.map(|user| user.id),
    );
    cart.initialize().await;

    let mut app = App {
        cart,
        store,
        json: cli.json,
    };
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Show => commands::cart::show(&app, &mut out),
        Commands::Add {
            product,
            quantity,
            variant,
        } => commands::cart::add(&mut app, &mut out, &product, quantity, variant.as_ref()).await,
        Commands::Update {
            product,
            quantity,
            variant,
        } => commands::cart::update(&mut app, &mut out, &product, quantity, variant.as_ref()).await,
        Commands::Remove { product, variant } => {
            commands::cart::remove(&mut app, &mut out, &product, variant.as_ref()).await
        }
        Commands::Clear => commands::cart::clear(&mut app, &mut out),
        Commands::CheckoutComplete => commands::cart::checkout_complete(&mut app, &mut out),
        Commands::Login { customer, name } => {
            commands::session::login(&mut app, &mut out, customer, name)
        }
        Commands::Logout => commands::session::logout(&mut app, &mut out),
        Commands::Wishlist { action } => match action {
            WishlistAction::List => commands::wishlist::list(&app, &mut out),
            WishlistAction::Add { product } => {
                commands::wishlist::add(&app, &mut out, &product).await
            }
            WishlistAction::Remove { product } => {
                commands::wishlist::remove(&app, &mut out, &product)
            }
            WishlistAction::Move { product } => {
                commands::wishlist::move_to_cart(&mut app, &mut out, &product).await
            }
        },
    }
}
