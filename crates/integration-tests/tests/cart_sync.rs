//! End-to-end cart reconciliation against the fake cart API.
//!
//! Run with: cargo test -p storefront-cart-integration-tests

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;

use storefront_cart::api::{CartBackend, HttpCartClient, RemoteError};
use storefront_cart::cart::{CartController, CartError, CartSettings};
use storefront_cart::store::{FileStore, LocalStore, MemoryStore, keys};
use storefront_cart_core::{
    CartId, CartRef, CurrencyCode, CustomerId, Price, Product, ProductId, Quantity, VariantId,
};
use storefront_cart_integration_tests::{FakeCartApi, Mode};

fn settings() -> CartSettings {
    CartSettings {
        fallback_unit_price: Price::zero(CurrencyCode::USD),
        variant_fallback: true,
    }
}

async fn setup() -> (
    FakeCartApi,
    CartController<HttpCartClient, Arc<MemoryStore>>,
    Arc<MemoryStore>,
) {
    let api = FakeCartApi::spawn().await;
    api.add_product("tee", "Linen Tee", "25.00", &["tee-m", "tee-l"]);
    api.add_product("mug", "Mug", "7.50", &["mug-blue"]);
    api.add_product("sticker", "Sticker", "2.00", &[]);

    let store = Arc::new(MemoryStore::new());
    let client = HttpCartClient::new(&api.config()).unwrap();
    let controller = CartController::new(client, Arc::clone(&store), settings(), None);
    (api, controller, store)
}

fn pid(id: &str) -> ProductId {
    ProductId::parse(id).unwrap()
}

fn qty(n: u32) -> Quantity {
    Quantity::new(n).unwrap()
}

fn remote_id(controller: &CartController<HttpCartClient, Arc<MemoryStore>>) -> String {
    match controller.cart_ref().unwrap() {
        CartRef::Remote(id) => id.to_string(),
        CartRef::Local(id) => panic!("expected a remote cart, got {id}"),
    }
}

fn temp_store_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("storefront-cart-it-{}", uuid::Uuid::new_v4().simple()))
        .join("state.json")
}

// ============================================================================
// Online
// ============================================================================

#[tokio::test]
async fn test_online_add_update_remove() {
    let (api, mut cart, _) = setup().await;

    let tee = cart.product(&pid("tee")).await;
    let mug = cart.product(&pid("mug")).await;
    assert_eq!(tee.title, "Linen Tee");

    cart.add_item(&tee, qty(2), None).await.unwrap();
    cart.add_item(&mug, qty(1), None).await.unwrap();
    let id = remote_id(&cart);

    assert_eq!(
        api.lines(&id),
        vec![
            ("tee".to_string(), "tee-m".to_string(), 2),
            ("mug".to_string(), "mug-blue".to_string(), 1),
        ]
    );
    assert_eq!(cart.total_quantity(), 3);
    assert_eq!(cart.subtotal().unwrap().amount, Decimal::new(5750, 2));

    cart.update_quantity(&pid("tee"), None, 4).await.unwrap();
    assert_eq!(api.lines(&id)[0].2, 4);

    cart.update_quantity(&pid("mug"), None, 0).await.unwrap();
    assert_eq!(api.lines(&id).len(), 1);

    cart.remove_item(&pid("tee"), None).await.unwrap();
    assert!(api.lines(&id).is_empty());
    assert_eq!(cart.total_quantity(), 0);
    assert_eq!(api.creates(), 1);
}

#[tokio::test]
async fn test_explicit_variant_is_sent() {
    let (api, mut cart, _) = setup().await;
    let tee = cart.product(&pid("tee")).await;
    let large = VariantId::parse("tee-l").unwrap();

    cart.add_item(&tee, qty(1), Some(&large)).await.unwrap();
    cart.add_item(&tee, qty(1), None).await.unwrap();

    let lines = api.lines(&remote_id(&cart));
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].1, "tee-l");
    assert_eq!(lines[1].1, "tee-m");

    cart.update_quantity(&pid("tee"), Some(&large), 3).await.unwrap();
    let lines = api.lines(&remote_id(&cart));
    assert_eq!(lines[0].2, 3);
    assert_eq!(lines[1].2, 1);
}

#[tokio::test]
async fn test_variantless_product_sends_product_id() {
    let (api, mut cart, _) = setup().await;
    let sticker = cart.product(&pid("sticker")).await;

    cart.add_item(&sticker, qty(3), None).await.unwrap();

    assert_eq!(
        api.lines(&remote_id(&cart)),
        vec![("sticker".to_string(), "sticker".to_string(), 3)]
    );
}

#[tokio::test]
async fn test_cart_created_for_customer() {
    let (api, mut cart, _) = setup().await;
    cart.set_customer(Some(CustomerId::parse("cust-7").unwrap()));

    let id = remote_id_after_ensure(&mut cart).await;

    assert_eq!(api.customer_of(&id).as_deref(), Some("cust-7"));
}

async fn remote_id_after_ensure(
    cart: &mut CartController<HttpCartClient, Arc<MemoryStore>>,
) -> String {
    match cart.ensure_cart().await {
        CartRef::Remote(id) => id.to_string(),
        CartRef::Local(id) => panic!("expected a remote cart, got {id}"),
    }
}

#[tokio::test]
async fn test_initialize_adopts_customer_cart() {
    let api = FakeCartApi::spawn().await;
    let seeded = api.seed_cart(Some("cust-3"), &[("mug", "mug-blue", 2)]);
    let store = Arc::new(MemoryStore::new());
    let mut cart = CartController::new(
        HttpCartClient::new(&api.config()).unwrap(),
        Arc::clone(&store),
        settings(),
        Some(CustomerId::parse("cust-3").unwrap()),
    );

    cart.initialize().await;

    assert_eq!(remote_id(&cart), seeded);
    assert_eq!(cart.total_quantity(), 2);
    assert_eq!(store.get_raw(keys::CART_ID).unwrap(), Some(seeded));
}

#[tokio::test]
async fn test_initialize_replaces_cached_items() {
    let (api, mut cart, store) = setup().await;
    let seeded = api.seed_cart(None, &[("tee", "tee-m", 1)]);
    store.set_raw(keys::CART_ID, seeded.clone()).unwrap();
    store
        .set_raw(
            keys::CART_ITEMS,
            r#"[{"product":"mug","variant":"mug-blue","quantity":9}]"#.to_string(),
        )
        .unwrap();

    cart.initialize().await;

    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.items()[0].product.as_str(), "tee");
    assert_eq!(cart.items()[0].title.as_deref(), Some("Linen Tee"));
}

// ============================================================================
// Degraded
// ============================================================================

#[tokio::test]
async fn test_down_api_falls_back_to_local_cart() {
    let (api, mut cart, store) = setup().await;
    api.set_mode(Mode::Down);

    let tee = cart.product(&pid("tee")).await;
    assert_eq!(tee, Product::bare(pid("tee")));

    cart.add_item(&tee, qty(2), None).await.unwrap();

    assert_eq!(cart.total_quantity(), 2);
    assert!(matches!(cart.cart_ref(), Some(CartRef::Local(_))));
    assert!(
        store
            .get_raw(keys::CART_ID)
            .unwrap()
            .unwrap()
            .starts_with("local_")
    );
    assert!(cart.view().unwrap().offline);
}

#[tokio::test]
async fn test_rejecting_api_falls_back_to_local_cart() {
    let (api, mut cart, _) = setup().await;
    api.set_mode(Mode::Rejecting);

    let cart_ref = cart.ensure_cart().await;

    assert!(!cart_ref.is_synced());
    assert_eq!(api.creates(), 0);
}

#[tokio::test]
async fn test_local_lines_replayed_when_api_recovers() {
    let (api, mut cart, _) = setup().await;
    let tee = cart.product(&pid("tee")).await;
    let mug = cart.product(&pid("mug")).await;

    api.set_fail_create(true);
    cart.add_item(&tee, qty(2), None).await.unwrap();
    cart.add_item(&mug, qty(1), None).await.unwrap();
    assert!(matches!(cart.cart_ref(), Some(CartRef::Local(_))));

    api.set_fail_create(false);
    cart.add_item(&tee, qty(1), None).await.unwrap();

    let id = remote_id(&cart);
    assert_eq!(
        api.lines(&id),
        vec![
            ("tee".to_string(), "tee-m".to_string(), 3),
            ("mug".to_string(), "mug-blue".to_string(), 1),
        ]
    );
    assert_eq!(cart.total_quantity(), 4);
}

#[tokio::test]
async fn test_expired_cart_is_replaced() {
    let (api, mut cart, _) = setup().await;
    let tee = cart.product(&pid("tee")).await;
    cart.add_item(&tee, qty(2), None).await.unwrap();
    let old = remote_id(&cart);

    api.expire(&old);
    let new = remote_id_after_ensure(&mut cart).await;

    assert_ne!(new, old);
    assert_eq!(api.lines(&new), vec![("tee".to_string(), "tee-m".to_string(), 2)]);
}

#[tokio::test]
async fn test_mutation_failure_on_remote_cart_is_surfaced() {
    let (api, mut cart, _) = setup().await;
    let tee = cart.product(&pid("tee")).await;
    cart.add_item(&tee, qty(2), None).await.unwrap();
    let before = cart.items().to_vec();

    api.set_mode(Mode::Down);
    let err = cart.update_quantity(&pid("tee"), None, 5).await.unwrap_err();

    assert!(matches!(err, CartError::Remote { .. }));
    assert_eq!(cart.items(), before.as_slice());
}

// ============================================================================
// Client
// ============================================================================

#[tokio::test]
async fn test_slow_api_times_out() {
    let api = FakeCartApi::spawn().await;
    let client = HttpCartClient::new(&api.config()).unwrap();
    api.set_mode(Mode::Slow(Duration::from_secs(3)));

    let err = client
        .fetch_cart(&CartId::parse("cart-1").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteError::Timeout));
}

#[tokio::test]
async fn test_success_false_with_200_is_an_error() {
    let api = FakeCartApi::spawn().await;
    let client = HttpCartClient::new(&api.config()).unwrap();
    api.set_mode(Mode::Rejecting);

    let err = client.create_cart(None).await.unwrap_err();

    assert!(
        matches!(err, RemoteError::Rejected(ref message) if message == "Cart service is rejecting requests")
    );
}

#[tokio::test]
async fn test_unknown_cart_is_not_found() {
    let api = FakeCartApi::spawn().await;
    let client = HttpCartClient::new(&api.config()).unwrap();

    let err = client
        .fetch_cart(&CartId::parse("missing").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteError::NotFound(_)));
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let api = FakeCartApi::spawn().await;
    api.require_token("s3cr3t-token");

    let anonymous = HttpCartClient::new(&api.config()).unwrap();
    assert!(anonymous.create_cart(None).await.is_err());

    let mut config = api.config();
    config.token = Some(SecretString::from("s3cr3t-token".to_string()));
    let authorized = HttpCartClient::new(&config).unwrap();
    assert!(authorized.create_cart(None).await.is_ok());
}

#[tokio::test]
async fn test_product_lookups_are_cached() {
    let api = FakeCartApi::spawn().await;
    api.add_product("tee", "Linen Tee", "25.00", &["tee-m"]);
    let client = HttpCartClient::new(&api.config()).unwrap();

    let first = client.get_product(&pid("tee")).await.unwrap();
    let second = client.get_product(&pid("tee")).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        first.price,
        Some(Price::new(Decimal::new(2500, 2), CurrencyCode::USD))
    );
    let product_requests = api
        .requests()
        .iter()
        .filter(|r| r.starts_with("GET /products/"))
        .count();
    assert_eq!(product_requests, 1);
}

#[tokio::test]
async fn test_ids_are_percent_encoded() {
    let api = FakeCartApi::spawn().await;
    let client = HttpCartClient::new(&api.config()).unwrap();

    let _ = client.fetch_cart(&CartId::parse("a b").unwrap()).await;

    assert_eq!(api.requests(), vec!["GET /carts/a b".to_string()]);
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_local_cart_survives_restart() {
    let api = FakeCartApi::spawn().await;
    api.set_mode(Mode::Down);
    let path = temp_store_path();

    let first_id = {
        let store = Arc::new(FileStore::open(&path).unwrap());
        let mut cart = CartController::new(
            HttpCartClient::new(&api.config()).unwrap(),
            store,
            settings(),
            None,
        );
        cart.initialize().await;
        cart.add_item(&Product::bare(pid("tee")), qty(2), None)
            .await
            .unwrap();
        cart.cart_ref().unwrap()
    };

    let store = Arc::new(FileStore::open(&path).unwrap());
    let mut cart = CartController::new(
        HttpCartClient::new(&api.config()).unwrap(),
        store,
        settings(),
        None,
    );
    cart.initialize().await;

    assert_eq!(cart.cart_ref(), Some(first_id));
    assert_eq!(cart.total_quantity(), 2);

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}
