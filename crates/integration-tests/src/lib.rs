//! In-process fake of the remote cart API.
//!
//! [`FakeCartApi::spawn`] serves the cart routes on an ephemeral local port
//! so the real HTTP client and controller can be exercised end to end.
//! Failures are switched on per test through the handle.
//!
//! # Example
//!
//! ```rust,ignore
//! let api = FakeCartApi::spawn().await;
//! api.set_mode(Mode::Down);
//! let client = HttpCartClient::new(&api.config())?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use storefront_cart::api::Envelope;
use storefront_cart::config::CartApiConfig;

/// How the fake answers cart requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Normal operation.
    #[default]
    Up,
    /// Every call fails with 503 and no envelope.
    Down,
    /// Every call answers 200 with `success: false`.
    Rejecting,
    /// Every call sleeps for the given time before answering.
    Slow(Duration),
}

#[derive(Debug, Clone)]
struct Line {
    id: String,
    product_id: String,
    variant_id: String,
    quantity: u32,
}

#[derive(Debug, Clone)]
struct CartRecord {
    customer_id: Option<String>,
    lines: Vec<Line>,
}

#[derive(Debug, Default)]
struct FakeState {
    mode: Mode,
    fail_create: bool,
    token: Option<String>,
    next_id: u64,
    carts: HashMap<String, CartRecord>,
    products: HashMap<String, Value>,
    creates: usize,
    requests: Vec<String>,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn cart_json(&self, id: &str) -> Option<Value> {
        let cart = self.carts.get(id)?;
        let items: Vec<Value> = cart
            .lines
            .iter()
            .map(|line| {
                let mut item = json!({
                    "id": line.id,
                    "product_id": line.product_id,
                    "variant_id": line.variant_id,
                    "quantity": line.quantity,
                });
                if let Some(product) = self.products.get(&line.product_id) {
                    item["title"] = product["title"].clone();
                    item["unit_price"] = product["price"].clone();
                }
                item
            })
            .collect();
        Some(json!({
            "id": id,
            "customer_id": cart.customer_id,
            "items": items,
        }))
    }

    fn find_line_mut(&mut self, item_id: &str) -> Option<&mut Line> {
        self.carts
            .values_mut()
            .flat_map(|cart| cart.lines.iter_mut())
            .find(|line| line.id == item_id)
    }
}

type Shared = Arc<Mutex<FakeState>>;

/// Handle to a running fake cart API.
#[derive(Clone)]
pub struct FakeCartApi {
    addr: SocketAddr,
    state: Shared,
}

impl FakeCartApi {
    /// Bind to an ephemeral port and serve in the background.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn() -> Self {
        let state: Shared = Arc::default();
        let app = router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake cart API");
        let addr = listener
            .local_addr()
            .expect("Failed to read fake cart API address");

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Fake cart API stopped");
            }
        });

        Self { addr, state }
    }

    /// Base URL of the API.
    ///
    /// # Panics
    ///
    /// Panics if the bound address does not form a URL.
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/api/", self.addr)).expect("Invalid fake cart API URL")
    }

    /// Client configuration pointing at this API with a short timeout.
    #[must_use]
    pub fn config(&self) -> CartApiConfig {
        CartApiConfig {
            timeout: Duration::from_millis(500),
            ..CartApiConfig::new(self.base_url())
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Switch how requests are answered.
    pub fn set_mode(&self, mode: Mode) {
        self.lock().mode = mode;
    }

    /// Make `POST /carts` fail while leaving other routes working.
    pub fn set_fail_create(&self, fail: bool) {
        self.lock().fail_create = fail;
    }

    /// Require this bearer token on every request.
    pub fn require_token(&self, token: &str) {
        self.lock().token = Some(token.to_string());
    }

    /// Register a catalog product.
    pub fn add_product(&self, id: &str, title: &str, price: &str, variants: &[&str]) {
        let variants: Vec<Value> = variants
            .iter()
            .map(|v| json!({ "id": v, "title": v }))
            .collect();
        self.lock().products.insert(
            id.to_string(),
            json!({
                "id": id,
                "title": title,
                "price": { "amount": price, "currency_code": "USD" },
                "variants": variants,
            }),
        );
    }

    /// Create a cart directly on the server.
    pub fn seed_cart(&self, customer_id: Option<&str>, lines: &[(&str, &str, u32)]) -> String {
        let mut state = self.lock();
        let id = state.next_id("cart");
        let lines = lines
            .iter()
            .map(|(product, variant, quantity)| Line {
                id: state.next_id("line"),
                product_id: (*product).to_string(),
                variant_id: (*variant).to_string(),
                quantity: *quantity,
            })
            .collect();
        state.carts.insert(
            id.clone(),
            CartRecord {
                customer_id: customer_id.map(str::to_string),
                lines,
            },
        );
        id
    }

    /// Forget a cart, as the server does when a cart expires.
    pub fn expire(&self, cart_id: &str) {
        self.lock().carts.remove(cart_id);
    }

    /// `(product_id, variant_id, quantity)` of every line in a cart.
    #[must_use]
    pub fn lines(&self, cart_id: &str) -> Vec<(String, String, u32)> {
        self.lock()
            .carts
            .get(cart_id)
            .map(|cart| {
                cart.lines
                    .iter()
                    .map(|l| (l.product_id.clone(), l.variant_id.clone(), l.quantity))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Owner of a cart.
    #[must_use]
    pub fn customer_of(&self, cart_id: &str) -> Option<String> {
        self.lock()
            .carts
            .get(cart_id)
            .and_then(|cart| cart.customer_id.clone())
    }

    /// Number of carts created through `POST /carts`.
    #[must_use]
    pub fn creates(&self) -> usize {
        self.lock().creates
    }

    /// `"METHOD path"` of every request received, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }
}

// =============================================================================
// Routes
// =============================================================================

fn router(state: Shared) -> Router {
    let api = Router::new()
        .route("/carts", post(create_cart))
        .route("/carts/{id}", get(get_cart))
        .route("/carts/{id}/items", post(add_item))
        .route("/customers/{customer_id}/cart", get(get_customer_cart))
        .route(
            "/cart-items/{item_id}",
            patch(update_item).delete(remove_item),
        )
        .route("/products/{id}", get(get_product))
        .with_state(state);

    Router::new().nest("/api", api)
}

fn ok(status: StatusCode, data: Value) -> Response {
    (status, Json(Envelope::ok(data))).into_response()
}

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(Envelope::<Value>::failure(message))).into_response()
}

/// Record the request and apply the token check and failure mode.
async fn gate(state: &Shared, headers: &HeaderMap, request: String) -> Result<(), Response> {
    let (mode, token) = {
        let mut guard = state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.requests.push(request);
        (guard.mode, guard.token.clone())
    };

    if let Some(token) = token {
        let expected = format!("Bearer {token}");
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if presented != Some(expected.as_str()) {
            return Err(fail(StatusCode::UNAUTHORIZED, "Invalid token"));
        }
    }

    match mode {
        Mode::Up => Ok(()),
        Mode::Down => Err((StatusCode::SERVICE_UNAVAILABLE, "upstream unavailable").into_response()),
        Mode::Rejecting => Err(fail(StatusCode::OK, "Cart service is rejecting requests")),
        Mode::Slow(delay) => {
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}

fn with_state<T>(state: &Shared, f: impl FnOnce(&mut FakeState) -> T) -> T {
    f(&mut state
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner))
}

#[derive(Deserialize)]
struct CreateBody {
    #[serde(default)]
    customer_id: Option<String>,
}

async fn create_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<CreateBody>,
) -> Response {
    if let Err(response) = gate(&state, &headers, "POST /carts".to_string()).await {
        return response;
    }
    with_state(&state, |s| {
        if s.fail_create {
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "Cart creation disabled");
        }
        let id = s.next_id("cart");
        s.carts.insert(
            id.clone(),
            CartRecord {
                customer_id: body.customer_id,
                lines: Vec::new(),
            },
        );
        s.creates += 1;
        s.cart_json(&id)
            .map_or_else(|| fail(StatusCode::INTERNAL_SERVER_ERROR, "lost cart"), |cart| {
                ok(StatusCode::CREATED, cart)
            })
    })
}

async fn get_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = gate(&state, &headers, format!("GET /carts/{id}")).await {
        return response;
    }
    with_state(&state, |s| match s.cart_json(&id) {
        Some(cart) => ok(StatusCode::OK, cart),
        None => fail(StatusCode::NOT_FOUND, "Cart not found"),
    })
}

async fn get_customer_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(customer_id): Path<String>,
) -> Response {
    if let Err(response) =
        gate(&state, &headers, format!("GET /customers/{customer_id}/cart")).await
    {
        return response;
    }
    with_state(&state, |s| {
        let id = s
            .carts
            .iter()
            .find(|(_, cart)| cart.customer_id.as_deref() == Some(customer_id.as_str()))
            .map(|(id, _)| id.clone());
        match id.and_then(|id| s.cart_json(&id)) {
            Some(cart) => ok(StatusCode::OK, cart),
            None => fail(StatusCode::NOT_FOUND, "Customer has no cart"),
        }
    })
}

#[derive(Deserialize)]
struct AddBody {
    product_id: String,
    variant_id: String,
    quantity: u32,
}

async fn add_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<AddBody>,
) -> Response {
    if let Err(response) = gate(&state, &headers, format!("POST /carts/{id}/items")).await {
        return response;
    }
    if body.quantity == 0 {
        return fail(StatusCode::BAD_REQUEST, "Quantity must be positive");
    }
    with_state(&state, |s| {
        let line_id = s.next_id("line");
        let Some(cart) = s.carts.get_mut(&id) else {
            return fail(StatusCode::NOT_FOUND, "Cart not found");
        };
        match cart
            .lines
            .iter_mut()
            .find(|l| l.product_id == body.product_id && l.variant_id == body.variant_id)
        {
            Some(line) => line.quantity += body.quantity,
            None => cart.lines.push(Line {
                id: line_id,
                product_id: body.product_id,
                variant_id: body.variant_id,
                quantity: body.quantity,
            }),
        }
        s.cart_json(&id)
            .map_or_else(|| fail(StatusCode::NOT_FOUND, "Cart not found"), |cart| {
                ok(StatusCode::OK, cart)
            })
    })
}

#[derive(Deserialize)]
struct UpdateBody {
    quantity: u32,
}

async fn update_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
    Json(body): Json<UpdateBody>,
) -> Response {
    if let Err(response) = gate(&state, &headers, format!("PATCH /cart-items/{item_id}")).await {
        return response;
    }
    if body.quantity == 0 {
        return fail(StatusCode::BAD_REQUEST, "Quantity must be positive");
    }
    with_state(&state, |s| match s.find_line_mut(&item_id) {
        Some(line) => {
            line.quantity = body.quantity;
            ok(StatusCode::OK, json!({ "id": item_id, "quantity": body.quantity }))
        }
        None => fail(StatusCode::NOT_FOUND, "Cart item not found"),
    })
}

async fn remove_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
) -> Response {
    if let Err(response) = gate(&state, &headers, format!("DELETE /cart-items/{item_id}")).await {
        return response;
    }
    with_state(&state, |s| {
        let before: usize = s.carts.values().map(|c| c.lines.len()).sum();
        for cart in s.carts.values_mut() {
            cart.lines.retain(|l| l.id != item_id);
        }
        let after: usize = s.carts.values().map(|c| c.lines.len()).sum();
        if before == after {
            fail(StatusCode::NOT_FOUND, "Cart item not found")
        } else {
            ok(StatusCode::OK, Value::Null)
        }
    })
}

async fn get_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = gate(&state, &headers, format!("GET /products/{id}")).await {
        return response;
    }
    with_state(&state, |s| match s.products.get(&id) {
        Some(product) => ok(StatusCode::OK, product.clone()),
        None => fail(StatusCode::NOT_FOUND, "Product not found"),
    })
}
