//! `reqwest` implementation of [`CartBackend`].

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use storefront_cart_core::{CartId, CustomerId, LineItemId, Product, ProductId, Quantity};

use super::types::{
    AddItemRequest, CreateCartRequest, Envelope, LineInput, RemoteCart, UpdateItemRequest,
};
use super::{CartBackend, RemoteError};
use crate::config::CartApiConfig;

const ERROR_BODY_LIMIT: usize = 200;

// =============================================================================
// HttpCartClient
// =============================================================================

/// Client for the remote cart API.
///
/// Cheap to clone. Every request is bounded by the configured timeout.
/// Product lookups are cached; cart state never is.
#[derive(Clone)]
pub struct HttpCartClient {
    inner: Arc<HttpCartClientInner>,
}

struct HttpCartClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    products: Cache<ProductId, Product>,
}

impl HttpCartClient {
    /// Create a new cart API client.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Http` if the HTTP client cannot be built.
    pub fn new(config: &CartApiConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()?;

        let products = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.product_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(HttpCartClientInner {
                client,
                base_url: config.base_url.clone(),
                token: config.token.clone(),
                products,
            }),
        })
    }

    /// Resolve a route relative to the base URL. Each segment is
    /// percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let path = segments
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Ok(self.inner.base_url.join(&path)?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .inner
            .client
            .request(method, url)
            .header("Accept", "application/json");
        match &self.inner.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and unwrap its envelope.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<T>, RemoteError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(RemoteError::RateLimited(retry_after));
        }

        // Read the body as text first for better error diagnostics
        let response_text = response.text().await.map_err(map_transport_error)?;

        let envelope = match serde_json::from_str::<Envelope<T>>(&response_text) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                tracing::error!(
                    error = %e,
                    body = %truncate(&response_text, 500),
                    "Failed to parse cart API response"
                );
                return Err(RemoteError::Parse(e));
            }
            Err(_) => {
                tracing::warn!(
                    status = %status,
                    body = %truncate(&response_text, 500),
                    "Cart API returned non-success status"
                );
                return Err(non_success(status, &response_text));
            }
        };

        if !envelope.success {
            debug!(status = %status, message = ?envelope.message, "Cart API rejected request");
            if status == StatusCode::NOT_FOUND {
                return Err(RemoteError::NotFound(
                    envelope
                        .message
                        .unwrap_or_else(|| "resource not found".to_string()),
                ));
            }
            return envelope.into_data();
        }

        if !status.is_success() {
            // Envelope says success but the transport disagrees: trust neither.
            return Err(non_success(status, &response_text));
        }

        envelope.into_data()
    }

    async fn execute_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<Option<T>, RemoteError> {
        self.execute(self.request(method, url).json(body)).await
    }
}

#[async_trait]
impl CartBackend for HttpCartClient {
    #[instrument(skip(self, customer), fields(customer = ?customer.map(CustomerId::as_str)))]
    async fn create_cart(&self, customer: Option<&CustomerId>) -> Result<RemoteCart, RemoteError> {
        let body = CreateCartRequest {
            customer_id: customer.cloned(),
        };
        let cart = self
            .execute_json::<_, RemoteCart>(Method::POST, self.url(&["carts"])?, &body)
            .await?
            .ok_or(RemoteError::MissingData("created cart"))?;
        debug!(cart_id = %cart.id, "Created remote cart");
        Ok(cart)
    }

    #[instrument(skip(self, id), fields(cart_id = %id))]
    async fn fetch_cart(&self, id: &CartId) -> Result<RemoteCart, RemoteError> {
        let url = self.url(&["carts", id.as_str()])?;
        self.execute::<RemoteCart>(self.request(Method::GET, url))
            .await?
            .ok_or(RemoteError::MissingData("cart"))
    }

    #[instrument(skip(self, customer), fields(customer = %customer))]
    async fn fetch_customer_cart(&self, customer: &CustomerId) -> Result<RemoteCart, RemoteError> {
        let url = self.url(&["customers", customer.as_str(), "cart"])?;
        self.execute::<RemoteCart>(self.request(Method::GET, url))
            .await?
            .ok_or_else(|| RemoteError::NotFound(format!("cart for customer {customer}")))
    }

    #[instrument(skip(self, cart, line), fields(cart_id = %cart, product = %line.product, quantity = %line.quantity))]
    async fn add_item(&self, cart: &CartId, line: &LineInput) -> Result<(), RemoteError> {
        let url = self.url(&["carts", cart.as_str(), "items"])?;
        self.execute_json::<_, serde_json::Value>(Method::POST, url, &AddItemRequest::from(line))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, item, quantity), fields(item_id = %item, quantity = %quantity))]
    async fn update_item(&self, item: &LineItemId, quantity: Quantity) -> Result<(), RemoteError> {
        let url = self.url(&["cart-items", item.as_str()])?;
        let body = UpdateItemRequest {
            quantity: quantity.get(),
        };
        self.execute_json::<_, serde_json::Value>(Method::PATCH, url, &body)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, item), fields(item_id = %item))]
    async fn remove_item(&self, item: &LineItemId) -> Result<(), RemoteError> {
        let url = self.url(&["cart-items", item.as_str()])?;
        self.execute::<serde_json::Value>(self.request(Method::DELETE, url))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, id), fields(product_id = %id))]
    async fn get_product(&self, id: &ProductId) -> Result<Product, RemoteError> {
        if let Some(product) = self.inner.products.get(id).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let url = self.url(&["products", id.as_str()])?;
        let product = self
            .execute::<Product>(self.request(Method::GET, url))
            .await?
            .ok_or_else(|| RemoteError::NotFound(format!("product {id}")))?;

        self.inner
            .products
            .insert(id.clone(), product.clone())
            .await;

        Ok(product)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn map_transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Http(e)
    }
}

fn non_success(status: StatusCode, body: &str) -> RemoteError {
    if status == StatusCode::NOT_FOUND {
        return RemoteError::NotFound(truncate(body, ERROR_BODY_LIMIT));
    }
    RemoteError::Status {
        status: status.as_u16(),
        body: truncate(body, ERROR_BODY_LIMIT),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
