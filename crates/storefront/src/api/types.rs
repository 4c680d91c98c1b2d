//! Wire types for the remote cart API.
//!
//! Every response is wrapped in an [`Envelope`]. A 200 response can still
//! carry `success: false`, so callers go through [`Envelope::into_data`]
//! rather than trusting the HTTP status alone.

use serde::{Deserialize, Serialize};

use storefront_cart_core::{
    Cart, CartId, CartItem, CustomerId, LineItemId, Price, ProductId, Quantity, VariantId,
};

use super::RemoteError;

// =============================================================================
// Envelope
// =============================================================================

/// Uniform `{ success, message, data }` response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Whether the backend considers the call successful.
    pub success: bool,
    /// Human-readable detail, usually present on failure.
    #[serde(default)]
    pub message: Option<String>,
    /// Payload, when the call returns one.
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// A successful envelope carrying `data`.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// A failed envelope with a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }

    /// Unwrap the payload, turning `success: false` into an error.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Rejected` when `success` is false.
    pub fn into_data(self) -> Result<Option<T>, RemoteError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(RemoteError::Rejected(
                self.message
                    .unwrap_or_else(|| "request rejected without a message".to_string()),
            ))
        }
    }
}

// =============================================================================
// Cart Types
// =============================================================================

/// A cart line as stored by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLine {
    /// Server-assigned line ID.
    pub id: LineItemId,
    /// Product on the line.
    pub product_id: ProductId,
    /// Variant on the line.
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    /// Quantity. Lines reported with 0 are dropped on conversion.
    pub quantity: u32,
    /// Product title.
    #[serde(default)]
    pub title: Option<String>,
    /// Unit price.
    #[serde(default)]
    pub unit_price: Option<Price>,
}

/// A cart as returned by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCart {
    /// Server-issued cart ID.
    pub id: CartId,
    /// Owning customer, if any.
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    /// Lines in server order.
    #[serde(default)]
    pub items: Vec<RemoteLine>,
}

impl RemoteCart {
    /// Convert the remote lines into cart items, dropping zero-quantity lines.
    #[must_use]
    pub fn cart_items(&self) -> Vec<CartItem> {
        self.items.iter().filter_map(RemoteLine::to_cart_item).collect()
    }

    /// Convert into a synced cart.
    #[must_use]
    pub fn into_cart(self) -> Cart {
        let items = self.cart_items();
        Cart::Synced {
            id: self.id,
            customer: self.customer_id,
            items,
        }
    }
}

impl RemoteLine {
    fn to_cart_item(&self) -> Option<CartItem> {
        let quantity = Quantity::new(self.quantity).ok()?;
        Some(CartItem {
            product: self.product_id.clone(),
            variant: self.variant_id.clone(),
            quantity,
            item_id: Some(self.id.clone()),
            title: self.title.clone(),
            unit_price: self.unit_price,
        })
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

/// A line to add to a remote cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInput {
    /// Product to add.
    pub product: ProductId,
    /// Resolved variant.
    pub variant: VariantId,
    /// Units to add.
    pub quantity: Quantity,
}

/// `POST /carts` body.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCartRequest {
    /// Customer to associate the cart with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
}

/// `POST /carts/{id}/items` body.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddItemRequest {
    /// Product to add.
    pub product_id: ProductId,
    /// Variant to add.
    pub variant_id: VariantId,
    /// Units to add.
    pub quantity: u32,
}

impl From<&LineInput> for AddItemRequest {
    fn from(line: &LineInput) -> Self {
        Self {
            product_id: line.product.clone(),
            variant_id: line.variant.clone(),
            quantity: line.quantity.get(),
        }
    }
}

/// `PATCH /cart-items/{id}` body.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateItemRequest {
    /// New quantity (at least 1; removals use `DELETE`).
    pub quantity: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_success_false_with_data_is_rejected() {
        let envelope: Envelope<RemoteCart> = serde_json::from_str(
            r#"{"success":false,"message":"cart expired","data":{"id":"c1","items":[]}}"#,
        )
        .unwrap();
        let err = envelope.into_data().unwrap_err();
        assert_eq!(err.to_string(), "Request rejected: cart expired");
    }

    #[test]
    fn test_envelope_without_message() {
        let envelope: Envelope<()> = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert!(matches!(envelope.into_data(), Err(RemoteError::Rejected(_))));
    }

    #[test]
    fn test_envelope_success_without_data() {
        let envelope: Envelope<RemoteCart> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(envelope.into_data().unwrap().is_none());
    }

    #[test]
    fn test_remote_cart_drops_zero_quantity_lines() {
        let cart: RemoteCart = serde_json::from_str(
            r#"{
                "id": "c1",
                "customer_id": "cust-7",
                "items": [
                    {"id": "l1", "product_id": "p1", "variant_id": "v1", "quantity": 2},
                    {"id": "l2", "product_id": "p2", "quantity": 0}
                ]
            }"#,
        )
        .unwrap();

        let Cart::Synced { id, customer, items } = cart.into_cart() else {
            panic!("remote cart must convert to a synced cart");
        };
        assert_eq!(id.as_str(), "c1");
        assert_eq!(customer.unwrap().as_str(), "cust-7");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity.get(), 2);
        assert_eq!(items[0].item_id.as_ref().unwrap().as_str(), "l1");
    }

    #[test]
    fn test_create_cart_request_omits_missing_customer() {
        let body = serde_json::to_string(&CreateCartRequest { customer_id: None }).unwrap();
        assert_eq!(body, "{}");
    }
}
