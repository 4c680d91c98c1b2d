//! Catalog product as seen by the cart.

use serde::{Deserialize, Serialize};

use super::id::{ProductId, VariantId};
use super::price::Price;

/// A purchasable variant of a product (size, color, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    /// Variant ID.
    pub id: VariantId,
    /// Variant title (e.g., "Large / Blue").
    #[serde(default)]
    pub title: String,
    /// Variant price, when it differs from the product price.
    #[serde(default)]
    pub price: Option<Price>,
}

/// A product, carrying only what the cart needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Product title.
    #[serde(default)]
    pub title: String,
    /// Base price. Absent for products the catalog has not priced.
    #[serde(default)]
    pub price: Option<Price>,
    /// Known variants, in catalog order.
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// A product known only by its ID (no catalog data available).
    #[must_use]
    pub fn bare(id: ProductId) -> Self {
        Self {
            id,
            title: String::new(),
            price: None,
            variants: Vec::new(),
        }
    }

    /// The first known variant, if any.
    #[must_use]
    pub fn first_variant(&self) -> Option<&ProductVariant> {
        self.variants.first()
    }

    /// Look up a variant by ID.
    #[must_use]
    pub fn variant(&self, id: &VariantId) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| &v.id == id)
    }

    /// Unit price for the given variant, falling back to the product price.
    #[must_use]
    pub fn unit_price(&self, variant: Option<&VariantId>) -> Option<Price> {
        variant
            .and_then(|id| self.variant(id))
            .and_then(|v| v.price)
            .or(self.price)
    }

    /// Title to show on a cart line, if the catalog provided one.
    #[must_use]
    pub fn display_title(&self) -> Option<String> {
        (!self.title.is_empty()).then(|| self.title.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::CurrencyCode;

    fn product() -> Product {
        Product {
            id: ProductId::parse("prod-1").unwrap(),
            title: "Linen Tee".to_string(),
            price: Some(Price::new(Decimal::new(2000, 2), CurrencyCode::USD)),
            variants: vec![
                ProductVariant {
                    id: VariantId::parse("var-s").unwrap(),
                    title: "Small".to_string(),
                    price: None,
                },
                ProductVariant {
                    id: VariantId::parse("var-xl").unwrap(),
                    title: "XL".to_string(),
                    price: Some(Price::new(Decimal::new(2500, 2), CurrencyCode::USD)),
                },
            ],
        }
    }

    #[test]
    fn test_unit_price_prefers_variant() {
        let p = product();
        let xl = VariantId::parse("var-xl").unwrap();
        let small = VariantId::parse("var-s").unwrap();
        assert_eq!(p.unit_price(Some(&xl)).unwrap().amount, Decimal::new(2500, 2));
        assert_eq!(p.unit_price(Some(&small)).unwrap().amount, Decimal::new(2000, 2));
        assert_eq!(p.unit_price(None).unwrap().amount, Decimal::new(2000, 2));
    }

    #[test]
    fn test_bare_product() {
        let p = Product::bare(ProductId::parse("prod-2").unwrap());
        assert!(p.first_variant().is_none());
        assert!(p.unit_price(None).is_none());
        assert!(p.display_title().is_none());
    }

    #[test]
    fn test_deserialize_minimal() {
        let p: Product = serde_json::from_str(r#"{"id":"prod-3"}"#).unwrap();
        assert_eq!(p.id.as_str(), "prod-3");
        assert!(p.variants.is_empty());
    }
}
