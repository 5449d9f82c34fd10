//! Cart line item types.
//!
//! A [`CartLineItem`] is the unit the client-side cart store works with. It
//! carries identity, the (product, variant) pair, a positive quantity and the
//! unit price captured when the item was added.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CartItemId, ProductId, VariantId};
use super::quantity::Quantity;

/// One (product, variant, quantity, price) tuple in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Line item identity. Unique within a cart.
    pub id: CartItemId,
    /// Product reference.
    pub product_id: ProductId,
    /// Variant reference (size/color combination).
    pub variant_id: VariantId,
    /// Number of units, always at least one.
    pub quantity: Quantity,
    /// Unit price captured at add time.
    price: Decimal,
    /// Product display data, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductSummary>,
    /// Variant display data, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantSummary>,
}

impl CartLineItem {
    /// Create a line item without display metadata.
    #[must_use]
    pub const fn new(
        id: CartItemId,
        product_id: ProductId,
        variant_id: VariantId,
        quantity: Quantity,
        price: Decimal,
    ) -> Self {
        Self {
            id,
            product_id,
            variant_id,
            quantity,
            price,
            product: None,
            variant: None,
        }
    }

    /// Attach product display data.
    #[must_use]
    pub fn with_product(mut self, product: ProductSummary) -> Self {
        self.product = Some(product);
        self
    }

    /// Attach variant display data.
    #[must_use]
    pub fn with_variant(mut self, variant: VariantSummary) -> Self {
        self.variant = Some(variant);
        self
    }

    /// Unit price captured when the item was added.
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    /// Line subtotal (`price × quantity`).
    ///
    /// Saturates at `Decimal::MAX` / `Decimal::MIN` instead of overflowing.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.price
            .saturating_mul(Decimal::from(self.quantity.get()))
    }
}

/// Product fields shown next to a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    /// Product ID.
    pub id: ProductId,
    /// Product name.
    pub name: String,
    /// URL slug.
    pub slug: String,
    /// Primary image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Variant fields shown next to a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSummary {
    /// Variant ID.
    pub id: VariantId,
    /// Size label (e.g., "M").
    pub size: String,
    /// Color label.
    pub color: String,
    /// Units in stock.
    pub stock_quantity: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(qty: u32, price: i64) -> CartLineItem {
        CartLineItem::new(
            CartItemId::new(1),
            ProductId::new(10),
            VariantId::new(100),
            Quantity::new(qty).unwrap(),
            Decimal::new(price, 0),
        )
    }

    #[test]
    fn test_subtotal() {
        assert_eq!(item(3, 100).subtotal(), Decimal::new(300, 0));
    }

    #[test]
    fn test_subtotal_fractional_price() {
        let line = CartLineItem::new(
            CartItemId::new(1),
            ProductId::new(1),
            VariantId::new(1),
            Quantity::new(3).unwrap(),
            Decimal::new(1999, 2),
        );
        assert_eq!(line.subtotal(), Decimal::new(5997, 2));
    }

    #[test]
    fn test_subtotal_saturates() {
        let line = CartLineItem::new(
            CartItemId::new(1),
            ProductId::new(1),
            VariantId::new(1),
            Quantity::new(3).unwrap(),
            Decimal::MAX,
        );
        assert_eq!(line.subtotal(), Decimal::MAX);

        let refund = CartLineItem::new(
            CartItemId::new(2),
            ProductId::new(1),
            VariantId::new(1),
            Quantity::new(3).unwrap(),
            Decimal::MIN,
        );
        assert_eq!(refund.subtotal(), Decimal::MIN);
    }

    #[test]
    fn test_serialization_skips_missing_metadata() {
        let json = serde_json::to_value(item(2, 50)).unwrap();
        assert!(json.get("product").is_none());
        assert!(json.get("variant").is_none());
        assert_eq!(json["quantity"], 2);
    }

    #[test]
    fn test_deserialize_rejects_zero_quantity() {
        let json = r#"{"id":1,"product_id":2,"variant_id":3,"quantity":0,"price":"10"}"#;
        assert!(serde_json::from_str::<CartLineItem>(json).is_err());
    }
}
