//! Wire types for the shop REST API.
//!
//! Money fields travel as JSON numbers and are held as [`Decimal`].

use chrono::{DateTime, Utc};
use fashion_shop_core::{CartId, CartItemId, ProductId, Quantity, UserId, VariantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Envelope
// =============================================================================

/// Response envelope used by every endpoint.
///
/// Successful responses carry `data`; failures carry `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Success marker, when the backend sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Wrap a payload.
    #[must_use]
    pub const fn data(data: T) -> Self {
        Self {
            success: None,
            message: None,
            data: Some(data),
            error: None,
        }
    }

    /// Build an error envelope.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: None,
            message: None,
            data: None,
            error: Some(message.into()),
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The server's authoritative cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Cart ID.
    pub id: CartId,
    /// Owning user.
    pub user_id: UserId,
    /// Line items.
    #[serde(default)]
    pub items: Vec<CartItemSnapshot>,
    /// Sum of line subtotals.
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    /// Amount due (subtotal plus any shipping or tax the server applies).
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    /// Total units across all lines.
    pub item_count: u64,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A line in the server's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemSnapshot {
    /// Line item ID.
    pub id: CartItemId,
    /// Owning cart.
    pub cart_id: CartId,
    /// Product reference.
    pub product_id: ProductId,
    /// Variant reference.
    pub variant_id: VariantId,
    /// Units. The backend guarantees at least one; conversion re-checks.
    pub quantity: u32,
    /// Unit price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// `price × quantity`.
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    /// Embedded product.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductPayload>,
    /// Embedded variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantPayload>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Product as embedded in a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPayload {
    /// Product ID.
    pub id: ProductId,
    /// Product name.
    pub name: String,
    /// URL slug.
    #[serde(default)]
    pub slug: String,
    /// Product images.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ProductImagePayload>,
}

/// Product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImagePayload {
    /// Absolute or upload-relative image URL.
    pub image_url: String,
    /// Whether this is the product's main image.
    #[serde(default)]
    pub is_primary: bool,
}

/// Variant as embedded in a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantPayload {
    /// Variant ID.
    pub id: VariantId,
    /// Size label.
    #[serde(default)]
    pub size: String,
    /// Color label.
    #[serde(default)]
    pub color: String,
    /// Units in stock.
    #[serde(default)]
    pub stock_quantity: i64,
}

// =============================================================================
// Requests
// =============================================================================

/// Body for `POST /cart/items`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToCartRequest {
    /// Product to add.
    pub product_id: ProductId,
    /// Variant to add.
    pub variant_id: VariantId,
    /// Units to add.
    pub quantity: Quantity,
}

/// Body for `PUT /cart/items/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCartItemRequest {
    /// New quantity.
    pub quantity: Quantity,
}

/// Endpoint paths, relative to the API base URL.
pub mod endpoints {
    use fashion_shop_core::CartItemId;

    /// Current user's cart.
    pub const CART: &str = "/cart";

    /// Cart line collection.
    pub const CART_ITEMS: &str = "/cart/items";

    /// Empty the cart.
    pub const CLEAR_CART: &str = "/cart/clear";

    /// A single cart line.
    #[must_use]
    pub fn cart_item(id: CartItemId) -> String {
        format!("/cart/items/{id}")
    }
}
