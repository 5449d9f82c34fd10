//! Conversions from wire types to client cart types.

use fashion_shop_core::{CartLineItem, ProductSummary, Quantity, VariantSummary};

use super::ApiError;
use super::types::{CartItemSnapshot, CartSnapshot, ProductPayload, VariantPayload};

impl CartSnapshot {
    /// Convert the server's lines into local line items, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] if a line has a zero quantity.
    pub fn to_line_items(&self) -> Result<Vec<CartLineItem>, ApiError> {
        self.items.iter().map(convert_cart_item).collect()
    }
}

/// Convert a server cart line to a local line item.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] if the line has a zero quantity.
pub fn convert_cart_item(item: &CartItemSnapshot) -> Result<CartLineItem, ApiError> {
    let quantity = Quantity::new(item.quantity).map_err(|_| {
        ApiError::Validation(format!("cart item {} has zero quantity", item.id))
    })?;

    let mut line = CartLineItem::new(
        item.id,
        item.product_id,
        item.variant_id,
        quantity,
        item.price,
    );
    line.product = item.product.as_ref().map(convert_product);
    line.variant = item.variant.as_ref().map(convert_variant);
    Ok(line)
}

fn convert_product(product: &ProductPayload) -> ProductSummary {
    let image_url = product
        .images
        .iter()
        .find(|img| img.is_primary)
        .or_else(|| product.images.first())
        .map(|img| img.image_url.clone());

    ProductSummary {
        id: product.id,
        name: product.name.clone(),
        slug: product.slug.clone(),
        image_url,
    }
}

fn convert_variant(variant: &VariantPayload) -> VariantSummary {
    VariantSummary {
        id: variant.id,
        size: variant.size.clone(),
        color: variant.color.clone(),
        stock_quantity: variant.stock_quantity,
    }
}
