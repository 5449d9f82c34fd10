//! Cart commands.
//!
//! Every remote command reconciles the local cart with the server's answer
//! and prints the resulting cart. `local` reads the persisted cart only.

use std::fmt::Write as _;

use fashion_shop_client::config::ClientConfig;
use fashion_shop_client::error::AppError;
use fashion_shop_client::state::AppState;
use fashion_shop_core::{CartItemId, CartLineItem, CurrencyCode, Price, ProductId, Quantity, VariantId};
use rust_decimal::Decimal;

/// Fetch the server cart and print it.
///
/// Without a token there is no server cart; the local cart is cleared.
pub async fn show(state: &AppState) -> Result<(), AppError> {
    let authenticated = state.is_authenticated();
    if !authenticated {
        tracing::warn!("SHOP_API_TOKEN not set, clearing local cart");
    }
    state.cart().refresh(authenticated).await?;
    print_cart(state);
    Ok(())
}

/// Print the persisted local cart.
pub fn local(state: &AppState) {
    print_cart(state);
}

/// Add units of a product variant.
pub async fn add(
    state: &AppState,
    product: u32,
    variant: u32,
    quantity: u32,
) -> Result<(), AppError> {
    let quantity = parse_quantity(quantity)?;
    state
        .cart()
        .add_to_cart(ProductId::new(product), VariantId::new(variant), quantity)
        .await?;
    print_cart(state);
    Ok(())
}

/// Set a line's quantity. A quantity of zero removes the line.
pub async fn update(state: &AppState, id: u32, quantity: u32) -> Result<(), AppError> {
    let id = CartItemId::new(id);
    match Quantity::new(quantity) {
        Ok(quantity) => state.cart().update_cart_item(id, quantity).await?,
        Err(_) => state.cart().remove_cart_item(id).await?,
    };
    print_cart(state);
    Ok(())
}

/// Remove a line.
pub async fn remove(state: &AppState, id: u32) -> Result<(), AppError> {
    state.cart().remove_cart_item(CartItemId::new(id)).await?;
    print_cart(state);
    Ok(())
}

/// Empty the cart.
pub async fn clear(state: &AppState) -> Result<(), AppError> {
    state.cart().clear_cart().await?;
    print_cart(state);
    Ok(())
}

/// Delete the persisted local cart.
#[allow(clippy::print_stdout)]
pub fn reset(config: &ClientConfig) -> Result<(), AppError> {
    AppState::reset_local(config)?;
    println!("Local cart removed");
    Ok(())
}

fn parse_quantity(quantity: u32) -> Result<Quantity, AppError> {
    Quantity::new(quantity).map_err(|e| AppError::BadRequest(e.to_string()))
}

#[allow(clippy::print_stdout)]
fn print_cart(state: &AppState) {
    let store = state.cart().store();
    print!(
        "{}",
        render_cart(&store.items(), store.total_price(), state.config().currency)
    );
}

/// Render cart lines and totals as a plain-text table.
fn render_cart(items: &[CartLineItem], total: Decimal, currency: CurrencyCode) -> String {
    if items.is_empty() {
        return "Cart is empty\n".to_string();
    }

    let mut out = String::new();
    let mut units: u64 = 0;
    for item in items {
        units += u64::from(item.quantity.get());
        let name = item
            .product
            .as_ref()
            .map_or_else(|| format!("Product {}", item.product_id), |p| p.name.clone());
        let variant = item
            .variant
            .as_ref()
            .map_or_else(|| format!("variant {}", item.variant_id), |v| format!("{} / {}", v.size, v.color));
        let _ = writeln!(
            out,
            "#{:<6} {name} ({variant})  {} x {} = {}",
            item.id,
            item.quantity,
            Price::new(item.price(), currency).display(),
            Price::new(item.subtotal(), currency).display(),
        );
    }
    let _ = writeln!(
        out,
        "{units} item(s), total {}",
        Price::new(total, currency).display()
    );
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fashion_shop_core::{ProductSummary, VariantSummary};

    use super::*;

    #[test]
    fn test_render_empty_cart() {
        assert_eq!(
            render_cart(&[], Decimal::ZERO, CurrencyCode::VND),
            "Cart is empty\n"
        );
    }

    #[test]
    fn test_render_lines_and_total() {
        let items = vec![
            CartLineItem::new(
                CartItemId::new(41),
                ProductId::new(3),
                VariantId::new(12),
                Quantity::new(2).unwrap(),
                Decimal::new(250_000, 0),
            )
            .with_product(ProductSummary {
                id: ProductId::new(3),
                name: "Linen Shirt".to_string(),
                slug: "linen-shirt".to_string(),
                image_url: None,
            })
            .with_variant(VariantSummary {
                id: VariantId::new(12),
                size: "M".to_string(),
                color: "White".to_string(),
                stock_quantity: 8,
            }),
            CartLineItem::new(
                CartItemId::new(42),
                ProductId::new(5),
                VariantId::new(20),
                Quantity::ONE,
                Decimal::new(99_000, 0),
            ),
        ];

        let out = render_cart(&items, Decimal::new(599_000, 0), CurrencyCode::VND);

        assert!(out.contains("Linen Shirt (M / White)"));
        assert!(out.contains("2 x 250.000 ₫ = 500.000 ₫"));
        assert!(out.contains("Product 5 (variant 20)"));
        assert!(out.ends_with("3 item(s), total 599.000 ₫\n"));
    }

    #[test]
    fn test_parse_quantity_rejects_zero() {
        assert!(matches!(parse_quantity(0), Err(AppError::BadRequest(_))));
        assert_eq!(parse_quantity(3).unwrap().get(), 3);
    }
}
