//! Cart endpoints.
//!
//! Each call returns the server's cart after the change. Reconciling the
//! local store with that snapshot is the caller's job (see
//! [`crate::sync::CartSession`]).

use fashion_shop_core::{CartItemId, ProductId, Quantity, VariantId};
use tracing::instrument;

use super::types::{AddToCartRequest, CartSnapshot, UpdateCartItemRequest, endpoints};
use super::{ApiClient, ApiError};

/// Remote cart operations. Not cached - the cart is mutable server state.
#[derive(Debug, Clone)]
pub struct CartService {
    client: ApiClient,
}

impl CartService {
    /// Create a cart service over `client`.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Fetch the current authoritative cart.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`/`Unauthorized` per the remote response, or any
    /// other transport, status or payload error.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<CartSnapshot, ApiError> {
        self.client.get(endpoints::CART).await
    }

    /// Add units of a product variant to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it
    /// (e.g. insufficient stock).
    #[instrument(skip(self), fields(product_id = %product_id, variant_id = %variant_id, quantity = %quantity))]
    pub async fn add_to_cart(
        &self,
        product_id: ProductId,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, ApiError> {
        let body = AddToCartRequest {
            product_id,
            variant_id,
            quantity,
        };
        self.client.post(endpoints::CART_ITEMS, &body).await
    }

    /// Set the quantity of one cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the line does not exist.
    #[instrument(skip(self), fields(item_id = %id, quantity = %quantity))]
    pub async fn update_cart_item(
        &self,
        id: CartItemId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, ApiError> {
        let body = UpdateCartItemRequest { quantity };
        self.client.put(&endpoints::cart_item(id), &body).await
    }

    /// Remove one cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the line does not exist.
    #[instrument(skip(self), fields(item_id = %id))]
    pub async fn remove_cart_item(&self, id: CartItemId) -> Result<CartSnapshot, ApiError> {
        self.client.delete(&endpoints::cart_item(id)).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<CartSnapshot, ApiError> {
        self.client.post_empty(endpoints::CLEAR_CART).await
    }
}
