//! Cart session: the reconciliation point between the local store and the
//! server cart.
//!
//! Every successful remote call replaces the local items with the server's
//! snapshot. Failures are returned unchanged. The loading flag stays set
//! while any call of the session (or its clones) is in flight, and is reset
//! when the last one finishes or is dropped. Nothing is retried and nothing
//! is rolled back here - an optimistic caller that wants to revert does so
//! itself.

use std::sync::{Arc, Mutex, PoisonError};

use fashion_shop_core::{CartItemId, CartLineItem, ProductId, Quantity, VariantId};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::api::{ApiError, CartService, CartSnapshot};
use crate::store::CartStore;

/// Aggregates shown in a cart summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSummary {
    /// Total units.
    pub item_count: u64,
    /// Sum of line subtotals.
    pub subtotal: Decimal,
    /// Amount due. Equal to the subtotal; shipping and tax are applied at
    /// checkout.
    pub total: Decimal,
}

/// Couples a [`CartStore`] with the remote [`CartService`].
#[derive(Debug, Clone)]
pub struct CartSession {
    store: CartStore,
    service: CartService,
    in_flight: Arc<Mutex<usize>>,
}

/// Keeps the store's loading flag set while alive.
struct InFlight<'a> {
    session: &'a CartSession,
}

impl<'a> InFlight<'a> {
    fn start(session: &'a CartSession) -> Self {
        let mut count = session
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *count += 1;
        session.store.set_loading(true);
        Self { session }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut count = self
            .session
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.session.store.set_loading(false);
        }
    }
}

impl CartSession {
    /// Create a session over an existing store and service.
    #[must_use]
    pub fn new(store: CartStore, service: CartService) -> Self {
        Self {
            store,
            service,
            in_flight: Arc::new(Mutex::new(0)),
        }
    }

    /// The local cart store.
    #[must_use]
    pub const fn store(&self) -> &CartStore {
        &self.store
    }

    /// Totals computed from the local store.
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        let state = self.store.state();
        let subtotal = state.total_price();
        CartSummary {
            item_count: state.total_items(),
            subtotal,
            total: subtotal,
        }
    }

    /// Fetch the server cart and replace local state with it.
    ///
    /// Anonymous sessions have no server cart: the local cart is cleared and
    /// `Ok(None)` is returned.
    ///
    /// # Errors
    ///
    /// Returns the remote failure unchanged; local items are left as they were.
    #[instrument(skip(self))]
    pub async fn refresh(&self, authenticated: bool) -> Result<Option<CartSnapshot>, ApiError> {
        if !authenticated {
            self.store.clear_cart();
            return Ok(None);
        }

        self.reconcile(self.service.get_cart()).await.map(Some)
    }

    /// Add units of a variant on the server, then reconcile.
    ///
    /// # Errors
    ///
    /// Returns the remote failure unchanged; local items are left as they were.
    #[instrument(skip(self), fields(product_id = %product_id, variant_id = %variant_id))]
    pub async fn add_to_cart(
        &self,
        product_id: ProductId,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, ApiError> {
        self.reconcile(self.service.add_to_cart(product_id, variant_id, quantity))
            .await
    }

    /// Apply `item` locally first, then add it on the server and reconcile.
    ///
    /// On failure the optimistic local change is kept and the error returned;
    /// reverting is up to the caller.
    ///
    /// # Errors
    ///
    /// Returns the remote failure unchanged.
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn add_item_optimistic(&self, item: CartLineItem) -> Result<CartSnapshot, ApiError> {
        let (product_id, variant_id, quantity) = (item.product_id, item.variant_id, item.quantity);
        self.store.add_item(item);
        self.add_to_cart(product_id, variant_id, quantity).await
    }

    /// Change a line's quantity on the server, then reconcile.
    ///
    /// # Errors
    ///
    /// Returns the remote failure unchanged; local items are left as they were.
    #[instrument(skip(self), fields(item_id = %id))]
    pub async fn update_cart_item(
        &self,
        id: CartItemId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, ApiError> {
        self.reconcile(self.service.update_cart_item(id, quantity))
            .await
    }

    /// Remove a line on the server, then reconcile.
    ///
    /// # Errors
    ///
    /// Returns the remote failure unchanged; local items are left as they were.
    #[instrument(skip(self), fields(item_id = %id))]
    pub async fn remove_cart_item(&self, id: CartItemId) -> Result<CartSnapshot, ApiError> {
        self.reconcile(self.service.remove_cart_item(id)).await
    }

    /// Empty the server cart, then the local one.
    ///
    /// # Errors
    ///
    /// Returns the remote failure unchanged; local items are left as they were.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<CartSnapshot, ApiError> {
        let loading = InFlight::start(self);
        let result = self.service.clear_cart().await;
        if result.is_ok() {
            self.store.clear_cart();
        }
        drop(loading);
        log_outcome("clear", &result);
        result
    }

    /// Run a remote call with the loading flag set and adopt its snapshot.
    async fn reconcile<F>(&self, call: F) -> Result<CartSnapshot, ApiError>
    where
        F: Future<Output = Result<CartSnapshot, ApiError>>,
    {
        let loading = InFlight::start(self);
        let result = call.await.and_then(|snapshot| {
            let items = snapshot.to_line_items()?;
            self.store.set_items(items);
            Ok(snapshot)
        });
        drop(loading);
        log_outcome("reconcile", &result);
        result
    }
}

fn log_outcome(operation: &str, result: &Result<CartSnapshot, ApiError>) {
    match result {
        Ok(snapshot) => info!(
            operation,
            cart_id = %snapshot.id,
            item_count = snapshot.item_count,
            "Cart reconciled with server"
        ),
        Err(e) => warn!(operation, error = %e, "Cart operation failed"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use url::Url;

    use super::*;
    use crate::api::ApiClient;
    use crate::config::ApiConfig;

    /// A session whose backend address refuses connections.
    fn offline_session() -> CartSession {
        let api = ApiClient::new(&ApiConfig {
            base_url: Url::parse("http://127.0.0.1:9/api/v1").unwrap(),
            token: None,
            timeout: Duration::from_secs(2),
        })
        .unwrap();
        CartSession::new(CartStore::new(), CartService::new(api))
    }

    fn item(id: u32, qty: u32, price: i64) -> CartLineItem {
        CartLineItem::new(
            CartItemId::new(id),
            ProductId::new(1),
            VariantId::new(id),
            Quantity::new(qty).unwrap(),
            Decimal::new(price, 0),
        )
    }

    #[test]
    fn test_summary_from_local_store() {
        let session = offline_session();
        session.store().add_item(item(1, 2, 100));
        session.store().add_item(item(2, 1, 50));

        let summary = session.summary();
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.subtotal, Decimal::new(250, 0));
        assert_eq!(summary.total, summary.subtotal);
    }

    #[test]
    fn test_loading_held_until_last_call_finishes() {
        let session = offline_session();
        let clone = session.clone();
        let first = InFlight::start(&session);
        let second = InFlight::start(&clone);
        assert!(session.store().is_loading());

        drop(first);
        assert!(session.store().is_loading());

        drop(second);
        assert!(!session.store().is_loading());
    }

    #[tokio::test]
    async fn test_overlapping_calls_reset_loading_once_both_finish() {
        let session = offline_session();
        let other = session.clone();

        let (a, b) = tokio::join!(
            session.remove_cart_item(CartItemId::new(1)),
            other.update_cart_item(CartItemId::new(2), Quantity::ONE),
        );

        assert!(a.is_err() && b.is_err());
        assert!(!session.store().is_loading());
        assert_eq!(*session.in_flight.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refresh_anonymous_clears_local_cart() {
        let session = offline_session();
        session.store().add_item(item(1, 2, 100));

        let result = session.refresh(false).await.unwrap();

        assert!(result.is_none());
        assert!(session.store().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_local_state() {
        let session = offline_session();
        session.store().add_item(item(1, 2, 100));
        let before = session.store().items();

        let err = session
            .update_cart_item(CartItemId::new(1), Quantity::new(5).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Http(_)));
        assert_eq!(session.store().items(), before);
        assert!(!session.store().is_loading());
    }

    #[tokio::test]
    async fn test_optimistic_add_is_kept_on_failure() {
        let session = offline_session();

        let result = session.add_item_optimistic(item(4, 1, 30)).await;

        assert!(result.is_err());
        assert_eq!(session.store().len(), 1);
        assert!(!session.store().is_loading());
    }
}
