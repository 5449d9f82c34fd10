//! Client-side cart store.
//!
//! # Architecture
//!
//! - [`CartStore`] is an explicitly constructed handle, created at session
//!   start and passed to whoever needs it. Clones share state.
//! - Mutations are synchronous and run to completion under a short lock.
//! - After every mutation that changes the item set, registered
//!   [`CartObserver`]s receive a [`PersistedCart`] snapshot. Persistence is
//!   one such observer ([`CartPersistence`]), so the storage backend is
//!   swappable without touching mutation logic.
//! - Totals are derived on every call, never cached.
//!
//! # Example
//!
//! ```rust,ignore
//! let store = CartStore::load(Arc::new(FileStorage::new(".shop")))?;
//! store.add_item(item);
//! let total = store.total_price();
//! ```

mod persist;
mod storage;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fashion_shop_core::{CartItemId, CartLineItem, ProductId, Quantity, VariantId};
use rust_decimal::Decimal;
use tracing::{debug, warn};

pub use persist::{CART_STORAGE_KEY, CartPersistence, PersistedCart};
pub use storage::{CartStorage, FileStorage, MemoryStorage, StorageError};

/// Hook invoked after each mutation that changes the cart's items.
pub trait CartObserver: Send + Sync {
    /// Called with the post-mutation snapshot, outside the state lock.
    ///
    /// Snapshots arrive in mutation order, one at a time. Implementations
    /// must not mutate the store.
    fn on_change(&self, snapshot: &PersistedCart);
}

/// Local cart contents plus the transient loading flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    /// Line items in insertion order. Identities are unique.
    pub items: Vec<CartLineItem>,
    /// Whether a remote cart operation is in flight. Never persisted.
    pub is_loading: bool,
}

impl CartState {
    /// Sum of quantities across all items.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }

    /// Sum of `price × quantity` across all items.
    ///
    /// Saturates at `Decimal::MAX` instead of overflowing.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.items
            .iter()
            .map(CartLineItem::subtotal)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    fn position(&self, id: CartItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }
}

/// Handle to the session's cart.
#[derive(Clone, Default)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

#[derive(Default)]
struct CartStoreInner {
    state: Mutex<CartState>,
    /// Held from snapshot to last notification so observers see snapshots
    /// in mutation order.
    notify: Mutex<()>,
    observers: Vec<Arc<dyn CartObserver>>,
}

impl CartStore {
    /// Create an empty, non-persisted store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with the given observers and initial items.
    #[must_use]
    pub fn with_observers(items: Vec<CartLineItem>, observers: Vec<Arc<dyn CartObserver>>) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                state: Mutex::new(CartState {
                    items: merge_duplicates(items),
                    is_loading: false,
                }),
                notify: Mutex::new(()),
                observers,
            }),
        }
    }

    /// Hydrate from `storage` and persist every later mutation back to it.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read or the stored snapshot is
    /// corrupt.
    pub fn load(storage: Arc<dyn CartStorage>) -> Result<Self, StorageError> {
        let persistence = CartPersistence::new(storage);
        let items = persistence.load()?.unwrap_or_default().items;
        debug!(items = items.len(), "Hydrated cart from storage");
        let observer: Arc<dyn CartObserver> = Arc::new(persistence);
        Ok(Self::with_observers(items, vec![observer]))
    }

    /// Like [`CartStore::load`], but starts empty if the stored snapshot
    /// cannot be read.
    #[must_use]
    pub fn load_or_default(storage: Arc<dyn CartStorage>) -> Self {
        match Self::load(Arc::clone(&storage)) {
            Ok(store) => store,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable cart snapshot");
                let observer: Arc<dyn CartObserver> = Arc::new(CartPersistence::new(storage));
                Self::with_observers(Vec::new(), vec![observer])
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Replace the entire collection, typically with a server snapshot.
    ///
    /// Repeated identities in `items` are merged so identities stay unique.
    pub fn set_items(&self, items: Vec<CartLineItem>) {
        self.mutate(|state| {
            state.items = merge_duplicates(items);
            true
        });
    }

    /// Add an item, merging into an existing entry with the same identity.
    ///
    /// On merge the existing entry keeps its captured price.
    pub fn add_item(&self, item: CartLineItem) {
        self.mutate(|state| {
            match state.position(item.id) {
                Some(index) => {
                    if let Some(existing) = state.items.get_mut(index) {
                        existing.quantity = existing.quantity.saturating_add(item.quantity);
                    }
                }
                None => state.items.push(item),
            }
            true
        });
    }

    /// Set the quantity of an item.
    ///
    /// A quantity of zero removes the item. Unknown ids are ignored.
    pub fn update_item(&self, id: CartItemId, quantity: u32) {
        self.mutate(|state| {
            let Some(index) = state.position(id) else {
                return false;
            };
            match Quantity::new(quantity) {
                Ok(quantity) => match state.items.get_mut(index) {
                    Some(existing) if existing.quantity != quantity => {
                        existing.quantity = quantity;
                        true
                    }
                    _ => false,
                },
                Err(_) => {
                    state.items.remove(index);
                    true
                }
            }
        });
    }

    /// Remove an item. Unknown ids are ignored.
    pub fn remove_item(&self, id: CartItemId) {
        self.mutate(|state| match state.position(id) {
            Some(index) => {
                state.items.remove(index);
                true
            }
            None => false,
        });
    }

    /// Remove every item.
    pub fn clear_cart(&self) {
        self.mutate(|state| {
            state.items.clear();
            true
        });
    }

    /// Set the transient loading flag. Does not notify observers.
    pub fn set_loading(&self, loading: bool) {
        self.lock().is_loading = loading;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Sum of quantities across all items.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.lock().total_items()
    }

    /// Sum of `price × quantity` across all items.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.lock().total_price()
    }

    /// Whether a remote cart operation is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock().is_loading
    }

    /// Copy of the current items.
    #[must_use]
    pub fn items(&self) -> Vec<CartLineItem> {
        self.lock().items.clone()
    }

    /// Copy of the full state.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.lock().clone()
    }

    /// Look up an item by identity.
    #[must_use]
    pub fn get_item(&self, id: CartItemId) -> Option<CartLineItem> {
        self.lock().items.iter().find(|item| item.id == id).cloned()
    }

    /// Look up an item by its (product, variant) pair.
    #[must_use]
    pub fn find_by_variant(&self, product_id: ProductId, variant_id: VariantId) -> Option<CartLineItem> {
        self.lock()
            .items
            .iter()
            .find(|item| item.product_id == product_id && item.variant_id == variant_id)
            .cloned()
    }

    /// Number of distinct line items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether the cart has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock(&self) -> MutexGuard<'_, CartState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f`; notify observers if it reports a change.
    ///
    /// Observers must not mutate the store from `on_change`.
    fn mutate<F>(&self, f: F)
    where
        F: FnOnce(&mut CartState) -> bool,
    {
        let _ordered = self
            .inner
            .notify
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let snapshot = {
            let mut state = self.lock();
            if !f(&mut state) {
                return;
            }
            PersistedCart::from_items(&state.items)
        };

        for observer in &self.inner.observers {
            observer.on_change(&snapshot);
        }
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("state", &*self.lock())
            .field("observers", &self.inner.observers.len())
            .finish()
    }
}

/// Collapse repeated identities into the first occurrence, summing quantities.
fn merge_duplicates(items: Vec<CartLineItem>) -> Vec<CartLineItem> {
    let mut merged: Vec<CartLineItem> = Vec::with_capacity(items.len());
    for item in items {
        match merged.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => merged.push(item),
        }
    }
    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn item(id: u32, qty: u32, price: i64) -> CartLineItem {
        CartLineItem::new(
            CartItemId::new(id),
            ProductId::new(id * 10),
            VariantId::new(id * 100),
            Quantity::new(qty).unwrap(),
            Decimal::new(price, 0),
        )
    }

    #[derive(Default)]
    struct CountingObserver {
        calls: AtomicUsize,
    }

    impl CartObserver for CountingObserver {
        fn on_change(&self, _snapshot: &PersistedCart) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn observed_store() -> (CartStore, Arc<CountingObserver>) {
        let observer = Arc::new(CountingObserver::default());
        let hook: Arc<dyn CartObserver> = observer.clone();
        let store = CartStore::with_observers(Vec::new(), vec![hook]);
        (store, observer)
    }

    #[test]
    fn test_add_merges_same_identity() {
        let store = CartStore::new();
        store.add_item(item(1, 2, 100));
        store.add_item(item(1, 3, 100));

        let items = store.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity.get(), 5);
        assert_eq!(store.total_items(), 5);
        assert_eq!(store.total_price(), Decimal::new(500, 0));
    }

    #[test]
    fn test_merge_keeps_captured_price() {
        let store = CartStore::new();
        store.add_item(item(1, 1, 100));
        store.add_item(item(1, 1, 80));

        let line = store.get_item(CartItemId::new(1)).unwrap();
        assert_eq!(line.price(), Decimal::new(100, 0));
        assert_eq!(store.total_price(), Decimal::new(200, 0));
    }

    #[test]
    fn test_add_appends_in_insertion_order() {
        let store = CartStore::new();
        store.add_item(item(3, 1, 10));
        store.add_item(item(1, 1, 10));
        store.add_item(item(2, 1, 10));

        let ids: Vec<u32> = store.items().iter().map(|i| i.id.as_u32()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_total_items_equals_sum_of_added_quantities() {
        let store = CartStore::new();
        let adds = [(1, 2), (2, 1), (1, 4), (3, 7), (2, 2)];
        for (id, qty) in adds {
            store.add_item(item(id, qty, 10));
        }

        let expected: u64 = adds.iter().map(|(_, q)| u64::from(*q)).sum();
        assert_eq!(store.total_items(), expected);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_total_price_saturates_on_huge_prices() {
        let store = CartStore::new();
        let huge = Decimal::MAX / Decimal::TWO + Decimal::ONE;
        store.add_item(CartLineItem::new(
            CartItemId::new(1),
            ProductId::new(1),
            VariantId::new(1),
            Quantity::new(2).unwrap(),
            huge,
        ));
        store.add_item(item(2, 1, 10));

        assert_eq!(store.total_price(), Decimal::MAX);
        assert_eq!(store.total_items(), 3);
    }

    #[test]
    fn test_update_item_sets_quantity() {
        let store = CartStore::new();
        store.add_item(item(2, 1, 50));
        store.update_item(CartItemId::new(2), 4);

        assert_eq!(store.get_item(CartItemId::new(2)).unwrap().quantity.get(), 4);
        assert_eq!(store.total_price(), Decimal::new(200, 0));
    }

    #[test]
    fn test_update_item_zero_removes() {
        let store = CartStore::new();
        store.add_item(item(2, 3, 50));
        store.add_item(item(5, 1, 10));
        store.update_item(CartItemId::new(2), 0);

        assert!(store.get_item(CartItemId::new(2)).is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_price(), Decimal::new(10, 0));
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let (store, observer) = observed_store();
        store.add_item(item(1, 1, 10));
        store.update_item(CartItemId::new(99), 3);

        assert_eq!(store.items(), vec![item(1, 1, 10)]);
        assert_eq!(observer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_absent_id_is_noop() {
        let (store, observer) = observed_store();
        store.add_item(item(1, 2, 10));
        let before = store.items();

        store.remove_item(CartItemId::new(42));

        assert_eq!(store.items(), before);
        assert_eq!(observer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_item() {
        let store = CartStore::new();
        store.add_item(item(1, 2, 10));
        store.add_item(item(2, 1, 10));
        store.remove_item(CartItemId::new(1));

        assert_eq!(store.items(), vec![item(2, 1, 10)]);
    }

    #[test]
    fn test_clear_cart() {
        let store = CartStore::new();
        store.add_item(item(1, 2, 10));
        store.add_item(item(2, 5, 99));
        store.clear_cart();

        assert!(store.is_empty());
        assert_eq!(store.total_items(), 0);
        assert_eq!(store.total_price(), Decimal::ZERO);
    }

    #[test]
    fn test_set_items_replaces_and_merges_duplicates() {
        let store = CartStore::new();
        store.add_item(item(9, 1, 10));
        store.set_items(vec![item(1, 1, 10), item(2, 1, 20), item(1, 2, 10)]);

        let items = store.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, CartItemId::new(1));
        assert_eq!(items[0].quantity.get(), 3);
        assert_eq!(items[1].id, CartItemId::new(2));
    }

    #[test]
    fn test_totals_recomputed_after_every_mutation() {
        let store = CartStore::new();
        store.add_item(item(1, 1, 100));
        assert_eq!(store.total_price(), Decimal::new(100, 0));

        store.update_item(CartItemId::new(1), 3);
        assert_eq!(store.total_price(), Decimal::new(300, 0));

        store.add_item(item(2, 2, 25));
        assert_eq!(store.total_price(), Decimal::new(350, 0));

        store.remove_item(CartItemId::new(1));
        assert_eq!(store.total_price(), Decimal::new(50, 0));
    }

    #[test]
    fn test_loading_flag_does_not_notify() {
        let (store, observer) = observed_store();
        store.set_loading(true);
        assert!(store.is_loading());
        store.set_loading(false);

        assert_eq!(observer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_find_by_variant() {
        let store = CartStore::new();
        store.add_item(item(1, 1, 10));

        let found = store.find_by_variant(ProductId::new(10), VariantId::new(100));
        assert_eq!(found.map(|i| i.id), Some(CartItemId::new(1)));
        assert!(store.find_by_variant(ProductId::new(10), VariantId::new(101)).is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let store = CartStore::new();
        let handle = store.clone();
        handle.add_item(item(1, 1, 10));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_restart_restores_items_without_loading_flag() {
        let storage = MemoryStorage::new();

        let store = CartStore::load(Arc::new(storage.clone())).unwrap();
        store.add_item(item(1, 2, 100));
        store.add_item(item(2, 1, 50));
        store.update_item(CartItemId::new(2), 3);
        store.set_loading(true);
        let before = store.items();
        drop(store);

        let raw = storage.get(CART_STORAGE_KEY).unwrap().unwrap();
        assert!(!raw.contains("loading"));

        let restored = CartStore::load(Arc::new(storage)).unwrap();
        assert_eq!(restored.items(), before);
        assert!(!restored.is_loading());
        assert_eq!(restored.total_price(), Decimal::new(350, 0));
    }

    #[test]
    fn test_clear_is_persisted() {
        let storage = MemoryStorage::new();
        let store = CartStore::load(Arc::new(storage.clone())).unwrap();
        store.add_item(item(1, 2, 100));
        store.clear_cart();

        let restored = CartStore::load(Arc::new(storage)).unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_load_or_default_recovers_from_corrupt_snapshot() {
        let storage = MemoryStorage::new();
        storage.set(CART_STORAGE_KEY, "garbage").unwrap();

        assert!(CartStore::load(Arc::new(storage.clone())).is_err());

        let store = CartStore::load_or_default(Arc::new(storage.clone()));
        assert!(store.is_empty());

        // The recovered store still persists.
        store.add_item(item(1, 1, 10));
        let restored = CartStore::load(Arc::new(storage)).unwrap();
        assert_eq!(restored.len(), 1);
    }

    /// Stalls on the first single-item snapshot so a later mutation can race it.
    struct StallFirstSnapshot;

    impl CartObserver for StallFirstSnapshot {
        fn on_change(&self, snapshot: &PersistedCart) {
            if snapshot.items.len() == 1 {
                std::thread::sleep(std::time::Duration::from_millis(200));
            }
        }
    }

    #[test]
    fn test_concurrent_mutations_persist_latest_snapshot() {
        let storage = MemoryStorage::new();
        let stall: Arc<dyn CartObserver> = Arc::new(StallFirstSnapshot);
        let persistence: Arc<dyn CartObserver> =
            Arc::new(CartPersistence::new(Arc::new(storage.clone())));
        let store = CartStore::with_observers(Vec::new(), vec![stall, persistence]);

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || store.add_item(item(1, 1, 10)))
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        store.add_item(item(2, 1, 20));
        writer.join().unwrap();

        assert_eq!(store.len(), 2);
        let restored = CartStore::load(Arc::new(storage)).unwrap();
        assert_eq!(restored.items(), store.items());
    }
}
