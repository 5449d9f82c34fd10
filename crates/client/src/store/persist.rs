//! Cart snapshot serialization and the persistence observer.
//!
//! The persisted shape is `{ "items": [...] }` stored under
//! [`CART_STORAGE_KEY`]. Transient state such as the loading flag is never
//! written.

use std::sync::Arc;

use fashion_shop_core::CartLineItem;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::CartObserver;
use super::storage::{CartStorage, StorageError};

/// Fixed namespace key for the persisted cart.
pub const CART_STORAGE_KEY: &str = "cart-storage";

/// The durable part of the cart state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCart {
    /// Line items in insertion order.
    #[serde(default)]
    pub items: Vec<CartLineItem>,
}

impl PersistedCart {
    /// Build a snapshot from the current items.
    #[must_use]
    pub fn from_items(items: &[CartLineItem]) -> Self {
        Self {
            items: items.to_vec(),
        }
    }

    /// Encode as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid snapshot.
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Writes a snapshot to storage after every cart mutation.
#[derive(Clone)]
pub struct CartPersistence {
    storage: Arc<dyn CartStorage>,
    key: String,
}

impl CartPersistence {
    /// Persist under the default [`CART_STORAGE_KEY`].
    #[must_use]
    pub fn new(storage: Arc<dyn CartStorage>) -> Self {
        Self::with_key(storage, CART_STORAGE_KEY)
    }

    /// Persist under a custom key.
    #[must_use]
    pub fn with_key(storage: Arc<dyn CartStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Read the stored snapshot, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read or holds a corrupt snapshot.
    pub fn load(&self) -> Result<Option<PersistedCart>, StorageError> {
        self.storage
            .get(&self.key)?
            .map(|json| PersistedCart::from_json(&json))
            .transpose()
    }

    /// Write `snapshot` to storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the storage write fails.
    pub fn save(&self, snapshot: &PersistedCart) -> Result<(), StorageError> {
        let json = snapshot.to_json()?;
        self.storage.set(&self.key, &json)
    }

    /// Delete the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub fn wipe(&self) -> Result<(), StorageError> {
        self.storage.remove(&self.key)
    }
}

impl std::fmt::Debug for CartPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartPersistence")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl CartObserver for CartPersistence {
    fn on_change(&self, snapshot: &PersistedCart) {
        // Storage is best effort; the in-memory cart stays authoritative.
        match self.save(snapshot) {
            Ok(()) => debug!(key = %self.key, items = snapshot.items.len(), "Cart snapshot persisted"),
            Err(e) => warn!(key = %self.key, error = %e, "Failed to persist cart snapshot"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fashion_shop_core::{CartItemId, ProductId, Quantity, VariantId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::store::storage::MemoryStorage;

    fn line(id: u32, qty: u32) -> CartLineItem {
        CartLineItem::new(
            CartItemId::new(id),
            ProductId::new(1),
            VariantId::new(2),
            Quantity::new(qty).unwrap(),
            Decimal::new(12_500, 2),
        )
    }

    #[test]
    fn test_snapshot_shape() {
        let snapshot = PersistedCart::from_items(&[line(1, 2)]);
        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();

        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 1, "only the items field is persisted");
        assert_eq!(value["items"][0]["id"], 1);
        assert_eq!(value["items"][0]["quantity"], 2);
        assert_eq!(value["items"][0]["price"], "125.00");
    }

    #[test]
    fn test_load_missing_is_none() {
        let persistence = CartPersistence::new(Arc::new(MemoryStorage::new()));
        assert_eq!(persistence.load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let storage = MemoryStorage::new();
        let persistence = CartPersistence::new(Arc::new(storage.clone()));

        let snapshot = PersistedCart::from_items(&[line(1, 2), line(2, 1)]);
        persistence.save(&snapshot).unwrap();

        assert!(storage.get(CART_STORAGE_KEY).unwrap().is_some());
        assert_eq!(persistence.load().unwrap(), Some(snapshot));
    }

    #[test]
    fn test_load_corrupt_snapshot_errors() {
        let storage = MemoryStorage::new();
        storage.set(CART_STORAGE_KEY, "{not json").unwrap();

        let persistence = CartPersistence::new(Arc::new(storage));
        assert!(matches!(
            persistence.load(),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn test_missing_items_field_defaults_empty() {
        assert_eq!(
            PersistedCart::from_json("{}").unwrap(),
            PersistedCart::default()
        );
    }
}
