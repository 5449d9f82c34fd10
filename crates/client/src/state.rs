//! Session state shared by cart callers.

use std::sync::Arc;

use crate::api::{ApiClient, CartService};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::store::{CartPersistence, CartStore, FileStorage};
use crate::sync::CartSession;

/// Everything a cart caller needs for one session.
///
/// This struct is cheaply cloneable via `Arc`. Build one at session start
/// and pass it explicitly; there is no global cart.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ClientConfig,
    cart: CartSession,
}

impl AppState {
    /// Create session state, hydrating the cart from the configured storage
    /// directory.
    ///
    /// An unreadable cart snapshot is discarded rather than failing startup.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let storage = Arc::new(FileStorage::new(&config.storage_dir));
        let store = CartStore::load_or_default(storage);
        Self::with_store(config, store)
    }

    /// Create session state around an existing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_store(config: ClientConfig, store: CartStore) -> Result<Self> {
        let api = ApiClient::new(&config.api)?;
        let cart = CartSession::new(store, CartService::new(api));

        Ok(Self {
            inner: Arc::new(AppStateInner { config, cart }),
        })
    }

    /// Delete the persisted cart under `config.storage_dir` without loading it.
    ///
    /// Works even when the stored snapshot is unreadable.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot file cannot be removed.
    pub fn reset_local(config: &ClientConfig) -> Result<()> {
        let storage = FileStorage::new(&config.storage_dir);
        tracing::info!(dir = %storage.dir().display(), "Removing persisted cart");
        CartPersistence::new(Arc::new(storage)).wipe()?;
        Ok(())
    }

    /// Get a reference to the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Get a reference to the cart session.
    #[must_use]
    pub fn cart(&self) -> &CartSession {
        &self.inner.cart
    }

    /// Whether cart calls will be made on behalf of a signed-in user.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.config.api.is_authenticated()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use fashion_shop_core::{CartItemId, CartLineItem, CurrencyCode, ProductId, Quantity, VariantId};
    use rust_decimal::Decimal;
    use url::Url;

    use super::*;
    use crate::config::ApiConfig;
    use crate::error::AppError;

    fn config(dir: &std::path::Path) -> ClientConfig {
        ClientConfig {
            api: ApiConfig {
                base_url: Url::parse("http://localhost:8080/api/v1").unwrap(),
                token: None,
                timeout: Duration::from_secs(5),
            },
            storage_dir: dir.to_path_buf(),
            currency: CurrencyCode::VND,
            sentry_dsn: None,
        }
    }

    #[test]
    fn test_state_hydrates_cart_from_storage_dir() {
        let dir = tempfile::tempdir().unwrap();

        let state = AppState::new(config(dir.path())).unwrap();
        assert!(!state.is_authenticated());
        state.cart().store().add_item(CartLineItem::new(
            CartItemId::new(1),
            ProductId::new(2),
            VariantId::new(3),
            Quantity::new(2).unwrap(),
            Decimal::new(120_000, 0),
        ));
        drop(state);

        let state = AppState::new(config(dir.path())).unwrap();
        assert_eq!(state.cart().store().total_items(), 2);
        assert_eq!(state.cart().store().total_price(), Decimal::new(240_000, 0));
    }

    #[test]
    fn test_reset_local_removes_snapshot_even_when_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart-storage.json");
        std::fs::write(&path, "not json").unwrap();

        AppState::reset_local(&config(dir.path())).unwrap();
        assert!(!path.exists());

        // Resetting again with nothing stored is fine.
        AppState::reset_local(&config(dir.path())).unwrap();
        let state = AppState::new(config(dir.path())).unwrap();
        assert!(state.cart().store().is_empty());
    }

    #[test]
    fn test_reset_local_surfaces_storage_errors() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the snapshot file should be cannot be removed
        // with remove_file.
        std::fs::create_dir(dir.path().join("cart-storage.json")).unwrap();

        let err = AppState::reset_local(&config(dir.path())).unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
