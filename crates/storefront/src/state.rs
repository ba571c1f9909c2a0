//! Application context shared across the UI layer.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::StorefrontConfig;
use crate::gateway::{Gateway, TableClient};
use crate::notify::Notifier;
use crate::storage::{FileStore, KeyValueStore, StorageError};
use crate::stores::{AdminSessionStore, CartStore, CustomerSessionStore, FavoritesStore};

/// Error creating the application context.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("storage setup failed: {0}")]
    Storage(#[from] StorageError),
}

/// Application context wiring the stores to their production
/// collaborators.
///
/// This struct is cheaply cloneable via `Arc`. It replaces ambient
/// global lookup: the UI layer receives one context and reads store
/// handles off it.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<AppContextInner>,
}

struct AppContextInner {
    config: StorefrontConfig,
    notifier: Notifier,
    catalog: Catalog,
    customer_sessions: CustomerSessionStore,
    admin_sessions: AdminSessionStore,
    cart: CartStore,
    favorites: FavoritesStore,
}

impl AppContext {
    /// Build the production context: file-backed storage under the
    /// configured directory, an HTTP table-store client, and one shared
    /// notifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage directory cannot be created.
    pub fn new(config: StorefrontConfig) -> Result<Self, ContextError> {
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.storage_dir)?);
        let gateway: Arc<dyn Gateway> = Arc::new(TableClient::new(&config.gateway));
        Ok(Self::with_collaborators(config, gateway, storage))
    }

    /// Build a context over explicit collaborators (tests, embedders
    /// with their own storage).
    #[must_use]
    pub fn with_collaborators(
        config: StorefrontConfig,
        gateway: Arc<dyn Gateway>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        let notifier = Notifier::new();

        let customer_sessions =
            CustomerSessionStore::new(gateway.clone(), storage.clone(), notifier.clone());
        let admin_sessions = AdminSessionStore::new(
            gateway.clone(),
            storage.clone(),
            notifier.clone(),
            config.admin_session_ttl(),
        );
        let cart = CartStore::new();
        let favorites = FavoritesStore::new(storage);
        let catalog = Catalog::new(gateway);

        Self {
            inner: Arc::new(AppContextInner {
                config,
                notifier,
                catalog,
                customer_sessions,
                admin_sessions,
                cart,
                favorites,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The identity-change notifier shared by the session stores.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// Page-level product and payment-method fetchers.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// The customer session store.
    #[must_use]
    pub fn customer_sessions(&self) -> &CustomerSessionStore {
        &self.inner.customer_sessions
    }

    /// The admin session store.
    #[must_use]
    pub fn admin_sessions(&self) -> &AdminSessionStore {
        &self.inner.admin_sessions
    }

    /// The in-memory cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// The favorites store.
    #[must_use]
    pub fn favorites(&self) -> &FavoritesStore {
        &self.inner.favorites
    }
}
