//! Durable favorites store.
//!
//! A set of liked product ids. The in-memory set is the owner; the full
//! set is mirrored to durable storage after every mutation that changes
//! it. A malformed persisted set is discarded on load and the store
//! starts empty.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use clementine_core::ProductId;

use crate::models::session::keys;
use crate::storage::{self, KeyValueStore};

/// Favorites state holder with a durable mirror.
#[derive(Clone)]
pub struct FavoritesStore {
    inner: Arc<FavoritesInner>,
}

struct FavoritesInner {
    storage: Arc<dyn KeyValueStore>,
    set: RwLock<HashSet<ProductId>>,
}

impl FavoritesStore {
    /// Load the persisted set from `storage`; malformed or missing state
    /// yields an empty set (and deletes the offending entry).
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let set = storage::read_json::<HashSet<ProductId>>(storage.as_ref(), keys::FAVORITES)
            .unwrap_or_default();

        Self {
            inner: Arc::new(FavoritesInner {
                storage,
                set: RwLock::new(set),
            }),
        }
    }

    /// Insert `id`. Idempotent; returns true when the set changed.
    pub fn add(&self, id: ProductId) -> bool {
        let inserted = self.write().insert(id);
        if inserted {
            self.persist();
        }
        inserted
    }

    /// Remove `id`. Idempotent; returns true when the set changed.
    pub fn remove(&self, id: ProductId) -> bool {
        let removed = self.write().remove(&id);
        if removed {
            self.persist();
        }
        removed
    }

    /// Flip membership of `id`; returns the new membership state.
    pub fn toggle(&self, id: ProductId) -> bool {
        let now_member = {
            let mut set = self.write();
            if set.remove(&id) {
                false
            } else {
                set.insert(id);
                true
            }
        };
        self.persist();
        now_member
    }

    /// Whether `id` is in the set.
    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.read().contains(&id)
    }

    /// Snapshot of the set, sorted for stable rendering.
    #[must_use]
    pub fn all(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.read().iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of favorites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True when nothing is liked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Re-read the durable copy, replacing the in-memory set. Wire this
    /// to the platform's storage-change event for cross-tab updates.
    pub fn reload(&self) {
        let set = storage::read_json::<HashSet<ProductId>>(
            self.inner.storage.as_ref(),
            keys::FAVORITES,
        )
        .unwrap_or_default();
        *self.write() = set;
    }

    /// Mirror the full set to durable storage, fire-and-forget.
    fn persist(&self) {
        let snapshot = self.read().clone();
        storage::write_json(self.inner.storage.as_ref(), keys::FAVORITES, &snapshot);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashSet<ProductId>> {
        self.inner.set.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashSet<ProductId>> {
        self.inner
            .set
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
