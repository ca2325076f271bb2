//! Capacity-bounded write-through list cache
//!
//! Each owner key caches a sliding window of the newest entity snapshots:
//! at most `capacity` entries, newest first, serialized as JSON. The
//! authoritative store is always a superset of what the cache can serve —
//! on a miss the cache rehydrates from a caller-supplied loader, capped at
//! capacity, and arms the TTL.

use plume_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::list_store::ListStore;

/// Write-through cache of per-owner entity lists, bounded at `capacity`
#[derive(Debug, Clone)]
pub struct BoundedListCache {
    store: Arc<ListStore>,
    capacity: usize,
    ttl: Duration,
}

impl BoundedListCache {
    /// Create a cache over the given list store
    pub fn new(store: Arc<ListStore>, capacity: usize, ttl: Duration) -> Self {
        Self {
            store,
            capacity,
            ttl,
        }
    }

    /// Configured capacity (maximum cached entries per owner key)
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return the cached list for `key`, rehydrating from `loader` on miss
    ///
    /// `loader` receives the capacity and must return at most that many
    /// entries in descending creation order; the cache stores exactly what
    /// the loader returned and arms the TTL. A loader error leaves the
    /// cache cold.
    pub fn load<T, F>(&self, key: &str, loader: F) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(usize) -> Result<Vec<T>>,
    {
        if let Some(items) = self.store.items(key) {
            return items
                .iter()
                .map(|snapshot| deserialize_snapshot(snapshot))
                .collect();
        }

        debug!(key, "cache miss, rehydrating from source");
        let mut entries = loader(self.capacity)?;
        entries.truncate(self.capacity);
        let snapshots = entries
            .iter()
            .map(serialize_snapshot)
            .collect::<Result<Vec<_>>>()?;
        self.store.set(key, snapshots, self.ttl);
        Ok(entries)
    }

    /// Push a newly created entity to the head of `key`'s cached list
    ///
    /// On a warm cache this is an atomic prepend+trim: the oldest entries
    /// beyond capacity fall off the sliding window. On a cold cache it
    /// behaves like [`load`](Self::load) — the new entity is expected to
    /// already be part of what the loader returns, so no separate prepend
    /// happens.
    pub fn push<T, F>(&self, key: &str, loader: F, entity: &T) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(usize) -> Result<Vec<T>>,
    {
        let snapshot = serialize_snapshot(entity)?;
        if self.store.prepend_trim(key, snapshot, self.capacity) {
            return Ok(());
        }
        // Cold path: rebuild from source, which already includes the entity
        self.load(key, loader).map(|_| ())
    }

    /// Drop the cached list for `key`
    pub fn invalidate(&self, key: &str) {
        self.store.remove(key);
    }

    /// Length of the cached list for `key`, if one is live
    pub fn cached_len(&self, key: &str) -> Option<usize> {
        self.store.items(key).map(|items| items.len())
    }
}

fn serialize_snapshot<T: Serialize>(entity: &T) -> Result<String> {
    serde_json::to_string(entity).map_err(|e| Error::Serialization(e.to_string()))
}

fn deserialize_snapshot<T: DeserializeOwned>(snapshot: &str) -> Result<T> {
    serde_json::from_str(snapshot).map_err(|e| Error::Serialization(e.to_string()))
}
