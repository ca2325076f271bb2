//! Shared list store with per-key atomic operations
//!
//! The list store is the shared mutable substrate the bounded cache sits
//! on: named lists of serialized snapshots, sharded by key in a `DashMap`.
//! Concurrent pushes to the same key race at the granularity of one store
//! call — `prepend_trim` holds the key's shard entry for the duration of
//! the prepend and trim, so no application-level lock is needed above it.
//!
//! Expiry is passive. Each list carries an expiry timestamp; an access that
//! finds the deadline passed treats the list as absent and removes it. No
//! eviction thread runs.

use dashmap::DashMap;
use plume_core::{Environment, Error, Result, Timestamp};
use std::time::Duration;

#[derive(Debug)]
struct ListEntry {
    items: Vec<String>,
    expires_at: Timestamp,
}

impl ListEntry {
    fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

/// Named lists of serialized snapshots with atomic per-key operations
#[derive(Debug)]
pub struct ListStore {
    env: Environment,
    lists: DashMap<String, ListEntry>,
}

impl ListStore {
    /// Create a list store for the given environment
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            lists: DashMap::new(),
        }
    }

    /// Whether a live (non-expired) list exists under `key`
    pub fn exists(&self, key: &str) -> bool {
        self.get_live(key).is_some()
    }

    /// The full contents of the list under `key`, newest first
    ///
    /// Returns `None` for absent or expired lists.
    pub fn items(&self, key: &str) -> Option<Vec<String>> {
        self.get_live(key)
    }

    /// Replace the list under `key` with `items` and arm its TTL
    pub fn set(&self, key: &str, items: Vec<String>, ttl: Duration) {
        let entry = ListEntry {
            items,
            expires_at: Timestamp::now().saturating_add(ttl),
        };
        self.lists.insert(key.to_string(), entry);
    }

    /// Atomically prepend `item` and trim the list to `capacity`
    ///
    /// Returns `false` without writing when the list is absent or expired —
    /// the caller is on the cold path and must rebuild from its
    /// authoritative source instead.
    pub fn prepend_trim(&self, key: &str, item: String, capacity: usize) -> bool {
        let now = Timestamp::now();
        let mut removed_expired = false;
        let updated = match self.lists.get_mut(key) {
            Some(mut entry) => {
                if entry.is_expired(now) {
                    removed_expired = true;
                    false
                } else {
                    entry.items.insert(0, item);
                    entry.items.truncate(capacity);
                    true
                }
            }
            None => false,
        };
        if removed_expired {
            self.lists.remove(key);
        }
        updated
    }

    /// Remove the list under `key`
    pub fn remove(&self, key: &str) {
        self.lists.remove(key);
    }

    /// Number of live lists
    pub fn len(&self) -> usize {
        let now = Timestamp::now();
        self.lists
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count()
    }

    /// Whether no live lists exist
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every list. Testing-only.
    pub fn clear_all(&self) -> Result<()> {
        if !self.env.is_testing() {
            return Err(Error::ProductionForbidden("clear_all"));
        }
        self.lists.clear();
        Ok(())
    }

    fn get_live(&self, key: &str) -> Option<Vec<String>> {
        let now = Timestamp::now();
        let mut expired = false;
        let items = match self.lists.get(key) {
            Some(entry) => {
                if entry.is_expired(now) {
                    expired = true;
                    None
                } else {
                    Some(entry.items.clone())
                }
            }
            None => None,
        };
        if expired {
            self.lists.remove(key);
        }
        items
    }
}
