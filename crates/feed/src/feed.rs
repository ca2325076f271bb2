//! Per-owner feed reads and delivery writes
//!
//! Each user owns one feed: the content delivered to them, newest first.
//! Reads go through the bounded list cache; when the cached window cannot
//! answer a page completely, the read falls back to the authoritative
//! backend (relational table or column store, per the migration gate).
//! Delivery writes are idempotent, so the retrying task queue can replay
//! a batch without duplicating rows.

use std::sync::Arc;
use tracing::debug;

use plume_core::{
    FieldDescriptor, FieldKind, FieldValue, Result, RowValues, Schema, Settings, UserId,
};
use plume_cache::BoundedListCache;
use plume_storage::{ColumnStore, Entity, ScanOptions};

use crate::gate::MigrationGate;
use crate::pagination::{Cursor, CursorPaginator, Page};
use crate::tables::{FeedEntry, FeedTable};

/// Gate switch routing feed storage to the column store
pub const FEED_STORAGE_SWITCH: &str = "feed_storage_backend";

/// Feed rows keyed by owner, ascending by content creation time
pub const FEEDS: Schema = Schema {
    table: "feeds",
    row_key: &[
        FieldDescriptor::key("user_id", FieldKind::Integer),
        FieldDescriptor::key("created_at", FieldKind::Timestamp),
    ],
    columns: &[FieldDescriptor::column("content_id", FieldKind::Integer, "cf")],
};

/// Cached-and-gated feed reads plus idempotent delivery writes
pub struct FeedService {
    store: Arc<ColumnStore>,
    table: Arc<FeedTable>,
    gate: Arc<MigrationGate>,
    cache: BoundedListCache,
    paginator: CursorPaginator,
}

impl FeedService {
    /// Create the service and register its column-store table
    pub fn new(
        store: Arc<ColumnStore>,
        table: Arc<FeedTable>,
        gate: Arc<MigrationGate>,
        cache: BoundedListCache,
        settings: &Settings,
    ) -> Self {
        store.attach_table(&FEEDS);
        Self {
            store,
            table,
            gate,
            cache,
            paginator: CursorPaginator::new(settings.page_size),
        }
    }

    fn on_column_store(&self, owner: UserId) -> bool {
        self.gate.in_rollout(FEED_STORAGE_SWITCH, owner)
    }

    fn cache_key(owner: UserId) -> String {
        format!("newsfeeds:{}", owner)
    }

    /// Write one delivery to the owner's authoritative backend
    ///
    /// Returns false when the entry already exists, so a replayed delivery
    /// is a no-op. Does not touch the cache; delivery goes through
    /// [`deliver_batch`](Self::deliver_batch) or the caller pushes
    /// explicitly.
    pub fn create_entry(&self, entry: &FeedEntry) -> Result<bool> {
        if self.on_column_store(entry.owner) {
            let values = entry_values(entry);
            if self.store.get(&FEEDS, &values)?.is_some() {
                return Ok(false);
            }
            self.store.put(&FEEDS, &values)?;
            Ok(true)
        } else {
            Ok(self.table.create(entry.clone()))
        }
    }

    /// Deliver a batch of entries and push each new one to its owner's
    /// cached feed. Returns the number of entries actually created.
    pub fn deliver_batch(&self, entries: &[FeedEntry]) -> Result<usize> {
        let mut created = 0;
        for entry in entries {
            if !self.create_entry(entry)? {
                continue;
            }
            created += 1;
            self.push_to_cache(entry)?;
        }
        debug!(
            batch_size = entries.len(),
            created, "delivered feed batch"
        );
        Ok(created)
    }

    /// One page of the owner's feed, newest first
    ///
    /// Serves from the cached window when the paginator judges it
    /// sufficient; otherwise re-queries the authoritative backend in full.
    pub fn page(&self, owner: UserId, cursor: Cursor) -> Result<Page<FeedEntry>> {
        let cached = self.cached_entries(owner)?;
        if let Some(page) = self
            .paginator
            .paginate_cached(&cached, self.cache.capacity(), cursor)
        {
            return Ok(page);
        }
        debug!(%owner, "cached feed window insufficient, reading backend");
        let all = self.authoritative_entries(owner, None)?;
        Ok(self.paginator.paginate(&all, cursor))
    }

    /// The owner's cached feed window, rehydrating on miss
    pub fn cached_entries(&self, owner: UserId) -> Result<Vec<FeedEntry>> {
        self.cache.load(&Self::cache_key(owner), |limit| {
            self.authoritative_entries(owner, Some(limit))
        })
    }

    /// Push one freshly created entry to its owner's cached feed
    pub fn push_to_cache(&self, entry: &FeedEntry) -> Result<()> {
        let owner = entry.owner;
        self.cache.push(
            &Self::cache_key(owner),
            |limit| self.authoritative_entries(owner, Some(limit)),
            entry,
        )
    }

    /// Drop the owner's cached feed
    pub fn invalidate_cache(&self, owner: UserId) {
        self.cache.invalidate(&Self::cache_key(owner));
    }

    /// Number of entries in the owner's authoritative feed
    pub fn len(&self, owner: UserId) -> Result<usize> {
        Ok(self.authoritative_entries(owner, None)?.len())
    }

    /// Whether the owner's authoritative feed is empty
    pub fn is_empty(&self, owner: UserId) -> Result<bool> {
        Ok(self.len(owner)? == 0)
    }

    fn authoritative_entries(
        &self,
        owner: UserId,
        limit: Option<usize>,
    ) -> Result<Vec<FeedEntry>> {
        if self.on_column_store(owner) {
            let mut opts = ScanOptions::new()
                .with_prefix(vec![FieldValue::Int(owner.as_u64())])
                .reversed();
            if let Some(limit) = limit {
                opts = opts.with_limit(limit);
            }
            self.store
                .scan(&FEEDS, &opts)?
                .iter()
                .map(feed_entry)
                .collect()
        } else {
            let mut entries = self.table.entries_for(owner);
            if let Some(limit) = limit {
                entries.truncate(limit);
            }
            Ok(entries)
        }
    }
}

fn entry_values(entry: &FeedEntry) -> RowValues {
    let mut values = RowValues::new();
    values.insert(
        "user_id".to_string(),
        FieldValue::Int(entry.owner.as_u64()),
    );
    values.insert(
        "created_at".to_string(),
        FieldValue::Timestamp(entry.created_at),
    );
    values.insert(
        "content_id".to_string(),
        FieldValue::Int(entry.content.as_u64()),
    );
    values
}

fn feed_entry(entity: &Entity) -> Result<FeedEntry> {
    Ok(FeedEntry {
        owner: entity.user_id("user_id")?,
        content: entity.content_id("content_id")?,
        created_at: entity.timestamp("created_at")?,
    })
}
