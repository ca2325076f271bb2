//! Plume - storage and feed-delivery core for a social-graph application
//!
//! Plume stores who follows whom and which content has been delivered to
//! each user's feed, and fans new posts out to followers asynchronously.
//! Data lives on one of two backends per user — a relational stand-in or
//! an ordered column-family store — routed by a percentage migration gate.
//!
//! # Quick start
//!
//! ```
//! use plume::{ContentId, Cursor, Plume, UserId};
//!
//! let app = Plume::testing();
//!
//! // user 2 follows user 1
//! app.follows.follow(UserId(2), UserId(1))?;
//!
//! // user 1 posts; the fanout delivers to user 2's feed
//! app.post(UserId(1), ContentId(7))?;
//! app.broadcaster.flush();
//!
//! let page = app.feeds.page(UserId(2), Cursor::First)?;
//! assert_eq!(page.results[0].content, ContentId(7));
//! # Ok::<(), plume::Error>(())
//! ```
//!
//! The crates underneath are usable on their own: `plume-core` (key codec,
//! schemas, configuration), `plume-storage` (ordered column store),
//! `plume-cache` (bounded list cache), and `plume-feed` (pagination, gate,
//! fanout, services).

use std::sync::Arc;

pub use plume_cache::{BoundedListCache, ListStore};
pub use plume_core::{
    ContentId, Environment, Error, FieldValue, Result, Settings, Timestamp, UserId,
};
pub use plume_feed::{
    Chronological, Cursor, CursorPaginator, EdgeTable, FanoutBroadcaster, FanoutReceipt,
    FeedEntry, FeedService, FeedTable, FollowEdge, FollowService, GateConfig, MigrationGate,
    Page, QueueStats, SubmitError, TaskError, TaskQueue, FEED_STORAGE_SWITCH,
    FOLLOW_STORAGE_SWITCH,
};
pub use plume_storage::{ColumnStore, Entity, ScanOptions};

/// A fully wired feed-delivery stack
///
/// Owns the column store, cache, gate, task queue, and the services built
/// on them. Fields are public so callers can drive each service directly.
pub struct Plume {
    /// Ordered column-family store shared by both services
    pub store: Arc<ColumnStore>,
    /// Backend routing gate
    pub gate: Arc<MigrationGate>,
    /// Follow-edge service
    pub follows: Arc<FollowService>,
    /// Feed read/delivery service
    pub feeds: Arc<FeedService>,
    /// Asynchronous delivery queue
    pub queue: Arc<TaskQueue>,
    /// Post fanout
    pub broadcaster: FanoutBroadcaster,
}

impl Plume {
    /// Wire up a stack for the given environment and settings
    pub fn new(env: Environment, settings: Settings) -> Self {
        let store = Arc::new(ColumnStore::new(env));
        let gate = Arc::new(MigrationGate::new());
        let cache = BoundedListCache::new(
            Arc::new(ListStore::new(env)),
            settings.cache_capacity,
            settings.cache_ttl(),
        );
        let follows = Arc::new(FollowService::new(
            Arc::clone(&store),
            Arc::new(EdgeTable::new()),
            Arc::clone(&gate),
            &settings,
        ));
        let feeds = Arc::new(FeedService::new(
            Arc::clone(&store),
            Arc::new(FeedTable::new()),
            Arc::clone(&gate),
            cache,
            &settings,
        ));
        let queue = Arc::new(TaskQueue::new(
            settings.task_workers,
            settings.task_queue_depth,
            settings.task_max_attempts,
        ));
        let broadcaster = FanoutBroadcaster::new(
            Arc::clone(&follows),
            Arc::clone(&feeds),
            Arc::clone(&queue),
            &settings,
        );
        Self {
            store,
            gate,
            follows,
            feeds,
            queue,
            broadcaster,
        }
    }

    /// A testing-environment stack with default settings
    pub fn testing() -> Self {
        Self::new(Environment::Testing, Settings::default())
    }

    /// Publish a post: stamp it and fan it out to the author's followers
    pub fn post(&self, author: UserId, content: ContentId) -> Result<FanoutReceipt> {
        self.broadcaster
            .fan_out(author, content, Timestamp::unique_now())
    }

    /// Drain in-flight deliveries and stop the task queue workers
    pub fn shutdown(&self) {
        self.queue.drain();
        self.queue.shutdown();
    }
}
