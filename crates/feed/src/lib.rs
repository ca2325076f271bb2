//! Feed delivery for plume
//!
//! This crate orchestrates the read and write paths of the social feed:
//! - CursorPaginator: older/newer-than-cursor paging over cache, relational
//!   table, or column store
//! - MigrationGate: percentage-based routing between the relational and
//!   column-store backends
//! - FeedTable / EdgeTable: relational-style authoritative ordered sets
//! - TaskQueue: worker pool with bounded retry for asynchronous batches
//! - FollowService: follow-edge writes and reads on both backends
//! - FeedService: per-owner feed reads through the bounded cache
//! - FanoutBroadcaster: one post write fanned out to N follower feeds

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fanout;
pub mod feed;
pub mod follow;
pub mod gate;
pub mod pagination;
pub mod queue;
pub mod tables;

pub use fanout::{FanoutBroadcaster, FanoutReceipt};
pub use feed::{FeedService, FEEDS, FEED_STORAGE_SWITCH};
pub use follow::{FollowService, FOLLOWERS, FOLLOWINGS, FOLLOW_STORAGE_SWITCH};
pub use gate::{GateConfig, MigrationGate};
pub use pagination::{Chronological, Cursor, CursorPaginator, Page};
pub use queue::{QueueStats, SubmitError, TaskError, TaskQueue};
pub use tables::{EdgeTable, FeedEntry, FeedTable, FollowEdge};
