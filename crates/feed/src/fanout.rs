//! Post fanout: one write amplified to every follower's feed
//!
//! The author's own feed entry is written synchronously so the author sees
//! their post immediately. Every follower's copy is delivered by the task
//! queue in fixed-size batches; batches are idempotent, so the queue's
//! retry policy can replay one without duplicating rows. If the queue
//! refuses a batch under backpressure, delivery degrades to synchronous on
//! the calling thread rather than dropping the batch.

use std::sync::Arc;
use tracing::{info, warn};

use plume_core::{ContentId, Result, Settings, Timestamp, UserId};

use crate::feed::FeedService;
use crate::follow::FollowService;
use crate::queue::{TaskError, TaskQueue};
use crate::tables::FeedEntry;

/// Summary of one fanout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanoutReceipt {
    /// Followers the post was fanned out to
    pub follower_count: usize,
    /// Delivery batches the followers were split into
    pub batch_count: usize,
}

/// Fans a post out to the author's followers through the task queue
pub struct FanoutBroadcaster {
    follows: Arc<FollowService>,
    feeds: Arc<FeedService>,
    queue: Arc<TaskQueue>,
    batch_size: usize,
}

impl FanoutBroadcaster {
    /// Create a broadcaster delivering `settings.fanout_batch_size`
    /// followers per batch
    pub fn new(
        follows: Arc<FollowService>,
        feeds: Arc<FeedService>,
        queue: Arc<TaskQueue>,
        settings: &Settings,
    ) -> Self {
        Self {
            follows,
            feeds,
            queue,
            batch_size: settings.fanout_batch_size.max(1),
        }
    }

    /// Fan `content` out from `author` to every follower's feed
    ///
    /// The author's entry is delivered before this returns; follower
    /// entries are delivered asynchronously. `created_at` is the post's
    /// creation time and is shared by every delivered copy.
    pub fn fan_out(
        &self,
        author: UserId,
        content: ContentId,
        created_at: Timestamp,
    ) -> Result<FanoutReceipt> {
        self.feeds.deliver_batch(&[FeedEntry {
            owner: author,
            content,
            created_at,
        }])?;

        let followers = self.follows.follower_ids(author)?;
        let mut batch_count = 0;
        for chunk in followers.chunks(self.batch_size) {
            batch_count += 1;
            let batch: Vec<FeedEntry> = chunk
                .iter()
                .map(|&owner| FeedEntry {
                    owner,
                    content,
                    created_at,
                })
                .collect();

            let feeds = Arc::clone(&self.feeds);
            let task_batch = batch.clone();
            let submitted = self.queue.submit(move || {
                feeds
                    .deliver_batch(&task_batch)
                    .map(|_| ())
                    .map_err(|err| TaskError::new(err.to_string()))
            });
            if let Err(err) = submitted {
                warn!(%author, %err, "task queue refused fanout batch, delivering inline");
                self.feeds.deliver_batch(&batch)?;
            }
        }

        info!(
            %author,
            %content,
            follower_count = followers.len(),
            batch_count,
            "fanned out post"
        );
        Ok(FanoutReceipt {
            follower_count: followers.len(),
            batch_count,
        })
    }

    /// Block until all in-flight delivery batches have completed
    pub fn flush(&self) {
        self.queue.drain();
    }
}
