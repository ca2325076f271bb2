//! Runtime configuration
//!
//! Every component receives its configuration explicitly at construction.
//! There is no global runtime flag selecting cache backends or table
//! namespaces: the `Environment` enum and `Settings` struct are threaded
//! through constructors instead.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Execution environment
///
/// Testing environments get a distinct table namespace (a `test_` prefix on
/// every table name) so test and production data never collide, and are the
/// only environments permitted to run privileged store lifecycle operations
/// (create/drop table, clear cache store).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    /// Production: privileged lifecycle operations are fatal errors
    Production,
    /// Testing: isolated table namespace, lifecycle operations allowed
    Testing,
}

impl Environment {
    /// Whether this environment may run privileged lifecycle operations
    #[inline]
    pub fn is_testing(&self) -> bool {
        matches!(self, Environment::Testing)
    }
}

/// Tunable settings for the feed-delivery core
///
/// Defaults mirror a small production deployment; tests usually shrink the
/// cache capacity and batch size to exercise boundary behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Maximum number of serialized entries a bounded list cache may hold
    /// per owner key
    pub cache_capacity: usize,
    /// Time-to-live for cache entries, in seconds. Expiry is passive: an
    /// expired entry is treated as a cold cache on the next access.
    pub cache_ttl_secs: u64,
    /// Number of follower ids delivered per asynchronous fanout batch
    pub fanout_batch_size: usize,
    /// Number of entries returned per pagination page
    pub page_size: usize,
    /// Worker threads executing asynchronous delivery tasks
    pub task_workers: usize,
    /// Maximum number of queued delivery tasks before backpressure
    pub task_queue_depth: usize,
    /// Attempts per delivery task before it is dropped (1 = no retry)
    pub task_max_attempts: u32,
}

impl Settings {
    /// TTL as a `Duration`
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_capacity: 200,
            cache_ttl_secs: 7 * 24 * 3600,
            fanout_batch_size: 1000,
            page_size: 20,
            task_workers: 4,
            task_queue_depth: 16_384,
            task_max_attempts: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_is_testing() {
        assert!(Environment::Testing.is_testing());
        assert!(!Environment::Production.is_testing());
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.cache_capacity, 200);
        assert_eq!(settings.page_size, 20);
        assert_eq!(settings.cache_ttl(), Duration::from_secs(7 * 24 * 3600));
    }

    #[test]
    fn test_settings_serialization() {
        let settings = Settings {
            cache_capacity: 5,
            cache_ttl_secs: 60,
            fanout_batch_size: 2,
            page_size: 3,
            ..Settings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        let restored: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.cache_capacity, 5);
        assert_eq!(restored.fanout_batch_size, 2);
    }
}
