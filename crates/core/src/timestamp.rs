//! Microsecond-precision timestamp type
//!
//! Timestamps are stored as microseconds since Unix epoch (1970-01-01
//! 00:00:00 UTC). Every entity in the system is ordered by its creation
//! timestamp, and the key codec serializes timestamps as 16-digit decimal
//! tokens, so microseconds are the canonical unit everywhere.
//!
//! Never expose raw arithmetic. Use explicit constructors:
//!
//! ```
//! use plume_core::Timestamp;
//!
//! let now = Timestamp::now();
//! let from_secs = Timestamp::from_secs(1000);
//! let from_micros = Timestamp::from_micros(1_000_000_000);
//! ```

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Microsecond-precision timestamp
///
/// Represents a point in time as microseconds since Unix epoch.
/// This is the canonical time representation in the system.
///
/// ## Invariants
///
/// - Timestamps are always non-negative (u64)
/// - Timestamps are always in microseconds
/// - Timestamps are comparable and orderable
/// - The zero timestamp represents Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Maximum timestamp representable in a 16-digit key token
    pub const MAX: Timestamp = Timestamp(9_999_999_999_999_999);

    /// Create a timestamp for the current moment
    ///
    /// Uses system time. Returns epoch (0) if system clock is before Unix
    /// epoch (e.g., clock went backwards due to NTP adjustment).
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as u64)
    }

    /// Create a strictly increasing timestamp
    ///
    /// Like [`now`](Self::now), but never returns the same value twice
    /// within a process: wall-clock ties advance by one microsecond. Row
    /// keys ordered by creation time rely on this to stay collision-free.
    pub fn unique_now() -> Self {
        static LAST: AtomicU64 = AtomicU64::new(0);
        let wall = Self::now().0;
        let mut prev = LAST.load(Ordering::Relaxed);
        loop {
            let next = wall.max(prev + 1).min(Self::MAX.0);
            match LAST.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return Timestamp(next),
                Err(current) => prev = current,
            }
        }
    }

    /// Create a timestamp from microseconds since epoch
    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    /// Create a timestamp from milliseconds since epoch
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis.saturating_mul(1_000))
    }

    /// Create a timestamp from seconds since epoch
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(1_000_000))
    }

    /// Get microseconds since Unix epoch
    #[inline]
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Get seconds since Unix epoch (truncates)
    #[inline]
    pub const fn as_secs(&self) -> u64 {
        self.0 / 1_000_000
    }

    /// Add a duration to this timestamp
    ///
    /// Saturates at `Timestamp::MAX` on overflow.
    pub fn saturating_add(&self, duration: Duration) -> Self {
        let sum = self.0.saturating_add(duration.as_micros() as u64);
        Timestamp(sum.min(Self::MAX.0))
    }

    /// Subtract a duration from this timestamp
    ///
    /// Saturates at `Timestamp::EPOCH` on underflow.
    pub fn saturating_sub(&self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_sub(duration.as_micros() as u64))
    }

    /// Check if this timestamp is before another
    #[inline]
    pub fn is_before(&self, other: Timestamp) -> bool {
        self.0 < other.0
    }

    /// Check if this timestamp is after another
    #[inline]
    pub fn is_after(&self, other: Timestamp) -> bool {
        self.0 > other.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format as "seconds.microseconds" for readability
        let secs = self.0 / 1_000_000;
        let micros = self.0 % 1_000_000;
        write!(f, "{}.{:06}", secs, micros)
    }
}

impl From<u64> for Timestamp {
    /// Create from raw microseconds
    fn from(micros: u64) -> Self {
        Timestamp::from_micros(micros)
    }
}

impl From<Timestamp> for u64 {
    /// Extract raw microseconds
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_epoch() {
        assert_eq!(Timestamp::EPOCH.as_micros(), 0);
        assert_eq!(Timestamp::EPOCH.as_secs(), 0);
    }

    #[test]
    fn test_timestamp_from_secs() {
        let ts = Timestamp::from_secs(1000);
        assert_eq!(ts.as_secs(), 1000);
        assert_eq!(ts.as_micros(), 1_000_000_000);
    }

    #[test]
    fn test_timestamp_from_millis() {
        let ts = Timestamp::from_millis(5000);
        assert_eq!(ts.as_micros(), 5_000_000);
        assert_eq!(ts.as_secs(), 5);
    }

    #[test]
    fn test_timestamp_now() {
        let before = Timestamp::now();
        std::thread::sleep(Duration::from_millis(1));
        let after = Timestamp::now();

        assert!(after > before, "Time should advance");
    }

    #[test]
    fn test_unique_now_never_repeats() {
        let mut stamps: Vec<Timestamp> = (0..1000).map(|_| Timestamp::unique_now()).collect();
        let len = stamps.len();
        stamps.dedup();
        assert_eq!(stamps.len(), len);
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_timestamp_ordering() {
        let t1 = Timestamp::from_micros(100);
        let t2 = Timestamp::from_micros(200);
        let t3 = Timestamp::from_micros(100);

        assert!(t1 < t2);
        assert!(t2 > t1);
        assert_eq!(t1, t3);
        assert!(t1.is_before(t2));
        assert!(t2.is_after(t1));
    }

    #[test]
    fn test_timestamp_saturating_add() {
        let ts = Timestamp::from_micros(1000);
        let added = ts.saturating_add(Duration::from_micros(500));
        assert_eq!(added.as_micros(), 1500);

        // Saturation at MAX keeps the timestamp encodable in 16 digits
        let max_added = Timestamp::MAX.saturating_add(Duration::from_micros(1));
        assert_eq!(max_added, Timestamp::MAX);
    }

    #[test]
    fn test_timestamp_saturating_sub() {
        let ts = Timestamp::from_micros(1000);
        let subtracted = ts.saturating_sub(Duration::from_micros(500));
        assert_eq!(subtracted.as_micros(), 500);

        let epoch_sub = Timestamp::EPOCH.saturating_sub(Duration::from_micros(1));
        assert_eq!(epoch_sub, Timestamp::EPOCH);
    }

    #[test]
    fn test_timestamp_display() {
        let ts = Timestamp::from_micros(1_234_567_890);
        assert_eq!(format!("{}", ts), "1234.567890");
        assert_eq!(format!("{}", Timestamp::EPOCH), "0.000000");
    }

    #[test]
    fn test_timestamp_u64_round_trip() {
        let ts: Timestamp = 12345u64.into();
        assert_eq!(ts.as_micros(), 12345);
        let raw: u64 = ts.into();
        assert_eq!(raw, 12345);
    }

    #[test]
    fn test_timestamp_serialization() {
        let ts = Timestamp::from_micros(1_234_567);
        let json = serde_json::to_string(&ts).unwrap();
        let restored: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, restored);
    }
}
