//! Relational-backend stand-ins for feeds and follow edges
//!
//! These tables model the pre-migration backend: row sets with a unique
//! constraint and ordered queries, the shape an RDBMS would give them. The
//! migration gate routes traffic between these and the column store until
//! a cutover completes.

use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use plume_core::{ContentId, Timestamp, UserId};

use crate::pagination::Chronological;

/// One feed row: a piece of content delivered to an owner's feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Feed owner the content was delivered to
    pub owner: UserId,
    /// Delivered content
    pub content: ContentId,
    /// Content creation time (identical across all deliveries of one post)
    pub created_at: Timestamp,
}

impl Chronological for FeedEntry {
    fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

#[derive(Debug, Default)]
struct FeedRows {
    rows: Vec<(u64, FeedEntry)>,
    seen: FxHashSet<(u64, u64)>,
    next_seq: u64,
}

/// Feed rows with a unique `(owner, content)` constraint
///
/// Queries return descending creation order with insertion order as the
/// tie-break, so two deliveries sharing a timestamp still page stably.
#[derive(Debug, Default)]
pub struct FeedTable {
    inner: RwLock<FeedRows>,
}

impl FeedTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one entry. Returns false if `(owner, content)` already exists.
    pub fn create(&self, entry: FeedEntry) -> bool {
        let mut inner = self.inner.write();
        if !inner.seen.insert((entry.owner.as_u64(), entry.content.as_u64())) {
            return false;
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.rows.push((seq, entry));
        true
    }

    /// Insert a batch, skipping duplicates. Returns the entries that were
    /// actually created, in input order.
    pub fn bulk_create(&self, entries: Vec<FeedEntry>) -> Vec<FeedEntry> {
        let mut inner = self.inner.write();
        let mut created = Vec::with_capacity(entries.len());
        for entry in entries {
            if !inner.seen.insert((entry.owner.as_u64(), entry.content.as_u64())) {
                continue;
            }
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.rows.push((seq, entry.clone()));
            created.push(entry);
        }
        created
    }

    /// All of one owner's entries, newest first
    pub fn entries_for(&self, owner: UserId) -> Vec<FeedEntry> {
        let inner = self.inner.read();
        let mut rows: Vec<&(u64, FeedEntry)> = inner
            .rows
            .iter()
            .filter(|(_, entry)| entry.owner == owner)
            .collect();
        rows.sort_by(|(sa, a), (sb, b)| {
            b.created_at.cmp(&a.created_at).then(sb.cmp(sa))
        });
        rows.into_iter().map(|(_, entry)| entry.clone()).collect()
    }

    /// Whether an `(owner, content)` row exists
    pub fn contains(&self, owner: UserId, content: ContentId) -> bool {
        self.inner
            .read()
            .seen
            .contains(&(owner.as_u64(), content.as_u64()))
    }

    /// Total number of rows
    pub fn len(&self) -> usize {
        self.inner.read().rows.len()
    }

    /// Whether the table holds no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One follow edge: `from_user` follows `to_user`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEdge {
    /// The follower
    pub from_user: UserId,
    /// The followee
    pub to_user: UserId,
    /// When the follow happened
    pub created_at: Timestamp,
}

impl Chronological for FollowEdge {
    fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

#[derive(Debug, Default)]
struct EdgeRows {
    rows: Vec<(u64, FollowEdge)>,
    seen: FxHashSet<(u64, u64)>,
    next_seq: u64,
}

/// Follow edges with a unique `(from_user, to_user)` constraint
#[derive(Debug, Default)]
pub struct EdgeTable {
    inner: RwLock<EdgeRows>,
}

impl EdgeTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one edge. Returns false if the pair already exists.
    pub fn create(&self, edge: FollowEdge) -> bool {
        let mut inner = self.inner.write();
        if !inner.seen.insert((edge.from_user.as_u64(), edge.to_user.as_u64())) {
            return false;
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.rows.push((seq, edge));
        true
    }

    /// Delete the edge for the pair. Returns whether one existed.
    pub fn delete(&self, from_user: UserId, to_user: UserId) -> bool {
        let mut inner = self.inner.write();
        if !inner.seen.remove(&(from_user.as_u64(), to_user.as_u64())) {
            return false;
        }
        inner
            .rows
            .retain(|(_, edge)| !(edge.from_user == from_user && edge.to_user == to_user));
        true
    }

    /// Whether `from_user` currently follows `to_user`
    pub fn has_edge(&self, from_user: UserId, to_user: UserId) -> bool {
        self.inner
            .read()
            .seen
            .contains(&(from_user.as_u64(), to_user.as_u64()))
    }

    /// Edges pointing at `to_user`, newest first
    pub fn followers_of(&self, to_user: UserId) -> Vec<FollowEdge> {
        self.ordered(|edge| edge.to_user == to_user)
    }

    /// Edges originating at `from_user`, newest first
    pub fn followings_of(&self, from_user: UserId) -> Vec<FollowEdge> {
        self.ordered(|edge| edge.from_user == from_user)
    }

    /// Ids of everyone following `to_user`
    pub fn follower_ids(&self, to_user: UserId) -> Vec<UserId> {
        self.followers_of(to_user)
            .into_iter()
            .map(|edge| edge.from_user)
            .collect()
    }

    /// Ids of everyone `from_user` follows
    pub fn following_ids(&self, from_user: UserId) -> Vec<UserId> {
        self.followings_of(from_user)
            .into_iter()
            .map(|edge| edge.to_user)
            .collect()
    }

    /// Total number of edges
    pub fn len(&self) -> usize {
        self.inner.read().rows.len()
    }

    /// Whether the table holds no edges
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ordered<F: Fn(&FollowEdge) -> bool>(&self, keep: F) -> Vec<FollowEdge> {
        let inner = self.inner.read();
        let mut rows: Vec<&(u64, FollowEdge)> =
            inner.rows.iter().filter(|(_, edge)| keep(edge)).collect();
        rows.sort_by(|(sa, a), (sb, b)| {
            b.created_at.cmp(&a.created_at).then(sb.cmp(sa))
        });
        rows.into_iter().map(|(_, edge)| *edge).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(owner: u64, content: u64, micros: u64) -> FeedEntry {
        FeedEntry {
            owner: UserId(owner),
            content: ContentId(content),
            created_at: Timestamp::from_micros(micros),
        }
    }

    fn edge(from: u64, to: u64, micros: u64) -> FollowEdge {
        FollowEdge {
            from_user: UserId(from),
            to_user: UserId(to),
            created_at: Timestamp::from_micros(micros),
        }
    }

    #[test]
    fn test_feed_create_enforces_uniqueness() {
        let table = FeedTable::new();
        assert!(table.create(entry(1, 10, 100)));
        assert!(!table.create(entry(1, 10, 200)));
        assert_eq!(table.len(), 1);
        assert!(table.contains(UserId(1), ContentId(10)));
    }

    #[test]
    fn test_feed_bulk_create_returns_only_new_rows() {
        let table = FeedTable::new();
        table.create(entry(1, 10, 100));
        let created = table.bulk_create(vec![
            entry(1, 10, 100),
            entry(2, 10, 100),
            entry(3, 10, 100),
        ]);
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].owner, UserId(2));
        assert_eq!(created[1].owner, UserId(3));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_feed_entries_newest_first() {
        let table = FeedTable::new();
        table.create(entry(1, 10, 100));
        table.create(entry(1, 11, 300));
        table.create(entry(1, 12, 200));
        table.create(entry(2, 13, 400));

        let entries = table.entries_for(UserId(1));
        let contents: Vec<u64> = entries.iter().map(|e| e.content.as_u64()).collect();
        assert_eq!(contents, vec![11, 12, 10]);
    }

    #[test]
    fn test_feed_ties_break_by_recency_of_insert() {
        let table = FeedTable::new();
        table.create(entry(1, 10, 100));
        table.create(entry(1, 11, 100));
        let contents: Vec<u64> = table
            .entries_for(UserId(1))
            .iter()
            .map(|e| e.content.as_u64())
            .collect();
        assert_eq!(contents, vec![11, 10]);
    }

    #[test]
    fn test_edge_create_delete_round_trip() {
        let table = EdgeTable::new();
        assert!(table.create(edge(1, 2, 100)));
        assert!(!table.create(edge(1, 2, 200)));
        assert!(table.has_edge(UserId(1), UserId(2)));
        assert!(!table.has_edge(UserId(2), UserId(1)));

        assert!(table.delete(UserId(1), UserId(2)));
        assert!(!table.delete(UserId(1), UserId(2)));
        assert!(table.is_empty());
    }

    #[test]
    fn test_edge_followers_and_followings() {
        let table = EdgeTable::new();
        table.create(edge(1, 9, 100));
        table.create(edge(2, 9, 300));
        table.create(edge(3, 9, 200));
        table.create(edge(9, 1, 400));

        assert_eq!(
            table.follower_ids(UserId(9)),
            vec![UserId(2), UserId(3), UserId(1)]
        );
        assert_eq!(table.following_ids(UserId(9)), vec![UserId(1)]);
        assert_eq!(table.followings_of(UserId(1)).len(), 1);
    }
}
