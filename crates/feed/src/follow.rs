//! Follow-edge reads and writes across two backends
//!
//! Every follow is stored in both directions so either side of the edge
//! can be scanned by its own leading key: a followings row keyed by the
//! follower and a followers row keyed by the followee. A migration gate
//! routes each direction to the relational stand-in or the column store by
//! that direction's leading-key subject, so a read always lands on the
//! backend its rows were written to — even when the two subjects of one
//! edge fall on opposite sides of a partial rollout.

use dashmap::DashMap;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use plume_core::{
    FieldDescriptor, FieldKind, FieldValue, Result, RowValues, Schema, Settings, Timestamp, UserId,
};
use plume_storage::{ColumnStore, Entity, ScanOptions};

use crate::gate::MigrationGate;
use crate::pagination::{Cursor, CursorPaginator, Page};
use crate::tables::{EdgeTable, FollowEdge};

/// Gate switch routing follow-edge storage to the column store
pub const FOLLOW_STORAGE_SWITCH: &str = "follow_storage_backend";

/// Edges keyed by the follower: who does this user follow?
///
/// The leading key token is reversed to spread adjacent user ids across
/// the keyspace; within one user's prefix, rows ascend by creation time.
pub const FOLLOWINGS: Schema = Schema {
    table: "followings",
    row_key: &[
        FieldDescriptor::key_reversed("from_user_id", FieldKind::Integer),
        FieldDescriptor::key("created_at", FieldKind::Timestamp),
    ],
    columns: &[FieldDescriptor::column("to_user_id", FieldKind::Integer, "cf")],
};

/// Edges keyed by the followee: who follows this user?
pub const FOLLOWERS: Schema = Schema {
    table: "followers",
    row_key: &[
        FieldDescriptor::key_reversed("to_user_id", FieldKind::Integer),
        FieldDescriptor::key("created_at", FieldKind::Timestamp),
    ],
    columns: &[FieldDescriptor::column("from_user_id", FieldKind::Integer, "cf")],
};

/// Follow-edge service spanning the relational table and the column store
pub struct FollowService {
    store: Arc<ColumnStore>,
    edges: Arc<EdgeTable>,
    gate: Arc<MigrationGate>,
    paginator: CursorPaginator,
    following_sets: DashMap<UserId, (Instant, Arc<FxHashSet<u64>>)>,
    set_ttl: Duration,
}

impl FollowService {
    /// Create the service and register its column-store tables
    pub fn new(
        store: Arc<ColumnStore>,
        edges: Arc<EdgeTable>,
        gate: Arc<MigrationGate>,
        settings: &Settings,
    ) -> Self {
        store.attach_table(&FOLLOWINGS);
        store.attach_table(&FOLLOWERS);
        Self {
            store,
            edges,
            gate,
            paginator: CursorPaginator::new(settings.page_size),
            following_sets: DashMap::new(),
            set_ttl: settings.cache_ttl(),
        }
    }

    fn on_column_store(&self, subject: UserId) -> bool {
        self.gate.in_rollout(FOLLOW_STORAGE_SWITCH, subject)
    }

    /// Create the edge `from_user -> to_user`
    ///
    /// Self-follows and duplicate follows are no-ops returning false.
    pub fn follow(&self, from_user: UserId, to_user: UserId) -> Result<bool> {
        if from_user == to_user || self.has_followed(from_user, to_user)? {
            return Ok(false);
        }

        let created_at = Timestamp::unique_now();
        let edge = FollowEdge {
            from_user,
            to_user,
            created_at,
        };
        // Each direction table is routed by its own leading-key subject, so
        // every read lands on the backend its rows were written to.
        if self.on_column_store(from_user) {
            debug!(%from_user, %to_user, "writing followings row to column store");
            self.store
                .put(&FOLLOWINGS, &edge_values(from_user, to_user, created_at))?;
        } else {
            self.edges.create(edge);
        }
        if self.on_column_store(to_user) {
            debug!(%from_user, %to_user, "writing followers row to column store");
            self.store
                .put(&FOLLOWERS, &edge_values(from_user, to_user, created_at))?;
        } else {
            // when both subjects are relational the second create is a
            // duplicate no-op; the one row serves both directions
            self.edges.create(edge);
        }
        self.following_sets.remove(&from_user);
        Ok(true)
    }

    /// Delete the edge `from_user -> to_user`. Returns whether one existed.
    pub fn unfollow(&self, from_user: UserId, to_user: UserId) -> Result<bool> {
        let edge = match self.find_edge(from_user, to_user)? {
            Some(edge) => edge,
            None => return Ok(false),
        };
        if self.on_column_store(from_user) {
            self.store.delete(
                &FOLLOWINGS,
                &edge_values(from_user, to_user, edge.created_at),
            )?;
        } else {
            self.edges.delete(from_user, to_user);
        }
        if self.on_column_store(to_user) {
            self.store.delete(
                &FOLLOWERS,
                &edge_values(from_user, to_user, edge.created_at),
            )?;
        } else {
            self.edges.delete(from_user, to_user);
        }
        self.following_sets.remove(&from_user);
        Ok(true)
    }

    /// Whether `from_user` currently follows `to_user`
    ///
    /// Served from a per-user id-set snapshot that follow/unfollow
    /// invalidate, so repeated checks against one user stay cheap. The
    /// snapshot expires after the cache TTL like any other cached list.
    pub fn has_followed(&self, from_user: UserId, to_user: UserId) -> Result<bool> {
        Ok(self.following_set(from_user)?.contains(&to_user.as_u64()))
    }

    /// Ids of everyone `from_user` follows, most recent follow first
    pub fn following_ids(&self, from_user: UserId) -> Result<Vec<UserId>> {
        if self.on_column_store(from_user) {
            let opts = ScanOptions::new()
                .with_prefix(vec![FieldValue::Int(from_user.as_u64())])
                .reversed();
            self.store
                .scan(&FOLLOWINGS, &opts)?
                .iter()
                .map(|entity| entity.user_id("to_user_id"))
                .collect()
        } else {
            Ok(self.edges.following_ids(from_user))
        }
    }

    /// Ids of everyone following `to_user`, most recent follow first
    pub fn follower_ids(&self, to_user: UserId) -> Result<Vec<UserId>> {
        if self.on_column_store(to_user) {
            let opts = ScanOptions::new()
                .with_prefix(vec![FieldValue::Int(to_user.as_u64())])
                .reversed();
            self.store
                .scan(&FOLLOWERS, &opts)?
                .iter()
                .map(|entity| entity.user_id("from_user_id"))
                .collect()
        } else {
            Ok(self.edges.follower_ids(to_user))
        }
    }

    /// One page of `from_user`'s followings, newest first
    pub fn followings(&self, from_user: UserId, cursor: Cursor) -> Result<Page<FollowEdge>> {
        if self.on_column_store(from_user) {
            self.scan_page(&FOLLOWINGS, from_user, cursor, |entity| {
                followings_edge(entity)
            })
        } else {
            Ok(self
                .paginator
                .paginate(&self.edges.followings_of(from_user), cursor))
        }
    }

    /// One page of `to_user`'s followers, newest first
    pub fn followers(&self, to_user: UserId, cursor: Cursor) -> Result<Page<FollowEdge>> {
        if self.on_column_store(to_user) {
            self.scan_page(&FOLLOWERS, to_user, cursor, |entity| followers_edge(entity))
        } else {
            Ok(self
                .paginator
                .paginate(&self.edges.followers_of(to_user), cursor))
        }
    }

    /// Number of users `from_user` follows
    pub fn following_count(&self, from_user: UserId) -> Result<usize> {
        Ok(self.following_ids(from_user)?.len())
    }

    /// Number of users following `to_user`
    pub fn follower_count(&self, to_user: UserId) -> Result<usize> {
        Ok(self.follower_ids(to_user)?.len())
    }

    fn following_set(&self, from_user: UserId) -> Result<Arc<FxHashSet<u64>>> {
        if let Some(entry) = self.following_sets.get(&from_user) {
            let (cached_at, set) = entry.value();
            if cached_at.elapsed() < self.set_ttl {
                return Ok(Arc::clone(set));
            }
        }
        let set: FxHashSet<u64> = self
            .following_ids(from_user)?
            .iter()
            .map(|id| id.as_u64())
            .collect();
        let set = Arc::new(set);
        self.following_sets
            .insert(from_user, (Instant::now(), Arc::clone(&set)));
        Ok(set)
    }

    /// Look an edge up from its followings side
    fn find_edge(&self, from_user: UserId, to_user: UserId) -> Result<Option<FollowEdge>> {
        if self.on_column_store(from_user) {
            let opts =
                ScanOptions::new().with_prefix(vec![FieldValue::Int(from_user.as_u64())]);
            for entity in self.store.scan(&FOLLOWINGS, &opts)? {
                let edge = followings_edge(&entity)?;
                if edge.to_user == to_user {
                    return Ok(Some(edge));
                }
            }
            Ok(None)
        } else {
            Ok(self
                .edges
                .followings_of(from_user)
                .into_iter()
                .find(|edge| edge.to_user == to_user))
        }
    }

    /// Cursor-bounded reversed scan: within one user's prefix, keys ascend
    /// by creation time, so a reversed scan walks newest first and the
    /// cursor maps onto the key-range bounds.
    fn scan_page<F>(
        &self,
        schema: &Schema,
        subject: UserId,
        cursor: Cursor,
        to_edge: F,
    ) -> Result<Page<FollowEdge>>
    where
        F: Fn(&Entity) -> Result<FollowEdge>,
    {
        let page_size = self.paginator.page_size();
        let mut opts = ScanOptions::new()
            .with_prefix(vec![FieldValue::Int(subject.as_u64())])
            .reversed();
        let mut probe = Some(page_size + 1);
        match cursor {
            Cursor::First => {}
            Cursor::OlderThan(ts) => {
                // stop is exclusive, so the cursor row itself is skipped
                opts = opts.with_stop(vec![
                    Some(FieldValue::Int(subject.as_u64())),
                    Some(FieldValue::Timestamp(ts)),
                ]);
            }
            Cursor::NewerThan(ts) => {
                opts = opts.with_start(vec![
                    Some(FieldValue::Int(subject.as_u64())),
                    Some(FieldValue::Timestamp(
                        ts.saturating_add(Duration::from_micros(1)),
                    )),
                ]);
                // refresh pulls are unbounded and never report a next page
                probe = None;
            }
        }
        if let Some(limit) = probe {
            opts = opts.with_limit(limit);
        }

        let entities = self.store.scan(schema, &opts)?;
        let mut results = entities
            .iter()
            .map(to_edge)
            .collect::<Result<Vec<FollowEdge>>>()?;
        let has_next_page = probe.is_some() && results.len() > page_size;
        if probe.is_some() {
            results.truncate(page_size);
        }
        Ok(Page {
            results,
            has_next_page,
        })
    }
}

fn edge_values(from_user: UserId, to_user: UserId, created_at: Timestamp) -> RowValues {
    let mut values = RowValues::new();
    values.insert(
        "from_user_id".to_string(),
        FieldValue::Int(from_user.as_u64()),
    );
    values.insert("to_user_id".to_string(), FieldValue::Int(to_user.as_u64()));
    values.insert(
        "created_at".to_string(),
        FieldValue::Timestamp(created_at),
    );
    values
}

fn followings_edge(entity: &Entity) -> Result<FollowEdge> {
    Ok(FollowEdge {
        from_user: entity.user_id("from_user_id")?,
        to_user: entity.user_id("to_user_id")?,
        created_at: entity.timestamp("created_at")?,
    })
}

fn followers_edge(entity: &Entity) -> Result<FollowEdge> {
    Ok(FollowEdge {
        from_user: entity.user_id("from_user_id")?,
        to_user: entity.user_id("to_user_id")?,
        created_at: entity.timestamp("created_at")?,
    })
}
