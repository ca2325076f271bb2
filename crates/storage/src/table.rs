//! One ordered column-family table
//!
//! Rows live in a `BTreeMap` keyed by serialized row key, so iteration
//! order is byte order — the same order the row-key codec is built around.
//! The map is guarded by a `parking_lot::RwLock`: scans take the read lock,
//! mutations the write lock.

use parking_lot::RwLock;
use plume_core::{Error, Result};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Column values for one row: qualifier (`family:fieldname`) → encoded token
pub type RowColumns = BTreeMap<String, String>;

/// An ordered column-family table
#[derive(Debug, Default)]
pub struct Table {
    rows: RwLock<BTreeMap<Vec<u8>, RowColumns>>,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the full column set under a row key, overwriting any previous
    /// column set for that key
    ///
    /// # Errors
    ///
    /// `EmptyColumn` if `columns` is empty — the store never writes a key
    /// with no column data, which would be ambiguous with a tombstone.
    pub fn put(&self, row_key: Vec<u8>, columns: RowColumns) -> Result<()> {
        if columns.is_empty() {
            return Err(Error::EmptyColumn);
        }
        self.rows.write().insert(row_key, columns);
        Ok(())
    }

    /// Read the column set for an exact row key
    pub fn row(&self, row_key: &[u8]) -> Option<RowColumns> {
        self.rows.read().get(row_key).cloned()
    }

    /// Delete a row by exact key. Returns whether a row was removed.
    pub fn delete(&self, row_key: &[u8]) -> bool {
        self.rows.write().remove(row_key).is_some()
    }

    /// Number of rows in the table
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Whether the table holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Walk rows inside `[start, stop)` in key order
    ///
    /// `None` bounds are unbounded on that side. `reverse` walks the range
    /// backward; combined with `limit`, that returns the last `limit`
    /// matching rows in descending key order.
    pub fn range(
        &self,
        start: Option<&[u8]>,
        stop: Option<&[u8]>,
        reverse: bool,
        limit: Option<usize>,
    ) -> Vec<(Vec<u8>, RowColumns)> {
        let rows = self.rows.read();
        let lower = match start {
            Some(key) => Bound::Included(key.to_vec()),
            None => Bound::Unbounded,
        };
        let upper = match stop {
            Some(key) => Bound::Excluded(key.to_vec()),
            None => Bound::Unbounded,
        };
        // An inverted range would panic inside BTreeMap::range
        if let (Some(lo), Some(hi)) = (start, stop) {
            if lo >= hi {
                return Vec::new();
            }
        }

        let iter = rows
            .range::<Vec<u8>, _>((lower, upper))
            .map(|(k, v)| (k.clone(), v.clone()));
        let cap = limit.unwrap_or(usize::MAX);
        if reverse {
            iter.rev().take(cap).collect()
        } else {
            iter.take(cap).collect()
        }
    }
}
