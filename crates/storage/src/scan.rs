//! Scan requests over a column-family table
//!
//! A scan is described by partial row-key tuples: `start`/`stop` bound the
//! key range (a trailing `None` element is the unbounded sentinel, sorting
//! after any concretely-valued key with the same leading fields), `prefix`
//! fixes leading fields exactly, `limit` caps the row count, and `reverse`
//! walks the ordered table backward.

use plume_core::{bound_key, prefix_key, FieldValue, Result, Schema};

/// Options for a range/prefix scan
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Inclusive lower bound as a partial key tuple
    pub start: Option<Vec<Option<FieldValue>>>,
    /// Exclusive upper bound as a partial key tuple
    pub stop: Option<Vec<Option<FieldValue>>>,
    /// Leading row-key fields that must match exactly
    pub prefix: Option<Vec<FieldValue>>,
    /// Maximum number of rows to return
    pub limit: Option<usize>,
    /// Walk the ordered table backward (descending key order)
    pub reverse: bool,
}

impl ScanOptions {
    /// A scan with no constraints
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain to keys whose leading fields equal the given values
    pub fn with_prefix(mut self, prefix: Vec<FieldValue>) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Inclusive lower bound
    pub fn with_start(mut self, start: Vec<Option<FieldValue>>) -> Self {
        self.start = Some(start);
        self
    }

    /// Exclusive upper bound
    pub fn with_stop(mut self, stop: Vec<Option<FieldValue>>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Cap the number of returned rows
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Walk backward
    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Resolve the options into byte-range bounds `[start, stop)`
    ///
    /// Prefix and explicit bounds combine: the effective range is the
    /// intersection of the prefix's cover and the explicit bounds.
    pub fn resolve(&self, schema: &Schema) -> Result<(Option<Vec<u8>>, Option<Vec<u8>>)> {
        let mut start = match &self.start {
            Some(tuple) => bound_key(schema, tuple)?,
            None => None,
        };
        let mut stop = match &self.stop {
            Some(tuple) => bound_key(schema, tuple)?,
            None => None,
        };

        if let Some(prefix) = &self.prefix {
            if !prefix.is_empty() {
                let lower = prefix_key(schema, prefix)?;
                let upper = prefix_successor(lower.clone());
                start = Some(match start {
                    Some(s) if s > lower => s,
                    _ => lower,
                });
                stop = match (stop, upper) {
                    (Some(s), Some(u)) => Some(s.min(u)),
                    (None, u) => u,
                    (s, None) => s,
                };
            }
        }
        Ok((start, stop))
    }
}

/// Smallest byte string greater than every string starting with `prefix`
///
/// Increments the last incrementable byte and truncates; a prefix of all
/// 0xFF bytes has no successor (unbounded above).
fn prefix_successor(mut prefix: Vec<u8>) -> Option<Vec<u8>> {
    while let Some(last) = prefix.last_mut() {
        if *last < u8::MAX {
            *last += 1;
            return Some(prefix);
        }
        prefix.pop();
    }
    None
}
