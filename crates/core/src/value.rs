//! Unified scalar value for row-key and column fields

use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar value stored in a row-key field or a column
///
/// The codec is a bijection on this type's declared domain: integers in
/// `0..=9_999_999_999_999_999` (16 decimal digits) and timestamps up to
/// `Timestamp::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldValue {
    /// Unsigned integer (user ids, content ids)
    Int(u64),
    /// Microsecond timestamp
    Timestamp(Timestamp),
}

impl FieldValue {
    /// The integer value, if this is an `Int`
    pub fn as_int(&self) -> Option<u64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            FieldValue::Timestamp(_) => None,
        }
    }

    /// The timestamp value, if this is a `Timestamp`
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            FieldValue::Int(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Timestamp(ts) => write!(f, "{}", ts.as_micros()),
        }
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(ts: Timestamp) -> Self {
        FieldValue::Timestamp(ts)
    }
}
