//! Error types for plume
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! Encoding/validation errors are local and immediate: they fail the single
//! operation that produced them and are never retried. Asynchronous fanout
//! failures are isolated per batch and surfaced through the task queue, not
//! through this enum.

use thiserror::Error;

/// Result type alias for plume operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the storage and feed-delivery core
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A row-key field is missing at encode time, or an encoded token would
    /// contain the reserved separator. Never retried.
    #[error("Bad row key: {0}")]
    BadRowKey(String),

    /// An entity has no column data to persist. A key with no columns is
    /// ambiguous with a tombstone, so the write is rejected outright.
    #[error("Entity has no column data to persist")]
    EmptyColumn,

    /// A scalar value cannot be encoded or decoded by the field codec
    #[error("Codec error for field '{field}': {reason}")]
    Codec {
        /// Name of the offending field
        field: String,
        /// Why the value could not be encoded or decoded
        reason: String,
    },

    /// Operation against a table that has not been created
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Privileged lifecycle operation attempted in a production environment
    #[error("Operation '{0}' is not allowed outside the testing environment")]
    ProductionForbidden(&'static str),

    /// Cache entry snapshot could not be serialized or deserialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}
