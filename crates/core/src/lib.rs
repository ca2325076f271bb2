//! Core types for plume
//!
//! This crate defines the foundational types shared by every layer:
//! - Timestamp: Microsecond-precision timestamps
//! - UserId / ContentId: Numeric entity identifiers
//! - FieldValue: Unified scalar value for row-key and column fields
//! - Schema / FieldDescriptor: Statically declared entity schemas
//! - FieldCodec / row-key codec: Order-preserving key encoding
//! - Environment / Settings: Explicit runtime configuration
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod config;
pub mod error;
pub mod rowkey;
pub mod schema;
pub mod timestamp;
pub mod types;
pub mod value;

pub use codec::{decode_field, encode_field, INT_TOKEN_WIDTH, SEPARATOR};
pub use config::{Environment, Settings};
pub use error::{Error, Result};
pub use rowkey::{bound_key, deserialize_row_key, prefix_key, serialize_row_key, RowValues};
pub use schema::{FieldDescriptor, FieldKind, Schema};
pub use timestamp::Timestamp;
pub use types::{ContentId, UserId};
pub use value::FieldValue;
