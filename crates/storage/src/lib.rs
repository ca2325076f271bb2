//! Ordered column-family storage for plume
//!
//! This crate implements the column store backend:
//! - Table: one ordered column-family table (BTreeMap under RwLock)
//! - ScanOptions: range/prefix scan requests with the None sentinel
//! - ColumnStore: environment-namespaced table registry with CRUD + scan
//! - Entity: decoded row returned by reads and scans

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entity;
pub mod scan;
pub mod store;
pub mod table;

pub use entity::Entity;
pub use scan::ScanOptions;
pub use store::ColumnStore;
pub use table::{RowColumns, Table};
