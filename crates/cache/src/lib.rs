//! Bounded list caching for plume
//!
//! This crate implements the read-side cache:
//! - ListStore: shared per-key string lists with atomic prepend+trim and
//!   passive TTL expiry
//! - BoundedListCache: capacity-bounded write-through cache of serialized
//!   entity snapshots, falling back to an authoritative loader on miss

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bounded;
pub mod list_store;

pub use bounded::BoundedListCache;
pub use list_store::ListStore;
