//! The catalog of committed entries and queries over it.
//!
//! - `catalog`: the store, its snapshots, and the handle table it owns
//! - `query`: search, kind filter and stable sort over a snapshot

pub mod catalog;
pub mod query;

pub use catalog::{CatalogError, CatalogStore, NewContent, NewEntry, Snapshot};
pub use query::{query, Query, SortDirection, SortKey};
