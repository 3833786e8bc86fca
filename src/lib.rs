//! ipcs - in-memory personal content catalog
//!
//! A single-owner engine that accepts titled images, videos, texts and
//! generic files through a guided creation workflow, keeps them in an
//! ordered in-memory catalog, and answers search/sort queries over it.
//!
//! # Architecture
//!
//! - Every mutation goes through [`CatalogStore`]; preview and playback
//!   handles are allocated on insert and released on remove
//! - The [`CreationWorkflow`] state machine decides what the next valid
//!   event is and validates content before committing
//! - [`Session`] bundles workflow, store and query state for a view layer;
//!   [`CatalogService`] puts a session behind a command queue
//!
//! # Modules
//!
//! - `domain`: Data structures (ContentEntry, ContentKind, WorkflowState)
//! - `core`: Engine logic (validation, resources, workflow, session)
//! - `library`: Catalog store and queries
//! - `config`: Limits from file and environment
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Replay a session script
//! ipcs run session.txt
//!
//! # Check whether a file would be accepted
//! ipcs check beach.jpg --kind image
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod library;

// Re-export main types at crate root for convenience
pub use crate::core::{
    CatalogHandle, CatalogService, CreationWorkflow, Payload, PayloadSource, Rejection, Session,
    SubmitOutcome, ValidationLimits, WorkflowError,
};
pub use domain::{ContentEntry, ContentKind, EntryContent, EntryId, WorkflowEvent, WorkflowState};
pub use library::{query, CatalogError, CatalogStore, NewEntry, Query, SortDirection, SortKey};
