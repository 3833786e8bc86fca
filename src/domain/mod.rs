//! Domain types for the content catalog.
//!
//! - Entry: committed catalog entries and their kinds
//! - Events: creation events and the observable workflow state
//! - Display: presentation fields derived from entries

pub mod display;
pub mod entry;
pub mod events;

// Re-export commonly used types
pub use display::{human_size, DisplayRow};
pub use entry::{ContentEntry, ContentKind, EntryContent, EntryId, EntrySummary};
pub use events::{WorkflowEvent, WorkflowState};
