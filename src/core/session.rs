//! The engine as seen by the view layer.
//!
//! A [`Session`] owns the creation workflow, the catalog store (and through
//! it the handle table) and the current search/sort parameters. Every
//! inbound view event maps to one method here; the outbound observations
//! are the workflow state, the current rejection and the queried listing.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, instrument};

use super::resources::{ResourceError, ResourceStats};
use super::source::{Payload, PayloadSource};
use super::validation::Rejection;
use super::workflow::{AcquisitionTicket, CreationWorkflow, SubmitOutcome, WorkflowError};
use crate::config::ResolvedConfig;
use crate::core::clock::MonotonicStamp;
use crate::domain::{
    ContentEntry, ContentKind, DisplayRow, EntryContent, EntryId, EntrySummary, WorkflowEvent,
    WorkflowState,
};
use crate::library::{CatalogError, CatalogStore, Query, Snapshot, SortDirection, SortKey};

/// What an opened entry renders
#[derive(Debug, Clone)]
pub enum Preview {
    Image { reference: String, data: Bytes },
    Video { reference: String, data: Bytes },
    Text { text: String },
    File { name: String, size_bytes: u64 },
}

/// An open full view of one entry.
///
/// Holds its own reference to the bytes it shows, so it stays renderable
/// for as long as it is open even if the entry is removed meanwhile.
#[derive(Debug, Clone)]
pub struct ViewSession {
    pub id: EntryId,
    pub title: String,
    pub kind: ContentKind,
    pub preview: Preview,
}

/// Queried listing over a snapshot
#[derive(Debug, Clone)]
pub struct Listing {
    snapshot: Snapshot,
    query: Query,
}

impl Listing {
    /// Entries that pass the filter, in sorted order
    pub fn entries(&self) -> Vec<&ContentEntry> {
        self.query.run(&self.snapshot)
    }

    pub fn summaries(&self) -> Vec<EntrySummary> {
        self.entries().into_iter().map(ContentEntry::summary).collect()
    }

    pub fn rows(&self) -> Vec<DisplayRow> {
        self.entries()
            .into_iter()
            .map(DisplayRow::from_entry)
            .collect()
    }

    pub fn query(&self) -> &Query {
        &self.query
    }
}

/// Serializable outbound state for the view
#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    pub state: WorkflowState,
    pub title: String,
    pub can_select_kind: bool,
    pub acquiring: bool,
    pub entries: usize,
    pub handles: ResourceStats,
}

/// Engine facade driven by the view layer
#[derive(Debug, Default)]
pub struct Session {
    workflow: CreationWorkflow,
    store: CatalogStore,
    query: Query,
}

impl Session {
    /// Session with default limits on the system clock
    pub fn new() -> Self {
        Self::default()
    }

    /// Session using the configured validation and handle limits
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::with_parts(
            CreationWorkflow::new(config.validation.clone()),
            CatalogStore::with_parts(config.resources.clone(), MonotonicStamp::default()),
        )
    }

    pub fn with_parts(workflow: CreationWorkflow, store: CatalogStore) -> Self {
        Self {
            workflow,
            store,
            query: Query::default(),
        }
    }

    // ------------------------------------------------------------------
    // Creation events
    // ------------------------------------------------------------------

    pub fn begin_creation(&mut self) -> Result<(), WorkflowError> {
        self.workflow.begin()
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), WorkflowError> {
        self.workflow.set_title(title)
    }

    pub fn select_kind(&mut self, kind: ContentKind) -> Result<(), WorkflowError> {
        self.workflow.select_kind(kind)
    }

    pub fn submit_text(&mut self, text: impl Into<String>) -> Result<SubmitOutcome, WorkflowError> {
        self.workflow.submit_text(text, &mut self.store)
    }

    pub fn submit_payload(&mut self, payload: Payload) -> Result<SubmitOutcome, WorkflowError> {
        self.workflow.submit_payload(payload, &mut self.store)
    }

    /// Read a payload from `source` and submit it.
    ///
    /// The read is the single suspension point of a creation; the content
    /// slot is reserved for its whole duration.
    #[instrument(skip_all, fields(source = %source.describe()))]
    pub async fn submit_from(
        &mut self,
        source: &dyn PayloadSource,
    ) -> Result<SubmitOutcome, WorkflowError> {
        let ticket = self.workflow.begin_acquisition()?;
        let read = source.read().await;
        debug!(ok = read.is_ok(), "Payload read finished");
        self.workflow.complete_acquisition(ticket, read, &mut self.store)
    }

    /// Reserve the content slot for a read driven elsewhere
    pub fn begin_acquisition(&mut self) -> Result<AcquisitionTicket, WorkflowError> {
        self.workflow.begin_acquisition()
    }

    pub fn complete_acquisition(
        &mut self,
        ticket: AcquisitionTicket,
        read: anyhow::Result<Payload>,
    ) -> Result<SubmitOutcome, WorkflowError> {
        self.workflow.complete_acquisition(ticket, read, &mut self.store)
    }

    pub fn cancel_creation(&mut self) -> Result<(), WorkflowError> {
        self.workflow.cancel()
    }

    pub fn go_back(&mut self) -> Result<(), WorkflowError> {
        self.workflow.back()
    }

    /// Apply any creation event
    pub fn apply(&mut self, event: WorkflowEvent) -> Result<Option<SubmitOutcome>, WorkflowError> {
        self.workflow.handle(event, &mut self.store)
    }

    // ------------------------------------------------------------------
    // Browsing events
    // ------------------------------------------------------------------

    /// Remove an entry; its handles are released before this returns
    pub fn remove_entry(&mut self, id: EntryId) -> Result<Arc<ContentEntry>, CatalogError> {
        self.store.remove(id)
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.query.search = text.into();
    }

    pub fn set_sort(&mut self, key: SortKey, direction: SortDirection) {
        self.query.sort_key = key;
        self.query.direction = direction;
    }

    pub fn set_kind_filter(&mut self, kind: Option<ContentKind>) {
        self.query.kind = kind;
    }

    /// Open the full view of an entry
    pub fn open(&self, id: EntryId) -> Result<ViewSession, CatalogError> {
        let entry = self.store.get(id)?;

        let preview = match entry.content() {
            EntryContent::Image { preview, .. } => Preview::Image {
                reference: preview.reference(),
                data: self.store.resolve(preview)?,
            },
            EntryContent::Video { playback, .. } => Preview::Video {
                reference: playback.reference(),
                data: self.store.resolve(playback)?,
            },
            EntryContent::Text { text } => Preview::Text { text: text.clone() },
            EntryContent::Generic { .. } => Preview::File {
                name: entry.original_name().to_string(),
                size_bytes: entry.size_bytes(),
            },
        };

        Ok(ViewSession {
            id,
            title: entry.title().to_string(),
            kind: entry.kind(),
            preview,
        })
    }

    /// Dereference a handle held by the view
    pub fn resolve(&self, handle: &super::resources::Handle) -> Result<Bytes, ResourceError> {
        self.store.resolve(handle)
    }

    /// Remove every entry and release every handle
    pub fn clear(&mut self) -> usize {
        self.store.clear()
    }

    // ------------------------------------------------------------------
    // Observations
    // ------------------------------------------------------------------

    pub fn state(&self) -> &WorkflowState {
        self.workflow.state()
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        self.workflow.state().rejection()
    }

    pub fn title(&self) -> &str {
        self.workflow.title()
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Current store contents under the current search and sort
    pub fn listing(&self) -> Listing {
        Listing {
            snapshot: self.store.snapshot(),
            query: self.query.clone(),
        }
    }

    pub fn get(&self, id: EntryId) -> Result<&ContentEntry, CatalogError> {
        self.store.get(id)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn resource_stats(&self) -> ResourceStats {
        self.store.resource_stats()
    }

    pub fn observe(&self) -> Observation {
        Observation {
            state: self.workflow.state().clone(),
            title: self.workflow.title().to_string(),
            can_select_kind: self.workflow.state().can_select_kind(),
            acquiring: self.workflow.is_acquiring(),
            entries: self.store.len(),
            handles: self.store.resource_stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_text(session: &mut Session, title: &str, text: &str) -> EntryId {
        session.begin_creation().unwrap();
        session.set_title(title).unwrap();
        session.select_kind(ContentKind::Text).unwrap();
        match session.submit_text(text).unwrap() {
            SubmitOutcome::Committed(id) => id,
            other => panic!("expected commit, got {:?}", other),
        }
    }

    #[test]
    fn test_listing_follows_query_parameters() {
        let mut session = Session::new();
        create_text(&mut session, "A", "first");
        create_text(&mut session, "B", "second");

        session.set_sort(SortKey::CreatedAt, SortDirection::Descending);
        let titles: Vec<_> = session
            .listing()
            .entries()
            .iter()
            .map(|e| e.title().to_string())
            .collect();
        assert_eq!(titles, vec!["B", "A"]);

        session.set_search_text("a");
        assert_eq!(session.listing().entries().len(), 1);
    }

    #[test]
    fn test_open_view_survives_removal() {
        let mut session = Session::new();
        session.begin_creation().unwrap();
        session.set_title("Pic").unwrap();
        session.select_kind(ContentKind::Image).unwrap();
        let payload = Payload::new("pic.gif", &b"GIF89a"[..], Some(mime::IMAGE_GIF));
        let SubmitOutcome::Committed(id) = session.submit_payload(payload).unwrap() else {
            panic!("expected commit");
        };

        let view = session.open(id).unwrap();
        let removed = session.remove_entry(id).unwrap();

        // The view keeps what it renders; the handle itself is gone
        match &view.preview {
            Preview::Image { data, .. } => assert_eq!(&data[..], b"GIF89a"),
            other => panic!("expected image preview, got {:?}", other),
        }
        let handle = removed.preview_handle().unwrap();
        assert!(matches!(
            session.resolve(handle),
            Err(ResourceError::Released(_))
        ));
        assert!(session.open(id).is_err());
    }

    #[test]
    fn test_observe() {
        let mut session = Session::new();
        session.begin_creation().unwrap();
        session.set_title("Draft").unwrap();

        let observation = session.observe();
        assert!(observation.can_select_kind);
        assert_eq!(observation.title, "Draft");
        assert_eq!(observation.entries, 0);
    }

    #[tokio::test]
    async fn test_submit_from_source() {
        let mut session = Session::new();
        session.begin_creation().unwrap();
        session.set_title("Clip").unwrap();
        session.select_kind(ContentKind::Video).unwrap();

        let source = Payload::new("clip.mp4", &b"ftypmp42"[..], Some("video/mp4".parse().unwrap()));
        let outcome = session.submit_from(&source).await.unwrap();

        let SubmitOutcome::Committed(id) = outcome else {
            panic!("expected commit, got {:?}", outcome);
        };
        let entry = session.get(id).unwrap();
        assert!(entry.playback_handle().is_some());
        assert_eq!(session.resource_stats().live, 1);
    }
}
