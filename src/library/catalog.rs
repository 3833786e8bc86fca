//! Authoritative in-memory collection of catalog entries.
//!
//! The store owns the handle table: `insert` allocates the handles an entry
//! needs before it becomes visible, and `remove` releases them before the
//! entry is handed back. Nothing else allocates or releases handles.

use std::collections::BTreeSet;
use std::ops::Deref;
use std::sync::Arc;

use bytes::Bytes;
use mime::Mime;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::clock::{Clock, MonotonicStamp};
use crate::core::resources::{
    Handle, HandleKind, ResourceError, ResourceLimits, ResourceManager, ResourceStats,
};
use crate::domain::{ContentEntry, ContentKind, EntryContent, EntryId};

/// Catalog store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Entry not found: {0}")]
    NotFound(EntryId),

    #[error("Entry id already in use: {0}")]
    IdCollision(EntryId),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Validated content waiting to be committed
#[derive(Debug, Clone)]
pub enum NewContent {
    Image { data: Bytes, media_type: Mime },
    Video { data: Bytes, media_type: Mime },
    Text { text: String },
    Generic { data: Bytes, media_type: Option<Mime> },
}

impl NewContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            NewContent::Image { .. } => ContentKind::Image,
            NewContent::Video { .. } => ContentKind::Video,
            NewContent::Text { .. } => ContentKind::Text,
            NewContent::Generic { .. } => ContentKind::Generic,
        }
    }
}

/// Everything needed to commit an entry except its id and timestamp
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub title: String,
    pub original_name: String,
    pub content: NewContent,
    pub tags: BTreeSet<String>,
}

impl NewEntry {
    /// Typed text entry, named `<title>.txt`
    pub fn text(title: impl Into<String>, text: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            original_name: format!("{}.txt", title),
            title,
            content: NewContent::Text { text: text.into() },
            tags: BTreeSet::new(),
        }
    }

    /// Entry with uploaded content
    pub fn upload(
        title: impl Into<String>,
        original_name: impl Into<String>,
        content: NewContent,
    ) -> Self {
        Self {
            title: title.into(),
            original_name: original_name.into(),
            content,
            tags: BTreeSet::new(),
        }
    }
}

/// Point-in-time, insertion-ordered view of the store.
///
/// Holds its own references to the entries, so later inserts and removals
/// never change a snapshot already handed out.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Arc<[Arc<ContentEntry>]>,
}

impl Snapshot {
    pub fn iter(&self) -> impl Iterator<Item = &ContentEntry> {
        self.entries.iter().map(Deref::deref)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ContentEntry> {
        self.entries.get(index).map(Deref::deref)
    }
}

/// In-memory catalog of committed entries
#[derive(Debug)]
pub struct CatalogStore {
    entries: Vec<Arc<ContentEntry>>,
    next_id: u64,
    resources: ResourceManager,
    stamp: MonotonicStamp,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore {
    /// Create an empty store on the system clock with no handle caps
    pub fn new() -> Self {
        Self::with_parts(ResourceLimits::default(), MonotonicStamp::default())
    }

    /// Create an empty store with a custom clock
    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self::with_parts(ResourceLimits::default(), MonotonicStamp::new(clock))
    }

    /// Create an empty store with explicit handle caps and timestamp source
    pub fn with_parts(limits: ResourceLimits, stamp: MonotonicStamp) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            resources: ResourceManager::with_limits(limits),
            stamp,
        }
    }

    /// Commit a validated entry.
    ///
    /// Allocates the preview (image) or playback (video) handle first; if
    /// that fails nothing is inserted and no id is consumed.
    pub fn insert(&mut self, new: NewEntry) -> Result<EntryId, CatalogError> {
        let content = match new.content {
            NewContent::Image { data, media_type } => {
                let preview = self.resources.allocate(HandleKind::Preview, &data)?;
                EntryContent::Image {
                    data,
                    media_type,
                    preview,
                }
            }
            NewContent::Video { data, media_type } => {
                let playback = self.resources.allocate(HandleKind::Playback, &data)?;
                EntryContent::Video {
                    data,
                    media_type,
                    playback,
                }
            }
            NewContent::Text { text } => EntryContent::Text { text },
            NewContent::Generic { data, media_type } => EntryContent::Generic { data, media_type },
        };

        let id = EntryId::new(self.next_id);
        if self.position(id).is_some() {
            for handle in content.handles() {
                if let Err(e) = self.resources.release(handle) {
                    warn!(%id, error = %e, "Handle release failed after id collision");
                }
            }
            return Err(CatalogError::IdCollision(id));
        }
        self.next_id += 1;

        let entry = ContentEntry::new(
            id,
            new.title,
            new.original_name,
            self.stamp.next(),
            content,
            new.tags,
        );

        info!(
            %id,
            kind = %entry.kind(),
            size_bytes = entry.size_bytes(),
            "Entry committed"
        );
        self.entries.push(Arc::new(entry));
        Ok(id)
    }

    /// Remove an entry, releasing its handles before returning it
    pub fn remove(&mut self, id: EntryId) -> Result<Arc<ContentEntry>, CatalogError> {
        let pos = self.position(id).ok_or(CatalogError::NotFound(id))?;
        let entry = self.entries.remove(pos);

        for handle in entry.content().handles() {
            if let Err(e) = self.resources.release(handle) {
                warn!(%id, error = %e, "Handle release failed during removal");
            }
        }

        info!(%id, "Entry removed");
        Ok(entry)
    }

    /// Look up an entry by id
    pub fn get(&self, id: EntryId) -> Result<&ContentEntry, CatalogError> {
        self.position(id)
            .map(|pos| self.entries[pos].as_ref())
            .ok_or(CatalogError::NotFound(id))
    }

    /// Insertion-ordered snapshot of all entries
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            entries: self.entries.iter().cloned().collect(),
        }
    }

    /// Dereference a handle owned by one of this store's entries
    pub fn resolve(&self, handle: &Handle) -> Result<Bytes, ResourceError> {
        self.resources.resolve(handle)
    }

    pub fn resource_stats(&self) -> ResourceStats {
        self.resources.stats()
    }

    /// Remove every entry and release every handle; returns entries removed
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        let released = self.resources.release_all();
        if count > 0 {
            info!(count, released, "Catalog cleared");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }
}

impl Drop for CatalogStore {
    fn drop(&mut self) {
        self.resources.release_all();
    }
}
