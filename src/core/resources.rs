//! Resource lifecycle for derived payload handles.
//!
//! A handle is a cheap, dereferenceable reference to the bytes of an
//! image or video payload, used by the view for previews and playback
//! without copying the payload. Every live handle pins its payload, so the
//! manager keeps an explicit table and every allocation must be paired with
//! exactly one release.
//!
//! Releasing a handle twice is rejected with
//! [`ResourceError::AlreadyReleased`]; it never silently succeeds.

use std::collections::{HashMap, HashSet};
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Scheme prefix of handle reference strings
pub const HANDLE_SCHEME: &str = "blob:ipcs/";

/// What a handle is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleKind {
    /// Thumbnail/full view of an image
    Preview,

    /// Streamed playback of a video
    Playback,
}

/// Reference to a payload held in the [`ResourceManager`] table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    id: Uuid,
    kind: HandleKind,
}

impl Handle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Stable reference string the view can bind to (`blob:ipcs/<uuid>`)
    pub fn reference(&self) -> String {
        format!("{}{}", HANDLE_SCHEME, self.id)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", HANDLE_SCHEME, self.id)
    }
}

/// Caps on what the handle table may pin at once
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Maximum number of live handles (unlimited when absent)
    #[serde(default)]
    pub max_live_handles: Option<usize>,

    /// Maximum total bytes pinned by live handles (unlimited when absent)
    #[serde(default)]
    pub max_pinned_bytes: Option<u64>,
}

/// Handle table errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("Handle table exhausted: {live} live handles, {pinned_bytes} bytes pinned")]
    Exhausted { live: usize, pinned_bytes: u64 },

    #[error("Handle already released: {0}")]
    AlreadyReleased(Uuid),

    #[error("Handle has been released: {0}")]
    Released(Uuid),

    #[error("Unknown handle: {0}")]
    Unknown(Uuid),
}

/// Counters over the lifetime of a manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceStats {
    pub live: usize,
    pub allocated: u64,
    pub released: u64,
    pub pinned_bytes: u64,
}

struct Slot {
    kind: HandleKind,
    data: Bytes,
}

/// Owner of the handle table
#[derive(Default)]
pub struct ResourceManager {
    limits: ResourceLimits,
    live: HashMap<Uuid, Slot>,
    /// Every id ever released. Grows for the life of the manager; it is
    /// what lets a second release report `AlreadyReleased` instead of `Unknown`.
    released: HashSet<Uuid>,
    allocated_total: u64,
    pinned_bytes: u64,
}

impl fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("limits", &self.limits)
            .field("stats", &self.stats())
            .finish()
    }
}

impl ResourceManager {
    /// Create a manager without caps
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager with the given caps
    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self {
            limits,
            ..Default::default()
        }
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Allocate a handle pinning `data`.
    ///
    /// The bytes are shared, not copied; the handle stays dereferenceable
    /// until [`release`](Self::release) is called for it.
    pub fn allocate(&mut self, kind: HandleKind, data: &Bytes) -> Result<Handle, ResourceError> {
        let len = data.len() as u64;

        let over_count = self
            .limits
            .max_live_handles
            .is_some_and(|max| self.live.len() >= max);
        let over_bytes = self
            .limits
            .max_pinned_bytes
            .is_some_and(|max| self.pinned_bytes + len > max);

        if over_count || over_bytes {
            return Err(ResourceError::Exhausted {
                live: self.live.len(),
                pinned_bytes: self.pinned_bytes,
            });
        }

        let id = Uuid::new_v4();
        self.live.insert(
            id,
            Slot {
                kind,
                data: data.clone(),
            },
        );
        self.allocated_total += 1;
        self.pinned_bytes += len;

        debug!(handle = %id, ?kind, bytes = len, "Handle allocated");
        Ok(Handle { id, kind })
    }

    /// Invalidate a handle and unpin its payload
    pub fn release(&mut self, handle: &Handle) -> Result<(), ResourceError> {
        match self.live.remove(&handle.id) {
            Some(slot) => {
                self.pinned_bytes -= slot.data.len() as u64;
                self.released.insert(handle.id);
                debug!(handle = %handle.id, kind = ?slot.kind, "Handle released");
                Ok(())
            }
            None if self.released.contains(&handle.id) => {
                warn!(handle = %handle.id, "Rejected double release");
                Err(ResourceError::AlreadyReleased(handle.id))
            }
            None => Err(ResourceError::Unknown(handle.id)),
        }
    }

    /// Dereference a handle to the bytes it pins
    pub fn resolve(&self, handle: &Handle) -> Result<Bytes, ResourceError> {
        match self.live.get(&handle.id) {
            Some(slot) => Ok(slot.data.clone()),
            None if self.released.contains(&handle.id) => Err(ResourceError::Released(handle.id)),
            None => Err(ResourceError::Unknown(handle.id)),
        }
    }

    pub fn is_live(&self, handle: &Handle) -> bool {
        self.live.contains_key(&handle.id)
    }

    /// Release every live handle; returns how many were released
    pub fn release_all(&mut self) -> usize {
        let count = self.live.len();
        for (id, _) in self.live.drain() {
            self.released.insert(id);
        }
        self.pinned_bytes = 0;
        if count > 0 {
            debug!(count, "Released all handles");
        }
        count
    }

    pub fn stats(&self) -> ResourceStats {
        ResourceStats {
            live: self.live.len(),
            allocated: self.allocated_total,
            released: self.released.len() as u64,
            pinned_bytes: self.pinned_bytes,
        }
    }
}
