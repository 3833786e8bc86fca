//! Creation workflow state machine.
//!
//! ```text
//! Idle ──begin──► AwaitingTitle ──title──► AwaitingKind ──kind──► AwaitingContent(k)
//!                      ▲                        ▲   │                   │
//!                      └─────────back───────────┘   └◄──────back────────┤
//!                                                                       │ submit
//!                                                                       ▼
//!   Idle ◄──begin── Committed(id) ◄──ok── Validating(k) ──refused──► Rejected(k, reason)
//! ```
//!
//! Kind selection is unreachable without a non-empty title. Any active state
//! accepts `cancel`, which returns to `Idle` and drops everything entered.
//! Only one creation is in flight per workflow: `begin` while a creation is
//! active is refused with [`WorkflowError::AlreadyInProgress`].
//!
//! Payload reads may suspend. [`CreationWorkflow::begin_acquisition`] hands
//! out a ticket and moves to `Validating`; a result delivered with a ticket
//! that was cancelled or superseded is dropped without committing.

use thiserror::Error;
use tracing::{debug, info, warn};

use super::source::Payload;
use super::validation::{Candidate, Rejection, ValidationLimits};
use crate::domain::{ContentKind, EntryId, WorkflowEvent, WorkflowState};
use crate::library::{CatalogError, CatalogStore, NewContent, NewEntry};

/// Creation events refused by the state machine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("A creation is already in progress (state: {state})")]
    AlreadyInProgress { state: &'static str },

    #[error("Event '{event}' is not accepted in state {state}")]
    InvalidEvent {
        event: &'static str,
        state: &'static str,
    },

    #[error("Text content cannot be submitted for kind {kind}")]
    ContentMismatch { kind: ContentKind },

    #[error("A payload read is already in flight")]
    AcquisitionInFlight,

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Result of a content submission that reached validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Entry was validated and inserted
    Committed(EntryId),

    /// Entry was refused; the workflow is in `Rejected`
    Rejected(Rejection),

    /// Result of a cancelled or superseded read; nothing happened
    Abandoned,
}

/// Permission to deliver one asynchronously read payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionTicket {
    generation: u64,
    kind: ContentKind,
}

impl AcquisitionTicket {
    pub fn kind(&self) -> ContentKind {
        self.kind
    }
}

/// Drives one creation at a time from title to commit
#[derive(Debug, Default)]
pub struct CreationWorkflow {
    state: WorkflowState,
    title: String,
    limits: ValidationLimits,
    /// Bumped on every begin/cancel so stale tickets can be recognised
    generation: u64,
    in_flight: Option<u64>,
}

impl CreationWorkflow {
    pub fn new(limits: ValidationLimits) -> Self {
        Self {
            limits,
            ..Default::default()
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Title entered so far (preserved across back and rejection)
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    /// Whether a payload read is outstanding
    pub fn is_acquiring(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Apply a synchronous event
    pub fn handle(
        &mut self,
        event: WorkflowEvent,
        store: &mut CatalogStore,
    ) -> Result<Option<SubmitOutcome>, WorkflowError> {
        match event {
            WorkflowEvent::Begin => self.begin().map(|_| None),
            WorkflowEvent::SetTitle(title) => self.set_title(title).map(|_| None),
            WorkflowEvent::SelectKind(kind) => self.select_kind(kind).map(|_| None),
            WorkflowEvent::SubmitText(text) => self.submit_text(text, store).map(Some),
            WorkflowEvent::SubmitPayload(payload) => self.submit_payload(payload, store).map(Some),
            WorkflowEvent::Back => self.back().map(|_| None),
            WorkflowEvent::Cancel => self.cancel().map(|_| None),
        }
    }

    /// Start a new creation from `Idle` or after a commit
    pub fn begin(&mut self) -> Result<(), WorkflowError> {
        if self.state.is_active() {
            return Err(WorkflowError::AlreadyInProgress {
                state: self.state.name(),
            });
        }

        self.reset();
        self.transition(WorkflowState::AwaitingTitle);
        Ok(())
    }

    /// Replace the title.
    ///
    /// A non-empty title unlocks kind selection; clearing it while choosing
    /// a kind locks it again.
    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), WorkflowError> {
        let title = title.into();
        let present = !title.trim().is_empty();

        match self.state {
            WorkflowState::AwaitingTitle => {
                self.title = title;
                if present {
                    self.transition(WorkflowState::AwaitingKind);
                }
            }
            WorkflowState::AwaitingKind => {
                self.title = title;
                if !present {
                    self.transition(WorkflowState::AwaitingTitle);
                }
            }
            WorkflowState::AwaitingContent { .. } | WorkflowState::Rejected { .. } => {
                self.title = title;
            }
            _ => return Err(self.invalid("set_title")),
        }
        Ok(())
    }

    /// Choose the content kind; only possible once a title is present
    pub fn select_kind(&mut self, kind: ContentKind) -> Result<(), WorkflowError> {
        if !self.state.can_select_kind() {
            return Err(self.invalid("select_kind"));
        }
        self.transition(WorkflowState::AwaitingContent { kind });
        Ok(())
    }

    /// Step back without losing the title
    pub fn back(&mut self) -> Result<(), WorkflowError> {
        match self.state {
            WorkflowState::AwaitingContent { .. } | WorkflowState::Rejected { .. } => {
                self.transition(WorkflowState::AwaitingKind);
            }
            WorkflowState::AwaitingKind => self.transition(WorkflowState::AwaitingTitle),
            _ => return Err(self.invalid("back")),
        }
        Ok(())
    }

    /// Abandon the creation, including any read in flight
    pub fn cancel(&mut self) -> Result<(), WorkflowError> {
        if !self.state.is_active() {
            return Err(self.invalid("cancel"));
        }

        if self.in_flight.is_some() {
            debug!("Cancelling with a payload read in flight");
        }
        self.reset();
        self.transition(WorkflowState::Idle);
        Ok(())
    }

    /// Submit the typed text buffer for a text entry
    pub fn submit_text(
        &mut self,
        text: impl Into<String>,
        store: &mut CatalogStore,
    ) -> Result<SubmitOutcome, WorkflowError> {
        let kind = self.content_kind("submit_text")?;
        if kind != ContentKind::Text {
            return Err(WorkflowError::ContentMismatch { kind });
        }

        let text = text.into();
        self.transition(WorkflowState::Validating { kind });
        let verdict = self
            .limits
            .validate(kind, &self.title, Candidate::Text(&text));

        let title = self.title.trim().to_string();
        self.conclude(kind, verdict.map(|_| NewEntry::text(title, text)), store)
    }

    /// Submit a payload that has already been read
    pub fn submit_payload(
        &mut self,
        payload: Payload,
        store: &mut CatalogStore,
    ) -> Result<SubmitOutcome, WorkflowError> {
        let kind = self.content_kind("submit_payload")?;
        self.transition(WorkflowState::Validating { kind });
        self.validate_payload(kind, payload, store)
    }

    /// Reserve the content slot for an asynchronous read
    pub fn begin_acquisition(&mut self) -> Result<AcquisitionTicket, WorkflowError> {
        let kind = self.content_kind("begin_acquisition")?;

        // Every read gets its own generation so an earlier ticket never matches
        self.generation += 1;
        self.in_flight = Some(self.generation);
        self.transition(WorkflowState::Validating { kind });
        Ok(AcquisitionTicket {
            generation: self.generation,
            kind,
        })
    }

    /// Deliver the result of a read started with `begin_acquisition`
    pub fn complete_acquisition(
        &mut self,
        ticket: AcquisitionTicket,
        read: anyhow::Result<Payload>,
        store: &mut CatalogStore,
    ) -> Result<SubmitOutcome, WorkflowError> {
        if self.in_flight != Some(ticket.generation) {
            warn!(kind = %ticket.kind, "Dropping payload read for an abandoned creation");
            return Ok(SubmitOutcome::Abandoned);
        }
        self.in_flight = None;

        match read {
            Ok(payload) => self.validate_payload(ticket.kind, payload, store),
            Err(e) => {
                let reason = Rejection::ReadFailed {
                    message: format!("{:#}", e),
                };
                Ok(self.reject(ticket.kind, reason))
            }
        }
    }

    fn validate_payload(
        &mut self,
        kind: ContentKind,
        payload: Payload,
        store: &mut CatalogStore,
    ) -> Result<SubmitOutcome, WorkflowError> {
        let title = self.title.trim().to_string();

        let prepared = if kind == ContentKind::Text {
            // Uploaded text files are decoded and then held to the text rules
            match String::from_utf8(payload.data.to_vec()) {
                Ok(text) => self
                    .limits
                    .validate(kind, &self.title, Candidate::Text(&text))
                    .map(|_| NewEntry::upload(title, payload.name, NewContent::Text { text })),
                Err(_) if self.title.trim().is_empty() => Err(Rejection::MissingTitle),
                Err(_) => Err(Rejection::UnsupportedFormat {
                    media_type: "text (invalid UTF-8)".to_string(),
                }),
            }
        } else {
            self.limits
                .validate(
                    kind,
                    &self.title,
                    Candidate::Payload {
                        len: payload.len(),
                        media_type: payload.media_type.as_ref(),
                    },
                )
                .and_then(|_| binary_content(kind, payload.data, payload.media_type))
                .map(|content| NewEntry::upload(title, payload.name, content))
        };

        self.conclude(kind, prepared, store)
    }

    /// Commit a validated entry or record the rejection
    fn conclude(
        &mut self,
        kind: ContentKind,
        prepared: Result<NewEntry, Rejection>,
        store: &mut CatalogStore,
    ) -> Result<SubmitOutcome, WorkflowError> {
        let new_entry = match prepared {
            Ok(new_entry) => new_entry,
            Err(reason) => return Ok(self.reject(kind, reason)),
        };

        match store.insert(new_entry) {
            Ok(id) => {
                self.reset();
                self.transition(WorkflowState::Committed { id });
                Ok(SubmitOutcome::Committed(id))
            }
            Err(CatalogError::Resource(e)) => {
                let reason = Rejection::ResourceError {
                    message: e.to_string(),
                };
                Ok(self.reject(kind, reason))
            }
            Err(e) => {
                self.transition(WorkflowState::AwaitingContent { kind });
                Err(e.into())
            }
        }
    }

    fn reject(&mut self, kind: ContentKind, reason: Rejection) -> SubmitOutcome {
        info!(%kind, %reason, "Creation rejected");
        self.transition(WorkflowState::Rejected {
            kind,
            reason: reason.clone(),
        });
        SubmitOutcome::Rejected(reason)
    }

    /// Kind of the content slot, if the state accepts content
    fn content_kind(&self, event: &'static str) -> Result<ContentKind, WorkflowError> {
        if self.in_flight.is_some() {
            return Err(WorkflowError::AcquisitionInFlight);
        }
        self.state.content_kind().ok_or_else(|| self.invalid(event))
    }

    fn reset(&mut self) {
        self.title.clear();
        self.in_flight = None;
        self.generation += 1;
    }

    fn transition(&mut self, next: WorkflowState) {
        debug!(from = %self.state, to = %next, "Workflow transition");
        self.state = next;
    }

    fn invalid(&self, event: &'static str) -> WorkflowError {
        WorkflowError::InvalidEvent {
            event,
            state: self.state.name(),
        }
    }
}

/// Build per-kind content from a validated payload
fn binary_content(
    kind: ContentKind,
    data: bytes::Bytes,
    media_type: Option<mime::Mime>,
) -> Result<NewContent, Rejection> {
    let missing_type = || Rejection::UnsupportedFormat {
        media_type: "unknown".to_string(),
    };

    match kind {
        ContentKind::Image => Ok(NewContent::Image {
            data,
            media_type: media_type.ok_or_else(missing_type)?,
        }),
        ContentKind::Video => Ok(NewContent::Video {
            data,
            media_type: media_type.ok_or_else(missing_type)?,
        }),
        ContentKind::Generic => Ok(NewContent::Generic { data, media_type }),
        ContentKind::Text => Err(missing_type()),
    }
}
