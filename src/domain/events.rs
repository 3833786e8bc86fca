//! Inbound creation events and the observable workflow state.

use serde::{Deserialize, Serialize};

use super::entry::{ContentKind, EntryId};
use crate::core::source::Payload;
use crate::core::validation::Rejection;

/// A discrete user action driving the creation workflow
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    /// Open a new creation
    Begin,

    /// Replace the in-progress title
    SetTitle(String),

    /// Choose the content kind
    SelectKind(ContentKind),

    /// Submit the typed text buffer
    SubmitText(String),

    /// Submit an already-read binary payload
    SubmitPayload(Payload),

    /// Step back one step, keeping the title
    Back,

    /// Abandon the creation and everything entered so far
    Cancel,
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::Begin => "begin",
            WorkflowEvent::SetTitle(_) => "set_title",
            WorkflowEvent::SelectKind(_) => "select_kind",
            WorkflowEvent::SubmitText(_) => "submit_text",
            WorkflowEvent::SubmitPayload(_) => "submit_payload",
            WorkflowEvent::Back => "back",
            WorkflowEvent::Cancel => "cancel",
        }
    }
}

/// Where the creation workflow currently stands
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum WorkflowState {
    /// No creation in progress
    #[default]
    Idle,

    /// Waiting for a non-empty title
    AwaitingTitle,

    /// Title present; kind selection enabled
    AwaitingKind,

    /// Waiting for text or a payload of the chosen kind
    AwaitingContent { kind: ContentKind },

    /// Content is being read or checked
    Validating { kind: ContentKind },

    /// Last creation produced this entry
    Committed { id: EntryId },

    /// Last submission was refused; accepts the same events as
    /// `AwaitingContent` for the same kind
    Rejected { kind: ContentKind, reason: Rejection },
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::AwaitingTitle => "awaiting_title",
            WorkflowState::AwaitingKind => "awaiting_kind",
            WorkflowState::AwaitingContent { .. } => "awaiting_content",
            WorkflowState::Validating { .. } => "validating",
            WorkflowState::Committed { .. } => "committed",
            WorkflowState::Rejected { .. } => "rejected",
        }
    }

    /// Whether a creation is mid-flight
    pub fn is_active(&self) -> bool {
        !matches!(self, WorkflowState::Idle | WorkflowState::Committed { .. })
    }

    /// Whether kind selection affordances should be enabled
    pub fn can_select_kind(&self) -> bool {
        matches!(self, WorkflowState::AwaitingKind)
    }

    /// Kind whose content the workflow is waiting for, if any
    pub fn content_kind(&self) -> Option<ContentKind> {
        match self {
            WorkflowState::AwaitingContent { kind } | WorkflowState::Rejected { kind, .. } => {
                Some(*kind)
            }
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            WorkflowState::Rejected { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowState::AwaitingContent { kind } | WorkflowState::Validating { kind } => {
                write!(f, "{}({})", self.name(), kind)
            }
            WorkflowState::Committed { id } => write!(f, "committed({})", id),
            WorkflowState::Rejected { kind, reason } => {
                write!(f, "rejected({}): {}", kind, reason)
            }
            _ => f.write_str(self.name()),
        }
    }
}
