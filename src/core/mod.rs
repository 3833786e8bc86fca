//! Core engine logic.
//!
//! This module contains:
//! - Validation: per-kind content rules
//! - Resources: the preview/playback handle table
//! - Clock: strictly increasing commit timestamps
//! - Source: asynchronous payload acquisition
//! - Workflow: the creation state machine
//! - Session: the facade the view layer drives
//! - Service: single-owner task accepting commands over a queue

pub mod clock;
pub mod resources;
pub mod service;
pub mod session;
pub mod source;
pub mod validation;
pub mod workflow;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, MonotonicStamp, SystemClock};
pub use resources::{Handle, HandleKind, ResourceError, ResourceLimits, ResourceManager, ResourceStats};
pub use service::{CatalogCommand, CatalogHandle, CatalogService, ServiceError};
pub use session::{Listing, Observation, Preview, Session, ViewSession};
pub use source::{guess_media_type, FilePayloadSource, Payload, PayloadSource};
pub use validation::{Candidate, Rejection, ValidationLimits};
pub use workflow::{AcquisitionTicket, CreationWorkflow, SubmitOutcome, WorkflowError};
