//! Single-owner catalog task.
//!
//! When the engine is shared across tasks, one task owns the [`Session`]
//! and applies [`CatalogCommand`]s sequentially; every mutation of the store
//! and the handle table goes through it.
//!
//! ```text
//! CatalogHandle ──┐
//!                 ├──► mpsc::Sender<CatalogCommand> ──► CatalogService
//! CatalogHandle ──┘                                          │
//!                                                            ▼
//!                                                  Session (sequential apply)
//! ```
//!
//! Payload reads happen in the caller's task, between a `BeginAcquisition`
//! and a `CompleteAcquisition` command, so a `Cancel` can arrive while a
//! read is outstanding and the late result is dropped.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::session::{Observation, Session};
use super::source::{Payload, PayloadSource};
use super::workflow::{AcquisitionTicket, SubmitOutcome, WorkflowError};
use crate::domain::{EntryId, EntrySummary, WorkflowEvent};
use crate::library::{CatalogError, Query};

const COMMAND_BUFFER_SIZE: usize = 64;

/// Errors returned through a [`CatalogHandle`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("Catalog service is not running")]
    Closed,

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Commands applied by the owner task
#[derive(Debug)]
pub enum CatalogCommand {
    /// Apply a creation event
    Event {
        event: WorkflowEvent,
        reply: oneshot::Sender<Result<Option<SubmitOutcome>, WorkflowError>>,
    },

    /// Reserve the content slot for a read
    BeginAcquisition {
        reply: oneshot::Sender<Result<AcquisitionTicket, WorkflowError>>,
    },

    /// Deliver a read result; read errors travel as their message
    CompleteAcquisition {
        ticket: AcquisitionTicket,
        read: Result<Payload, String>,
        reply: oneshot::Sender<Result<SubmitOutcome, WorkflowError>>,
    },

    /// Remove an entry and release its handles
    Remove {
        id: EntryId,
        reply: oneshot::Sender<Result<EntrySummary, CatalogError>>,
    },

    /// Replace the search/sort parameters
    SetQuery { query: Query },

    /// Current listing under the current query
    List {
        reply: oneshot::Sender<Vec<EntrySummary>>,
    },

    /// Current workflow and store observation
    Observe { reply: oneshot::Sender<Observation> },

    /// Stop the owner task; all handles are released
    Shutdown,
}

/// Owner task state
pub struct CatalogService {
    session: Session,
    command_rx: mpsc::Receiver<CatalogCommand>,
}

impl CatalogService {
    /// Create a service around `session` and the handle that talks to it
    pub fn new(session: Session) -> (Self, CatalogHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let service = Self {
            session,
            command_rx: rx,
        };
        (service, CatalogHandle { tx })
    }

    /// Spawn the owner task on the current runtime
    pub fn spawn(session: Session) -> (CatalogHandle, JoinHandle<Session>) {
        let (service, handle) = Self::new(session);
        (handle, tokio::spawn(service.run()))
    }

    /// Apply commands until `Shutdown` or until every handle is dropped.
    ///
    /// Returns the session so callers can inspect it after shutdown.
    pub async fn run(mut self) -> Session {
        info!("Catalog service started");

        while let Some(cmd) = self.command_rx.recv().await {
            if matches!(cmd, CatalogCommand::Shutdown) {
                info!("Catalog service received shutdown");
                break;
            }
            self.apply(cmd);
        }

        let released = self.session.clear();
        info!(released, "Catalog service stopped");
        self.session
    }

    fn apply(&mut self, cmd: CatalogCommand) {
        // A dropped reply receiver only means the caller stopped waiting
        match cmd {
            CatalogCommand::Event { event, reply } => {
                debug!(event = event.name(), "Applying event");
                let _ = reply.send(self.session.apply(event));
            }
            CatalogCommand::BeginAcquisition { reply } => {
                let _ = reply.send(self.session.begin_acquisition());
            }
            CatalogCommand::CompleteAcquisition {
                ticket,
                read,
                reply,
            } => {
                let read = read.map_err(anyhow::Error::msg);
                let _ = reply.send(self.session.complete_acquisition(ticket, read));
            }
            CatalogCommand::Remove { id, reply } => {
                let result = self.session.remove_entry(id).map(|entry| entry.summary());
                let _ = reply.send(result);
            }
            CatalogCommand::SetQuery { query } => {
                self.session.set_search_text(query.search);
                self.session.set_sort(query.sort_key, query.direction);
                self.session.set_kind_filter(query.kind);
            }
            CatalogCommand::List { reply } => {
                let _ = reply.send(self.session.listing().summaries());
            }
            CatalogCommand::Observe { reply } => {
                let _ = reply.send(self.session.observe());
            }
            CatalogCommand::Shutdown => {}
        }
    }
}

/// Cloneable sender side of a [`CatalogService`]
#[derive(Debug, Clone)]
pub struct CatalogHandle {
    tx: mpsc::Sender<CatalogCommand>,
}

impl CatalogHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> CatalogCommand,
    ) -> Result<T, ServiceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| ServiceError::Closed)?;
        reply_rx.await.map_err(|_| ServiceError::Closed)
    }

    /// Apply a creation event
    pub async fn send(&self, event: WorkflowEvent) -> Result<Option<SubmitOutcome>, ServiceError> {
        Ok(self
            .request(|reply| CatalogCommand::Event { event, reply })
            .await??)
    }

    /// Read from `source` in this task and submit the result
    pub async fn submit_from(&self, source: &dyn PayloadSource) -> Result<SubmitOutcome, ServiceError> {
        let ticket = self
            .request(|reply| CatalogCommand::BeginAcquisition { reply })
            .await??;

        let read = source.read().await.map_err(|e| format!("{:#}", e));

        Ok(self
            .request(|reply| CatalogCommand::CompleteAcquisition {
                ticket,
                read,
                reply,
            })
            .await??)
    }

    pub async fn begin_acquisition(&self) -> Result<AcquisitionTicket, ServiceError> {
        Ok(self
            .request(|reply| CatalogCommand::BeginAcquisition { reply })
            .await??)
    }

    pub async fn complete_acquisition(
        &self,
        ticket: AcquisitionTicket,
        read: Result<Payload, String>,
    ) -> Result<SubmitOutcome, ServiceError> {
        Ok(self
            .request(|reply| CatalogCommand::CompleteAcquisition {
                ticket,
                read,
                reply,
            })
            .await??)
    }

    pub async fn remove(&self, id: EntryId) -> Result<EntrySummary, ServiceError> {
        Ok(self
            .request(|reply| CatalogCommand::Remove { id, reply })
            .await??)
    }

    pub async fn set_query(&self, query: Query) -> Result<(), ServiceError> {
        self.tx
            .send(CatalogCommand::SetQuery { query })
            .await
            .map_err(|_| ServiceError::Closed)
    }

    pub async fn list(&self) -> Result<Vec<EntrySummary>, ServiceError> {
        self.request(|reply| CatalogCommand::List { reply }).await
    }

    pub async fn observe(&self) -> Result<Observation, ServiceError> {
        self.request(|reply| CatalogCommand::Observe { reply }).await
    }

    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        self.tx
            .send(CatalogCommand::Shutdown)
            .await
            .map_err(|_| ServiceError::Closed)
    }
}
