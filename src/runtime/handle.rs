use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use crate::{
    core::store::{StoreError, StudentStore},
    op::Op,
    student::{StudentField, StudentRecord},
    types::StudentId,
};

use super::events::RosterEvent;

/// Failures surfaced through a [`RosterHandle`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The runtime task has stopped.
    #[error("roster runtime channel closed")]
    ChannelClosed,
}

/// Channel sizing for [`spawn_roster`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Pending command capacity.
    pub command_queue_bound: usize,
    /// Broadcast buffer for [`RosterEvent`]s.
    pub event_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_queue_bound: 256,
            event_capacity: 1024,
        }
    }
}

/// Cloneable front end to a roster owned by one runtime task.
///
/// Commands are processed one at a time, so a session opened through any
/// clone is the session every clone sees.
#[derive(Clone)]
pub struct RosterHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<RosterEvent>,
}

enum Command {
    BeginCreate {
        resp: oneshot::Sender<Result<StudentRecord, RuntimeError>>,
    },
    BeginEdit {
        index: usize,
        resp: oneshot::Sender<Result<StudentRecord, RuntimeError>>,
    },
    UpdateDraftField {
        field: StudentField,
        value: String,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Commit {
        resp: oneshot::Sender<Result<StudentRecord, RuntimeError>>,
    },
    Cancel {
        resp: oneshot::Sender<bool>,
    },
    Delete {
        index: usize,
        resp: oneshot::Sender<Result<StudentRecord, RuntimeError>>,
    },
    List {
        resp: oneshot::Sender<Vec<StudentRecord>>,
    },
    Draft {
        resp: oneshot::Sender<Option<StudentRecord>>,
    },
    Shutdown {
        resp: oneshot::Sender<StudentStore>,
    },
}

/// Moves `store` into a runtime task and returns its handle.
pub fn spawn_roster(store: StudentStore, config: RuntimeConfig) -> RosterHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound.max(1));
    let (events_tx, _) = broadcast::channel::<RosterEvent>(config.event_capacity.max(1));

    let events_tx_loop = events_tx.clone();

    tokio::spawn(async move {
        let mut store = store;
        while let Some(cmd) = cmd_rx.recv().await {
            if let Some(resp) = handle_command(cmd, &mut store, &events_tx_loop) {
                let _ = resp.send(store);
                break;
            }
        }
        debug!("roster runtime stopped");
    });

    RosterHandle { cmd_tx, events_tx }
}

impl RosterHandle {
    /// Subscribes to roster events.
    pub fn subscribe(&self) -> broadcast::Receiver<RosterEvent> {
        self.events_tx.subscribe()
    }

    /// See [`StudentStore::begin_create`].
    pub async fn begin_create(&self) -> Result<StudentRecord, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::BeginCreate { resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// See [`StudentStore::begin_edit`].
    pub async fn begin_edit(&self, index: usize) -> Result<StudentRecord, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::BeginEdit { index, resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// See [`StudentStore::update_draft_field`].
    pub async fn update_draft_field(
        &self,
        field: StudentField,
        value: impl Into<String>,
    ) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::UpdateDraftField {
            field,
            value: value.into(),
            resp: tx,
        })
        .await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// See [`StudentStore::commit`].
    pub async fn commit(&self) -> Result<StudentRecord, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Commit { resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// See [`StudentStore::cancel`].
    pub async fn cancel(&self) -> Result<bool, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Cancel { resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// See [`StudentStore::delete`].
    pub async fn delete(&self, index: usize) -> Result<StudentRecord, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Delete { index, resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Snapshot of the records in display order.
    pub async fn list(&self) -> Result<Vec<StudentRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::List { resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Copy of the open draft.
    pub async fn draft(&self) -> Result<Option<StudentRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Draft { resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Stops the runtime and hands back the store.
    pub async fn shutdown(&self) -> Result<StudentStore, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown { resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    async fn send(&self, cmd: Command) -> Result<(), RuntimeError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| RuntimeError::ChannelClosed)
    }
}

// Returns the shutdown responder once the loop should stop.
fn handle_command(
    cmd: Command,
    store: &mut StudentStore,
    events_tx: &broadcast::Sender<RosterEvent>,
) -> Option<oneshot::Sender<StudentStore>> {
    match cmd {
        Command::BeginCreate { resp } => {
            let open = store.draft().map(|d| d.id.clone());
            let res = store.begin_create().map_err(RuntimeError::from);
            if let Ok(draft) = &res {
                emit_opened(store, events_tx, open, draft);
            }
            let _ = resp.send(res);
        }
        Command::BeginEdit { index, resp } => {
            let open = store.draft().map(|d| d.id.clone());
            let res = store.begin_edit(index).map_err(RuntimeError::from);
            if let Ok(draft) = &res {
                emit_opened(store, events_tx, open, draft);
            }
            let _ = resp.send(res);
        }
        Command::UpdateDraftField { field, value, resp } => {
            let res = store
                .update_draft_field(field, &value)
                .map_err(RuntimeError::from);
            if res.is_ok() {
                if let Some(draft) = store.draft() {
                    let _ = events_tx.send(RosterEvent::DraftUpdated {
                        id: draft.id.clone(),
                        field,
                    });
                }
            }
            let _ = resp.send(res);
        }
        Command::Commit { resp } => {
            let res = store
                .commit()
                .map_err(RuntimeError::from)
                .map(|(record, stored)| {
                    let id = record.id.clone();
                    let evt = match stored.op {
                        Op::Replaced { .. } => RosterEvent::Updated { id, seq: stored.seq },
                        _ => RosterEvent::Created { id, seq: stored.seq },
                    };
                    let _ = events_tx.send(evt);
                    record
                });
            let _ = resp.send(res);
        }
        Command::Cancel { resp } => {
            let open = store.draft().map(|d| d.id.clone());
            let cancelled = store.cancel();
            if let Some(id) = open.filter(|_| cancelled) {
                let _ = events_tx.send(RosterEvent::SessionCancelled { id });
            }
            let _ = resp.send(cancelled);
        }
        Command::Delete { index, resp } => {
            let res = store
                .delete(index)
                .map_err(RuntimeError::from)
                .map(|(record, stored)| {
                    let _ = events_tx.send(RosterEvent::Deleted {
                        id: record.id.clone(),
                        seq: stored.seq,
                    });
                    record
                });
            let _ = resp.send(res);
        }
        Command::List { resp } => {
            let _ = resp.send(store.list_cloned());
        }
        Command::Draft { resp } => {
            let _ = resp.send(store.draft().cloned());
        }
        Command::Shutdown { resp } => return Some(resp),
    }

    None
}

// A successful begin over an open draft means the reentry policy discarded it.
fn emit_opened(
    store: &StudentStore,
    events_tx: &broadcast::Sender<RosterEvent>,
    discarded: Option<StudentId>,
    draft: &StudentRecord,
) {
    if let Some(id) = discarded {
        let _ = events_tx.send(RosterEvent::SessionCancelled { id });
    }
    if let Some(mode) = store.session_mode() {
        let _ = events_tx.send(RosterEvent::SessionOpened {
            id: draft.id.clone(),
            mode,
        });
    }
}
