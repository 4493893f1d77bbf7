use std::time::{SystemTime, UNIX_EPOCH};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    op::{Op, StoredOp},
    student::{StudentField, StudentRecord},
    types::{OpSeq, SessionMode, StudentId},
};

const SNAPSHOT_FORMAT_VERSION: u16 = 1;

/// Failures of roster operations. A failed call leaves the store unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Index does not name a current record.
    #[error("index {index} out of range for {len} records")]
    OutOfRange {
        /// Rejected index.
        index: usize,
        /// Record count at the time of the call.
        len: usize,
    },
    /// Draft operation with no session open.
    #[error("no create or edit session is open")]
    NoActiveSession,
    /// Write to a store-assigned field.
    #[error("field `{0}` cannot be edited")]
    ImmutableField(StudentField),
    /// Begin while another session is open.
    #[error("a create or edit session is already open")]
    SessionAlreadyActive,
    /// Edit target was deleted or shifted since the session began.
    #[error("edit target at index {index} no longer holds the draft's record")]
    StaleSessionTarget {
        /// Position captured by `begin_edit`.
        index: usize,
    },
    /// Field name that no record attribute matches.
    #[error("unknown field `{0}`")]
    UnknownField(String),
    /// Value that the field cannot hold.
    #[error("invalid value {value:?} for field `{field}`")]
    InvalidFieldValue {
        /// Target field.
        field: StudentField,
        /// Rejected value.
        value: String,
    },
    /// Identity that is empty or already present.
    #[error("duplicate or empty student id `{0}`")]
    DuplicateId(StudentId),
    /// Snapshot payload could not be encoded, decoded, or restored.
    #[error("snapshot error: {0}")]
    Snapshot(String),
    /// A monotonic counter has no room left to advance.
    #[error("{0} sequence exhausted")]
    SequenceExhausted(&'static str),
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Snapshot(value.to_string())
    }
}

/// What `begin_create`/`begin_edit` do while a session is already open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReentryPolicy {
    /// Fail with [`StoreError::SessionAlreadyActive`].
    #[default]
    Reject,
    /// Drop the open draft and start the new session.
    DiscardDraft,
}

/// Store construction options.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Text prepended to the sequence number of minted ids.
    pub id_prefix: String,
    /// Re-entrant begin behavior.
    pub reentry: ReentryPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            id_prefix: "STU-".to_string(),
            reentry: ReentryPolicy::Reject,
        }
    }
}

/// Serializable roster state without any open session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshotV1 {
    /// Next identity sequence to mint.
    pub next_sequence: u64,
    /// Next operation sequence to assign.
    pub next_op_seq: OpSeq,
    /// Records in display order.
    pub records: Vec<StudentRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotEnvelope {
    format_version: u16,
    snapshot: StoreSnapshotV1,
}

impl StoreSnapshotV1 {
    /// Encodes the snapshot in its versioned JSON envelope.
    pub fn to_json(&self) -> Result<Vec<u8>, StoreError> {
        let env = SnapshotEnvelope {
            format_version: SNAPSHOT_FORMAT_VERSION,
            snapshot: self.clone(),
        };
        Ok(serde_json::to_vec(&env)?)
    }

    /// Decodes a snapshot written by [`StoreSnapshotV1::to_json`].
    pub fn from_json(payload: &[u8]) -> Result<Self, StoreError> {
        let env: SnapshotEnvelope = serde_json::from_slice(payload)?;
        if env.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(StoreError::Snapshot(format!(
                "unsupported snapshot format version: {}",
                env.format_version
            )));
        }
        Ok(env.snapshot)
    }
}

#[derive(Debug, Clone)]
struct Session {
    draft: StudentRecord,
    mode: SessionMode,
}

/// Ordered, in-memory student roster with a single draft session.
///
/// Records change only through [`StudentStore::commit`] and
/// [`StudentStore::delete`]. Identities come from a counter that only moves
/// forward, so ids burned by cancelled or deleted records are never reissued.
#[derive(Debug)]
pub struct StudentStore {
    records: Vec<StudentRecord>,
    pos: HashMap<StudentId, usize>,
    session: Option<Session>,
    next_sequence: u64,
    next_op_seq: OpSeq,
    config: StoreConfig,
}

impl Default for StudentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StudentStore {
    /// Empty store minting `STU-1`, `STU-2`, ...
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Empty store with explicit options.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            records: Vec::new(),
            pos: HashMap::new(),
            session: None,
            next_sequence: 1,
            next_op_seq: 1,
            config,
        }
    }

    /// Rebuilds a store from an exported snapshot.
    ///
    /// The identity counter is raised past every id already minted under the
    /// configured prefix. Snapshots whose counters cannot advance are rejected.
    pub fn from_snapshot(snapshot: StoreSnapshotV1, config: StoreConfig) -> Result<Self, StoreError> {
        let mut store = Self::with_config(config);
        store.next_sequence = snapshot.next_sequence.max(1);
        store.next_op_seq = snapshot.next_op_seq.max(1);

        for rec in snapshot.records {
            if rec.id.is_empty() || store.pos.contains_key(&rec.id) {
                return Err(StoreError::DuplicateId(rec.id));
            }
            if let Some(seq) = rec.id.sequence_under(&store.config.id_prefix) {
                let after = seq.checked_add(1).ok_or_else(|| {
                    StoreError::Snapshot(format!("id `{}` leaves no sequence to mint", rec.id))
                })?;
                store.next_sequence = store.next_sequence.max(after);
            }
            store.pos.insert(rec.id.clone(), store.records.len());
            store.records.push(rec);
        }

        if store.next_sequence == u64::MAX || store.next_op_seq == OpSeq::MAX {
            return Err(StoreError::Snapshot("snapshot counters are exhausted".to_string()));
        }

        Ok(store)
    }

    /// Exports committed state. An open draft is not included.
    pub fn export_snapshot(&self) -> StoreSnapshotV1 {
        StoreSnapshotV1 {
            next_sequence: self.next_sequence,
            next_op_seq: self.next_op_seq,
            records: self.records.clone(),
        }
    }

    /// Opens a create session around a blank draft with a freshly minted id.
    ///
    /// The id is consumed even if the session is later cancelled.
    pub fn begin_create(&mut self) -> Result<StudentRecord, StoreError> {
        let after = self
            .next_sequence
            .checked_add(1)
            .ok_or(StoreError::SequenceExhausted("identity"))?;
        self.guard_reentry()?;

        let id = StudentId::mint(&self.config.id_prefix, self.next_sequence);
        self.next_sequence = after;

        let draft = StudentRecord::blank(id);
        debug!(id = %draft.id, "create session opened");
        self.session = Some(Session {
            draft: draft.clone(),
            mode: SessionMode::Creating,
        });
        Ok(draft)
    }

    /// Opens an edit session over a copy of the record at `index`.
    pub fn begin_edit(&mut self, index: usize) -> Result<StudentRecord, StoreError> {
        let draft = self.get(index).cloned().ok_or(StoreError::OutOfRange {
            index,
            len: self.records.len(),
        })?;
        self.guard_reentry()?;

        debug!(id = %draft.id, index, "edit session opened");
        self.session = Some(Session {
            draft: draft.clone(),
            mode: SessionMode::Editing { target: index },
        });
        Ok(draft)
    }

    /// Writes one field of the open draft.
    pub fn update_draft_field(&mut self, field: StudentField, value: &str) -> Result<(), StoreError> {
        let session = self.session.as_mut().ok_or(StoreError::NoActiveSession)?;
        session.draft.set_field(field, value)
    }

    /// Applies the open draft to the roster and closes the session.
    ///
    /// Creating appends; editing replaces the target position, provided it
    /// still holds the record the session was opened on.
    pub fn commit(&mut self) -> Result<(StudentRecord, StoredOp), StoreError> {
        let session = self.session.as_ref().ok_or(StoreError::NoActiveSession)?;
        let seq = self.peek_op_seq()?;

        let op = match session.mode {
            SessionMode::Creating => {
                if session.draft.id.is_empty() || self.pos.contains_key(&session.draft.id) {
                    return Err(StoreError::DuplicateId(session.draft.id.clone()));
                }
                Op::Appended {
                    record: session.draft.clone(),
                }
            }
            SessionMode::Editing { target } => {
                let prev = match self.records.get(target) {
                    Some(rec) if rec.id == session.draft.id => rec.clone(),
                    _ => return Err(StoreError::StaleSessionTarget { index: target }),
                };
                Op::Replaced {
                    index: target,
                    record: session.draft.clone(),
                    prev,
                }
            }
        };

        self.session = None;
        match &op {
            Op::Appended { record } => {
                self.pos.insert(record.id.clone(), self.records.len());
                self.records.push(record.clone());
            }
            Op::Replaced { index, record, .. } => {
                self.records[*index] = record.clone();
            }
            Op::Removed { .. } => {}
        }

        let stored = self.stamp(seq, op);
        debug!(id = %stored.op.record().id, seq = stored.seq, "session committed");
        Ok((stored.op.record().clone(), stored))
    }

    /// Discards the open draft. Returns false when nothing was open.
    pub fn cancel(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                debug!(id = %session.draft.id, "session cancelled");
                true
            }
            None => false,
        }
    }

    /// Removes the record at `index`, shifting later records down.
    ///
    /// An open edit session whose target is affected is left in place; its
    /// commit then fails with [`StoreError::StaleSessionTarget`].
    pub fn delete(&mut self, index: usize) -> Result<(StudentRecord, StoredOp), StoreError> {
        if index >= self.records.len() {
            return Err(StoreError::OutOfRange {
                index,
                len: self.records.len(),
            });
        }
        let seq = self.peek_op_seq()?;

        let record = self.records.remove(index);
        self.pos.remove(&record.id);
        for (offset, rec) in self.records[index..].iter().enumerate() {
            self.pos.insert(rec.id.clone(), index + offset);
        }

        if let Some(Session {
            mode: SessionMode::Editing { target },
            draft,
        }) = &self.session
        {
            if *target >= index {
                warn!(id = %draft.id, target, removed = index, "delete invalidated open edit session");
            }
        }

        let stored = self.stamp(seq, Op::Removed {
            index,
            record: record.clone(),
        });
        debug!(id = %record.id, index, seq = stored.seq, "record deleted");
        Ok((record, stored))
    }

    /// Records in display order.
    pub fn list(&self) -> &[StudentRecord] {
        &self.records
    }

    /// Owned copy of [`StudentStore::list`].
    pub fn list_cloned(&self) -> Vec<StudentRecord> {
        self.records.clone()
    }

    /// Record at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&StudentRecord> {
        self.records.get(index)
    }

    /// Position and record carrying `id`.
    pub fn find(&self, id: &StudentId) -> Option<(usize, &StudentRecord)> {
        let index = *self.pos.get(id)?;
        self.records.get(index).map(|rec| (index, rec))
    }

    /// Number of committed records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records are committed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Open draft, if a session is in progress.
    pub fn draft(&self) -> Option<&StudentRecord> {
        self.session.as_ref().map(|s| &s.draft)
    }

    /// Mode of the open session.
    pub fn session_mode(&self) -> Option<SessionMode> {
        self.session.as_ref().map(|s| s.mode)
    }

    /// True while a create or edit session is open.
    pub fn is_session_active(&self) -> bool {
        self.session.is_some()
    }

    /// Sequence number the next `begin_create` will mint.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Sequence of the most recent committed change, 0 if none.
    pub fn latest_op_seq(&self) -> OpSeq {
        self.next_op_seq.saturating_sub(1)
    }

    /// Active options.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn guard_reentry(&mut self) -> Result<(), StoreError> {
        let Some(open) = &self.session else {
            return Ok(());
        };
        match self.config.reentry {
            ReentryPolicy::Reject => Err(StoreError::SessionAlreadyActive),
            ReentryPolicy::DiscardDraft => {
                warn!(id = %open.draft.id, "discarding open draft for new session");
                self.session = None;
                Ok(())
            }
        }
    }

    // Checked up front so a mutation never runs without a sequence to stamp.
    fn peek_op_seq(&self) -> Result<OpSeq, StoreError> {
        self.next_op_seq
            .checked_add(1)
            .map(|_| self.next_op_seq)
            .ok_or(StoreError::SequenceExhausted("operation"))
    }

    fn stamp(&mut self, seq: OpSeq, op: Op) -> StoredOp {
        self.next_op_seq = seq + 1;
        StoredOp {
            seq,
            ts_ms: now_ms(),
            op,
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
