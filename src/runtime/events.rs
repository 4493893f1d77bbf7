//! Runtime event stream payloads.

use crate::{
    student::StudentField,
    types::{OpSeq, SessionMode, StudentId},
};

/// Events emitted from the single-writer runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterEvent {
    /// A create or edit session was opened.
    SessionOpened {
        /// Draft identity.
        id: StudentId,
        /// Session mode.
        mode: SessionMode,
    },
    /// One draft field changed.
    DraftUpdated {
        /// Draft identity.
        id: StudentId,
        /// Changed field.
        field: StudentField,
    },
    /// A created record was committed.
    Created {
        /// New record id.
        id: StudentId,
        /// Change sequence.
        seq: OpSeq,
    },
    /// An edited record was committed.
    Updated {
        /// Edited record id.
        id: StudentId,
        /// Change sequence.
        seq: OpSeq,
    },
    /// A record was deleted.
    Deleted {
        /// Removed record id.
        id: StudentId,
        /// Change sequence.
        seq: OpSeq,
    },
    /// The open session was discarded.
    SessionCancelled {
        /// Discarded draft identity.
        id: StudentId,
    },
}
