//! Committed mutation model for the roster.

use serde::{Deserialize, Serialize};

use crate::{student::StudentRecord, types::OpSeq};

/// One committed change to the ordered roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// A created record was appended.
    Appended {
        /// Appended record.
        record: StudentRecord,
    },
    /// An edited record replaced the one at `index`.
    Replaced {
        /// Position written.
        index: usize,
        /// New value.
        record: StudentRecord,
        /// Value before the replacement.
        prev: StudentRecord,
    },
    /// The record at `index` was removed and later positions shifted down.
    Removed {
        /// Position removed.
        index: usize,
        /// Removed record.
        record: StudentRecord,
    },
}

impl Op {
    /// Record the change leaves behind (or took away, for removals).
    pub fn record(&self) -> &StudentRecord {
        match self {
            Self::Appended { record } | Self::Replaced { record, .. } | Self::Removed { record, .. } => {
                record
            }
        }
    }
}

/// Change metadata plus operation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOp {
    /// Monotonic operation sequence.
    pub seq: OpSeq,
    /// Operation timestamp in milliseconds.
    pub ts_ms: u64,
    /// Operation body.
    pub op: Op,
}
