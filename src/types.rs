//! Shared primitive IDs and roster enums.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Monotonic operation sequence number.
pub type OpSeq = u64;

/// Store-assigned, immutable student identity such as `STU-7`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    /// Mints the identity for sequence number `seq` under `prefix`.
    pub fn mint(prefix: &str, seq: u64) -> Self {
        Self(format!("{prefix}{seq}"))
    }

    /// Returns the identity as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the placeholder identity of an unset record.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Extracts the numeric suffix when the id was minted under `prefix`.
    pub fn sequence_under(&self, prefix: &str) -> Option<u64> {
        self.0.strip_prefix(prefix)?.parse().ok()
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StudentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Gender choice offered by the record form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gender {
    /// Male.
    #[default]
    Male,
    /// Female.
    Female,
    /// Any other answer.
    Other,
}

impl Gender {
    /// Display label used by the form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            _ => Err(()),
        }
    }
}

/// What a commit does with the open draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionMode {
    /// Commit appends the draft.
    Creating,
    /// Commit replaces the record at `target`.
    Editing {
        /// Position captured when the session began.
        target: usize,
    },
}
