//! In-memory student roster with a single create/edit draft session.
//!
//! # Examples
//!
//! Direct usage with [`core::store::StudentStore`]:
//! ```
//! use roster::{core::store::StudentStore, student::StudentField};
//!
//! let mut store = StudentStore::new();
//! let draft = store.begin_create().expect("begin");
//! assert_eq!(draft.id.as_str(), "STU-1");
//! store.update_draft_field(StudentField::Name, "Alice").expect("name");
//! let (rec, _op) = store.commit().expect("commit");
//! assert_eq!(store.list(), &[rec]);
//! ```
//!
//! Runtime usage, serializing callers through one task:
//! ```no_run
//! use roster::{
//!     core::store::StudentStore,
//!     runtime::handle::{spawn_roster, RuntimeConfig},
//!     student::StudentField,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let handle = spawn_roster(StudentStore::new(), RuntimeConfig::default());
//! handle.begin_create().await.expect("begin");
//! handle.update_draft_field(StudentField::Name, "Alice").await.expect("name");
//! handle.commit().await.expect("commit");
//! let _store = handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![warn(missing_docs)]

/// Core in-memory store.
pub mod core;
/// Committed change model.
pub mod op;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Student records and field selectors.
pub mod student;
/// Shared primitive types and enums.
pub mod types;
