//! In-memory authoritative roster store.

/// Student store, draft sessions, and snapshots.
pub mod store;
