//! Durable session records for splitwatch.
//!
//! This crate is the system of record for "this account has an open
//! session", independent of process lifetime. It bridges the
//! reconciliation engine and storage:
//!
//! 1. **Opening** — one record per successful authentication
//!    ([`SessionLog::open_session`])
//! 2. **Closing** — the engine's finalize outcomes land here through the
//!    [`SessionCloser`](splitwatch_engine::SessionCloser) impl
//! 3. **Orphan discovery** — at startup, open records with no live
//!    connection become restart-dangling sessions
//!    ([`SessionLog::orphaned`])
//!
//! Records survive restarts through a JSON snapshot
//! ([`SessionLog::save_to`] / [`SessionLog::load_from`]).

mod error;
mod log;
mod record;

pub use error::StoreError;
pub use log::SessionLog;
pub use record::{OrphanedSession, RecordState, SessionRecord};
