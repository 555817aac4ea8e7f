//! The session log: in-memory records with a JSON snapshot on disk.

use std::collections::HashMap;
use std::path::Path;

use splitwatch_engine::SessionCloser;
use splitwatch_protocol::{AccountId, SessionId, UnixTime};

use crate::{OrphanedSession, RecordState, SessionRecord, StoreError};

/// All durable session records, keyed by account.
///
/// An account has at most one record at a time; a fresh authentication
/// supersedes whatever was there (the previous epoch is over either way).
/// The log itself is synchronous and single-threaded, like the engine it
/// plugs into — persistence is an explicit snapshot, not a write-through.
pub struct SessionLog {
    records: HashMap<AccountId, SessionRecord>,
}

impl SessionLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Records a new open session for an account.
    ///
    /// Called once per successful authentication, independent of any
    /// dangling tracking. The home server is derived from the numeric.
    pub fn open_session(
        &mut self,
        account_id: AccountId,
        session_id: SessionId,
        auth_ts: UnixTime,
    ) {
        let record = SessionRecord {
            account_id,
            session_id,
            auth_ts,
            home_server: session_id.home_server(),
            state: RecordState::Open,
        };
        tracing::info!(%account_id, %session_id, "session opened");
        self.records.insert(account_id, record);
    }

    /// Open records whose connection the `live` predicate does not
    /// recognize.
    ///
    /// Run once at startup, before the tracker trusts its own view of
    /// link state. Every result becomes a restart-dangling entry.
    pub fn orphaned(
        &self,
        live: impl Fn(SessionId) -> bool,
    ) -> Vec<OrphanedSession> {
        let mut orphans: Vec<_> = self
            .records
            .values()
            .filter(|r| r.is_open() && !live(r.session_id))
            .map(|r| OrphanedSession {
                session_id: r.session_id,
                account_id: r.account_id,
                auth_ts: r.auth_ts,
                home_server: r.home_server,
            })
            .collect();
        orphans.sort_by_key(|o| o.account_id.0);
        orphans
    }

    /// The record for an account, if any.
    pub fn get(&self, account_id: AccountId) -> Option<&SessionRecord> {
        self.records.get(&account_id)
    }

    /// Number of records (open or closed).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // -- Snapshot ---------------------------------------------------------

    /// Serializes all records as a JSON array, sorted by account id.
    pub fn snapshot_json(&self) -> Result<String, StoreError> {
        let mut records: Vec<_> = self.records.values().cloned().collect();
        records.sort_by_key(|r| r.account_id.0);
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Rebuilds a log from a JSON snapshot.
    pub fn restore_json(json: &str) -> Result<Self, StoreError> {
        let records: Vec<SessionRecord> = serde_json::from_str(json)?;
        Ok(Self {
            records: records
                .into_iter()
                .map(|r| (r.account_id, r))
                .collect(),
        })
    }

    /// Writes the snapshot to a file.
    pub fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        std::fs::write(path, self.snapshot_json()?)?;
        tracing::debug!(path = %path.display(), "session snapshot written");
        Ok(())
    }

    /// Loads a snapshot from a file.
    pub fn load_from(path: &Path) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path)?;
        let log = Self::restore_json(&json)?;
        tracing::info!(
            path = %path.display(),
            records = log.len(),
            "session snapshot loaded"
        );
        Ok(log)
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// The engine's close-out sink.
///
/// Every path is a recoverable no-op with a warning except the clean hit:
/// the in-memory registry's view of "resolved" always wins, and the store
/// is asked to converge with it, not trusted as a veto.
impl SessionCloser for SessionLog {
    fn close_session(
        &mut self,
        account_id: AccountId,
        auth_ts: UnixTime,
        closed_at: UnixTime,
        reason: &str,
    ) {
        let Some(record) = self.records.get_mut(&account_id) else {
            tracing::warn!(%account_id, "close for unknown session record");
            return;
        };
        if record.auth_ts != auth_ts {
            tracing::warn!(
                %account_id,
                expected = %auth_ts,
                found = %record.auth_ts,
                "close for a different auth epoch, ignoring"
            );
            return;
        }
        if !record.is_open() {
            tracing::warn!(%account_id, "close for already-closed session record");
            return;
        }
        record.state = RecordState::Closed {
            closed_at,
            reason: reason.to_string(),
        };
        tracing::info!(%account_id, %closed_at, reason, "session closed");
    }
}

// =========================================================================
// Tests
// =========================================================================
