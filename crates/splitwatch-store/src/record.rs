//! Record types persisted by the session store.

use serde::{Deserialize, Serialize};
use splitwatch_protocol::{AccountId, ServerId, SessionId, UnixTime};

/// Lifecycle state of a durable session record.
///
/// `#[serde(tag = "state")]` keeps the snapshot flat:
///   `{ "state": "open" }` or
///   `{ "state": "closed", "closed_at": 1700000000, "reason": "netsplit" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RecordState {
    /// The session is believed open.
    Open,
    /// The session was confirmed closed, with close metadata.
    Closed {
        /// When the closure was recorded.
        closed_at: UnixTime,
        /// Why — "netsplit", "restart", or a quit reason.
        reason: String,
    },
}

/// One durable session record, keyed by account id in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// The authenticated account the session belongs to.
    pub account_id: AccountId,
    /// The connection numeric at the time the session opened.
    pub session_id: SessionId,
    /// Start of the account's authentication epoch.
    pub auth_ts: UnixTime,
    /// The server the connection was registered on.
    pub home_server: ServerId,
    /// Open/closed flag with close metadata.
    pub state: RecordState,
}

impl SessionRecord {
    /// Whether the record still counts as an open session.
    pub fn is_open(&self) -> bool {
        matches!(self.state, RecordState::Open)
    }
}

/// An open record discovered at startup with no live connection behind it.
///
/// Each of these becomes a restart-dangling entry in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanedSession {
    /// The numeric recorded when the session opened (possibly recycled
    /// by now — which is exactly why the full triple is carried).
    pub session_id: SessionId,
    /// The owning account.
    pub account_id: AccountId,
    /// The authentication epoch of the recorded session.
    pub auth_ts: UnixTime,
    /// The server the session lived on.
    pub home_server: ServerId,
}
