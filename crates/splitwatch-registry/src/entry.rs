//! The record kept for one session whose fate is unknown.

use splitwatch_protocol::{AccountId, LossReason, SessionId, UnixTime};

/// One session the network cannot currently account for.
///
/// The `(session_id, account_id, auth_ts)` triple is the entry's key:
/// connection numerics are recycled once a connection fully closes, so a
/// numeric alone could match a different, later session. The account id
/// and the start of its authentication epoch pin it down.
///
/// Entries are never mutated in place — they are created when a session
/// is lost and removed whole when it resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingEntry {
    /// The connection numeric on the session's home server.
    pub session_id: SessionId,
    /// The authenticated account that owns the session.
    pub account_id: AccountId,
    /// When the account's current authentication epoch began.
    pub auth_ts: UnixTime,
    /// When the entry became dangling.
    pub lost_at: UnixTime,
    /// Why the session's fate is uncertain.
    pub reason: LossReason,
}

impl DanglingEntry {
    /// Whether this entry matches the full three-field resolution key.
    pub fn matches(
        &self,
        session_id: SessionId,
        account_id: AccountId,
        auth_ts: UnixTime,
    ) -> bool {
        self.session_id == session_id
            && self.account_id == account_id
            && self.auth_ts == auth_ts
    }
}
