//! Collaborator traits: the live directory and the server topology.
//!
//! Splitwatch doesn't own the network state — the host process does.
//! These traits are the two views it needs: "who is this connection?"
//! ([`Directory`]) and "which servers are fully linked?" ([`Topology`]).
//! The host implements them over its own nick registry and server table;
//! tests implement them with plain hash maps.

use splitwatch_protocol::{AccountId, ServerId, SessionId, UnixTime};

/// The identity behind a live connection numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveSession {
    /// The authenticated account on the connection.
    pub account_id: AccountId,
    /// Start of the account's current authentication epoch.
    pub auth_ts: UnixTime,
}

/// Read access to the live user/session directory.
pub trait Directory {
    /// The authenticated identity behind a numeric, or `None` when the
    /// directory doesn't recognize it (no such live session, or the
    /// connection is unauthenticated).
    fn owner_of(&self, session_id: SessionId) -> Option<LiveSession>;
}

/// Read access to the server topology table.
pub trait Topology {
    /// Whether a server is currently fully linked to the network.
    fn is_linked(&self, server: ServerId) -> bool;

    /// Every server currently reported fully linked.
    fn linked_servers(&self) -> Vec<ServerId>;
}
