//! Identity types shared across the splitwatch crates.
//!
//! Every crate in the workspace speaks in terms of these types, so this
//! is the "vocabulary" of the whole system.
//!
//! They are all "newtype wrappers" — a common Rust pattern where you wrap
//! a primitive type in a named struct. Why bother?
//!
//! 1. **Type safety**: You can't accidentally pass a `ServerId` where a
//!    `SessionId` is expected, even though both are integers underneath.
//!    In a system whose whole job is not mixing up identifiers, that's
//!    worth a lot.
//! 2. **Readability**: `fn finalize_server(server: ServerId)` says more
//!    than `fn finalize_server(server: u16)`.
//!
//! The `#[serde(transparent)]` attribute on each tells serde to serialize
//! just the inner value, not `{ "0": 42 }` — so a `SessionId(42)` is just
//! `42` in JSON, which keeps the durable store's record format flat.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

// ---------------------------------------------------------------------------
// Server identity
// ---------------------------------------------------------------------------

/// Number of bits of a session numeric that identify the client slot on
/// its home server. The remaining high bits identify the server itself.
const CLIENT_BITS: u32 = 18;

/// Size of the bounded server-id space. Server ids are 12-bit values, so
/// at most 4096 servers can exist on the network at once.
pub const MAX_SERVERS: u16 = 1 << 12;

/// A server's numeric identifier on the network.
///
/// Always below [`MAX_SERVERS`]; inputs from the admin surface are
/// validated against that bound before one of these is constructed.
///
/// The `#[derive(...)]` attribute auto-generates trait implementations:
///   - `Debug`          → enables `{:?}` formatting for logging
///   - `Clone, Copy`    → allows cheap duplication (it's just a u16)
///   - `PartialEq, Eq`  → enables `==` comparison
///   - `Hash`           → enables use as a HashMap key (the registry's
///     server → table map)
///   - `PartialOrd, Ord` → enables sorting, for stable diagnostic output
///   - `Serialize, Deserialize` → enables JSON conversion
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ServerId(pub u16);

impl ServerId {
    /// Whether this id falls inside the bounded server-id space.
    pub fn in_bounds(self) -> bool {
        self.0 < MAX_SERVERS
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Session identity
// ---------------------------------------------------------------------------

/// A connection numeric assigned by a session's home server.
///
/// The high bits carry the home server's id, the low [`CLIENT_BITS`] bits
/// the client slot on that server. Numerics are recycled once a connection
/// fully closes, so a `SessionId` alone never identifies a session across
/// time — pair it with the account id and auth timestamp for that
/// (see `DanglingEntry` in the registry crate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u32);

impl SessionId {
    /// Composes a numeric from a server id and a client slot.
    pub fn new(server: ServerId, client: u32) -> Self {
        Self((u32::from(server.0) << CLIENT_BITS) | (client & ((1 << CLIENT_BITS) - 1)))
    }

    /// The server this numeric is registered on.
    pub fn home_server(self) -> ServerId {
        ServerId((self.0 >> CLIENT_BITS) as u16)
    }

    /// The client slot within the home server's connection space.
    pub fn client_slot(self) -> u32 {
        self.0 & ((1 << CLIENT_BITS) - 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Account identity
// ---------------------------------------------------------------------------

/// The identifier of an authenticated account.
///
/// Stable across connections and restarts — this is what the durable
/// session store keys its records by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A wall-clock timestamp in whole seconds since the Unix epoch.
///
/// Rust's monotonic clock (`std::time::Instant`) is usually the right
/// tool for measuring elapsed time, but not here: auth timestamps and
/// close timestamps are persisted and compared across process restarts,
/// and an `Instant` is meaningless outside the process that created it.
/// Wall-clock seconds survive a restart; that's the whole point of the
/// durable store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnixTime(pub i64);

impl UnixTime {
    /// The current wall-clock time.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Self(secs)
    }
}

impl fmt::Display for UnixTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Loss reason
// ---------------------------------------------------------------------------

/// Why a session's fate became uncertain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LossReason {
    /// The session's home server split off from the network.
    Netsplit,
    /// The tracker restarted and found an open session record with no
    /// matching live connection.
    Restart,
}

impl LossReason {
    /// The reason text recorded on a durable session record when a
    /// dangling session is finalized as closed.
    pub fn close_reason(self) -> &'static str {
        match self {
            Self::Netsplit => "netsplit",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for LossReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.close_reason())
    }
}

// =========================================================================
// Tests
// =========================================================================
