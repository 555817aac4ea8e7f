//! Error types for the tracker's event surface.

use splitwatch_protocol::SessionId;

/// Errors produced at the event-binding boundary.
///
/// Note the asymmetry with the engine underneath: a session that simply
/// isn't dangling is a `bool`/`Option` outcome, not an error. Only
/// genuinely invalid input from the host — an event for a connection the
/// directory has never heard of — surfaces here.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The directory does not recognize this connection numeric.
    #[error("no such live session: {0}")]
    NoSuchSession(SessionId),
}
