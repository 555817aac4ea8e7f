//! Administrative command surface: `dump` and `delink`.
//!
//! These functions produce the reply lines; the host's command dispatcher
//! owns argument splitting, permissions, and delivery. Invalid input is
//! rejected here, at the boundary — it never reaches the registry.

use splitwatch_protocol::{ServerId, UnixTime};

use crate::{Directory, Topology, Tracker};

/// Errors reported back through the command surface.
///
/// Each maps to a human-readable error line and a non-success result code
/// in the host's dispatcher.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AdminError {
    /// `delink` was called without its server-numeric argument.
    #[error("not enough parameters: expected a server numeric")]
    MissingArgument,

    /// The argument is not a numeric inside the bounded server-id space.
    #[error("invalid server numeric: {0}")]
    InvalidServerId(String),

    /// The named server has no dangling table.
    #[error("no dangling table for server {0}")]
    NoDanglingTable(ServerId),
}

/// `dump`: one line per server with a non-empty table, then an
/// end-of-list marker.
pub fn dump<D: Directory, T: Topology>(tracker: &Tracker<D, T>) -> Vec<String> {
    let mut lines: Vec<String> = tracker
        .dangling_counts()
        .into_iter()
        .map(|(server, count)| format!("server {server} has {count} entries"))
        .collect();
    lines.push("end of dangling list".to_string());
    lines
}

/// `delink <serverNumericId>`: force-closes the named server's table.
///
/// Validates the argument against the bounded server-id space, then
/// finalizes. Reports the count finalized, or an error when the argument
/// is missing/invalid or the server has no table.
pub fn delink<D: Directory, T: Topology>(
    tracker: &mut Tracker<D, T>,
    args: &[&str],
    now: UnixTime,
) -> Result<String, AdminError> {
    let raw = args.first().ok_or(AdminError::MissingArgument)?;
    let server = raw
        .parse::<u16>()
        .ok()
        .map(ServerId)
        .filter(|s| s.in_bounds())
        .ok_or_else(|| AdminError::InvalidServerId((*raw).to_string()))?;

    let count = tracker
        .force_delink(server, now)
        .ok_or(AdminError::NoDanglingTable(server))?;

    Ok(format!("server {server} had {count} entries"))
}

// =========================================================================
// Tests
// =========================================================================
