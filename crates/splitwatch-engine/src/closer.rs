//! The seam between the engine and the durable session store.
//!
//! The engine doesn't know how session records are persisted — that's the
//! store's job. It only needs one capability: "mark this account's open
//! session as closed." The [`SessionCloser`] trait expresses exactly that.
//!
//! # Why a trait?
//!
//! A trait defines WHAT something can do without specifying HOW. This
//! lets us:
//! - Use the JSON-backed `SessionLog` in the real tracker
//! - Use a plain recording stub in the engine's own tests
//!
//! All without the engine crate depending on the store crate — the
//! dependency points the other way (the store implements this trait).

use splitwatch_protocol::{AccountId, UnixTime};

/// Receives the close-out for every finalized dangling session.
///
/// Called once per drained entry when a server's table is finalized.
/// Implementations must tolerate a record that is already closed or
/// cannot be located (the finalize paths can in principle overlap): log
/// and carry on, never fail — the engine's view of "resolved" wins.
pub trait SessionCloser {
    /// Marks the durable session record for `account_id` (opened at
    /// `auth_ts`) as closed at `closed_at` with the given reason text.
    fn close_session(
        &mut self,
        account_id: AccountId,
        auth_ts: UnixTime,
        closed_at: UnixTime,
        reason: &str,
    );
}
