//! The reconciler: drives the dangling registry through its lifecycle.
//!
//! One state machine instance per session, from the engine's point of view:
//!
//! ```text
//! LIVE ──(uncertainty)──→ DANGLING ──(return)──────────→ LIVE (removed)
//!                         DANGLING ──(server came back)─→ FINALIZED (closed)
//!                         DANGLING ──(admin delink)─────→ FINALIZED (closed)
//! ```
//!
//! # Concurrency note
//!
//! `Reconciler` is NOT thread-safe by itself — all operations run
//! synchronously on the single logical thread that owns it, invoked from
//! event callbacks or a periodic timer. Callers that need sharing wrap it
//! at a higher level (the tracker crate uses a mutex for the sweeper).
//!
//! # Reentrancy
//!
//! Closing a session can trigger downstream notifications that call back
//! into this engine. `finalize_server` therefore detaches the entire
//! drained list from the registry *before* the first
//! [`SessionCloser::close_session`] call runs: a reentrant caller sees a
//! consistent, already-empty table for that server and cannot
//! double-process the drain.

use splitwatch_protocol::{AccountId, LossReason, ServerId, SessionId, UnixTime};
use splitwatch_registry::{DanglingEntry, DanglingRegistry};

use crate::SessionCloser;

/// The reconciliation engine.
///
/// Owns the dangling registry and the close-out sink. Injected into the
/// event binding and the admin surface rather than living as ambient
/// global state, so every test gets a fresh one.
pub struct Reconciler<C: SessionCloser> {
    registry: DanglingRegistry,
    closer: C,
}

impl<C: SessionCloser> Reconciler<C> {
    /// Creates an engine with an empty registry.
    pub fn new(closer: C) -> Self {
        Self {
            registry: DanglingRegistry::new(),
            closer,
        }
    }

    /// Records a session as dangling.
    ///
    /// Called when the session's home server becomes unreachable, or at
    /// startup for a persisted record with no live connection. The entry
    /// is filed under the numeric's home server. The caller guarantees
    /// at-most-once invocation per uncertainty episode.
    pub fn mark_dangling(
        &mut self,
        session_id: SessionId,
        account_id: AccountId,
        auth_ts: UnixTime,
        lost_at: UnixTime,
        reason: LossReason,
    ) {
        let server = session_id.home_server();
        tracing::info!(
            %session_id, %account_id, %server, %reason,
            "session marked dangling"
        );
        self.registry.insert(
            server,
            DanglingEntry {
                session_id,
                account_id,
                auth_ts,
                lost_at,
                reason,
            },
        );
    }

    /// Resolves a dangling session because its user reappeared.
    ///
    /// Returns whether the session had indeed been dangling. `false` is a
    /// normal outcome (the user was never in limbo), not an error. No
    /// store action happens either way — the open record stays valid
    /// because the user is confirmed present.
    pub fn resolve_return(
        &mut self,
        session_id: SessionId,
        account_id: AccountId,
        auth_ts: UnixTime,
    ) -> bool {
        let server = session_id.home_server();
        let found =
            self.registry
                .remove(server, session_id, account_id, auth_ts);
        if found {
            tracing::info!(%session_id, %account_id, %server, "dangling session returned");
        }
        found
    }

    /// Finalizes every dangling session on a server as gone for good.
    ///
    /// Called when the server's link completes (it relinked without these
    /// users) or from the admin `delink` command. Returns the number of
    /// entries finalized, or `None` when the server had no table —
    /// callers report "nothing to reconcile" distinctly from a count.
    ///
    /// The drain detaches fully before any close-out runs; see the module
    /// docs on reentrancy.
    pub fn finalize_server(
        &mut self,
        server: ServerId,
        now: UnixTime,
    ) -> Option<usize> {
        let drained = self.registry.drain_all(server)?;
        let count = drained.len();
        tracing::info!(%server, count, "finalizing dangling sessions");

        for entry in drained {
            self.closer.close_session(
                entry.account_id,
                entry.auth_ts,
                now,
                entry.reason.close_reason(),
            );
        }
        Some(count)
    }

    /// Finalizes every server in the given fully-linked set.
    ///
    /// The periodic catch-all: a server that relinked while the tracker
    /// wasn't actively watching is still caught here. Safe to call
    /// arbitrarily often — servers without a table are skipped at zero
    /// cost. Returns the total number of sessions finalized.
    pub fn sweep_linked(
        &mut self,
        linked: impl IntoIterator<Item = ServerId>,
        now: UnixTime,
    ) -> usize {
        let mut total = 0;
        for server in linked {
            if let Some(count) = self.finalize_server(server, now) {
                total += count;
            }
        }
        if total > 0 {
            tracing::info!(total, "sweep finalized dangling sessions");
        } else {
            tracing::debug!("sweep found nothing to finalize");
        }
        total
    }

    /// Per-server entry counts for diagnostics.
    pub fn dangling_counts(&self) -> Vec<(ServerId, usize)> {
        self.registry.counts()
    }

    /// The dangling entry count for one server.
    pub fn dangling_on(&self, server: ServerId) -> usize {
        self.registry.count_for(server)
    }

    /// Whether no session is currently dangling anywhere.
    pub fn is_idle(&self) -> bool {
        self.registry.is_empty()
    }

    /// Read access to the close-out sink (the session store, in the full
    /// wiring).
    pub fn closer(&self) -> &C {
        &self.closer
    }

    /// Mutable access to the close-out sink.
    pub fn closer_mut(&mut self) -> &mut C {
        &mut self.closer
    }
}

// =========================================================================
// Tests
// =========================================================================
