//! The tracker: binds host lifecycle events to the reconciliation engine.
//!
//! Each accepted event arrives as a plain method call on [`Tracker`]:
//!
//!   1. account authenticated → open a durable session record
//!   2. session lost → mark dangling, but only if the home server is
//!      actually unreachable (a voluntary quit never enters the registry)
//!   3. user returned → resolve the dangling entry
//!   4. server fully linked → finalize whatever is still dangling there
//!   5. process start → scan the restored store for orphaned records
//!
//! The host performs whatever subscription mechanism its environment
//! offers and forwards into these methods; the tracker itself registers
//! nothing, which keeps teardown deterministic and tests trivial.

use splitwatch_engine::Reconciler;
use splitwatch_protocol::{
    AccountId, LossReason, ServerId, SessionId, UnixTime,
};
use splitwatch_store::SessionLog;

use crate::{Directory, Topology, TrackerError};

/// The assembled reconciliation stack: engine + store + collaborator views.
///
/// Owns the engine (which owns the registry and the session log) and the
/// host's directory/topology views. All operations are synchronous and
/// run on whatever single logical thread drives the host's event loop;
/// the sweeper wraps a `Tracker` in a mutex when it needs to share one.
pub struct Tracker<D: Directory, T: Topology> {
    engine: Reconciler<SessionLog>,
    directory: D,
    topology: T,
}

impl<D: Directory, T: Topology> Tracker<D, T> {
    /// Wires a tracker from a (possibly restored) session log and the
    /// host's collaborator views.
    pub fn new(store: SessionLog, directory: D, topology: T) -> Self {
        Self {
            engine: Reconciler::new(store),
            directory,
            topology,
        }
    }

    /// The account behind a live connection numeric.
    ///
    /// Pure lookup, independent of dangling state — exposed for
    /// collaborators that need to resolve an identifier to its account.
    pub fn owner_of(
        &self,
        session_id: SessionId,
    ) -> Result<AccountId, TrackerError> {
        self.directory
            .owner_of(session_id)
            .map(|live| live.account_id)
            .ok_or(TrackerError::NoSuchSession(session_id))
    }

    /// Records a durable session for a freshly-authenticated connection.
    ///
    /// Called once per successful authentication.
    pub fn handle_authenticated(
        &mut self,
        session_id: SessionId,
    ) -> Result<(), TrackerError> {
        let live = self
            .directory
            .owner_of(session_id)
            .ok_or(TrackerError::NoSuchSession(session_id))?;
        self.engine
            .closer_mut()
            .open_session(live.account_id, session_id, live.auth_ts);
        Ok(())
    }

    /// Handles the loss of an authenticated session.
    ///
    /// Must be called while the directory still knows the departing
    /// connection. Only a loss correlated with the home server itself
    /// being unreachable marks the session dangling; if the server is
    /// still linked this was a voluntary quit and the host's normal quit
    /// path owns the record. Returns whether the session was marked.
    pub fn handle_session_lost(
        &mut self,
        session_id: SessionId,
        lost_at: UnixTime,
    ) -> Result<bool, TrackerError> {
        let live = self
            .directory
            .owner_of(session_id)
            .ok_or(TrackerError::NoSuchSession(session_id))?;
        let server = session_id.home_server();

        if self.topology.is_linked(server) {
            tracing::debug!(%session_id, %server, "session quit normally, not tracking");
            return Ok(false);
        }

        self.engine.mark_dangling(
            session_id,
            live.account_id,
            live.auth_ts,
            lost_at,
            LossReason::Netsplit,
        );
        Ok(true)
    }

    /// Handles a user reappearing with a connection the directory
    /// recognizes.
    ///
    /// Returns whether the session had been dangling. The durable record
    /// needs no action either way — the user is confirmed present.
    pub fn handle_session_returned(
        &mut self,
        session_id: SessionId,
    ) -> Result<bool, TrackerError> {
        let live = self
            .directory
            .owner_of(session_id)
            .ok_or(TrackerError::NoSuchSession(session_id))?;
        Ok(self.engine.resolve_return(
            session_id,
            live.account_id,
            live.auth_ts,
        ))
    }

    /// Handles a server's link completing.
    ///
    /// Anyone still dangling on it did not come back with the relink and
    /// is finalized as gone. Returns the finalized count, or `None` when
    /// the server had no dangling table.
    pub fn handle_server_linked(
        &mut self,
        server: ServerId,
        now: UnixTime,
    ) -> Option<usize> {
        self.engine.finalize_server(server, now)
    }

    /// Scans the restored session log for orphaned records.
    ///
    /// Run once at process start, after the store is restored but before
    /// the tracker trusts its own view of link state. Every open record
    /// with no live connection behind it is marked restart-dangling.
    /// Returns the number of orphans found.
    pub fn run_startup_scan(&mut self, now: UnixTime) -> usize {
        let directory = &self.directory;
        let orphans = self
            .engine
            .closer()
            .orphaned(|s| directory.owner_of(s).is_some());

        for orphan in &orphans {
            self.engine.mark_dangling(
                orphan.session_id,
                orphan.account_id,
                orphan.auth_ts,
                now,
                LossReason::Restart,
            );
        }
        if !orphans.is_empty() {
            tracing::info!(count = orphans.len(), "orphaned sessions found at startup");
        }
        orphans.len()
    }

    /// Finalizes every server the topology currently reports linked.
    ///
    /// The periodic catch-all for relinks the tracker missed. Idempotent;
    /// returns the total number of sessions finalized.
    pub fn sweep(&mut self, now: UnixTime) -> usize {
        self.engine
            .sweep_linked(self.topology.linked_servers(), now)
    }

    /// Force-closes a named server's dangling table (admin path).
    pub fn force_delink(
        &mut self,
        server: ServerId,
        now: UnixTime,
    ) -> Option<usize> {
        self.engine.finalize_server(server, now)
    }

    /// Per-server dangling counts for diagnostics.
    pub fn dangling_counts(&self) -> Vec<(ServerId, usize)> {
        self.engine.dangling_counts()
    }

    /// The dangling count for one server.
    pub fn dangling_on(&self, server: ServerId) -> usize {
        self.engine.dangling_on(server)
    }

    /// Read access to the durable session log.
    pub fn store(&self) -> &SessionLog {
        self.engine.closer()
    }

    /// Mutable access to the durable session log (snapshotting, host
    /// quit handling).
    pub fn store_mut(&mut self) -> &mut SessionLog {
        self.engine.closer_mut()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::rc::Rc;

    use splitwatch_store::RecordState;

    use super::*;
    use crate::LiveSession;

    // -- Mock network -----------------------------------------------------

    /// A fake nick directory + server table the tests mutate directly.
    #[derive(Default)]
    struct MockNet {
        sessions: RefCell<HashMap<SessionId, LiveSession>>,
        linked: RefCell<HashSet<ServerId>>,
    }

    impl MockNet {
        fn connect(&self, session_id: SessionId, account: u64, auth_ts: i64) {
            self.sessions.borrow_mut().insert(
                session_id,
                LiveSession {
                    account_id: AccountId(account),
                    auth_ts: UnixTime(auth_ts),
                },
            );
        }

        fn drop_session(&self, session_id: SessionId) {
            self.sessions.borrow_mut().remove(&session_id);
        }

        fn link(&self, server: ServerId) {
            self.linked.borrow_mut().insert(server);
        }
    }

    impl Directory for Rc<MockNet> {
        fn owner_of(&self, session_id: SessionId) -> Option<LiveSession> {
            self.sessions.borrow().get(&session_id).copied()
        }
    }

    impl Topology for Rc<MockNet> {
        fn is_linked(&self, server: ServerId) -> bool {
            self.linked.borrow().contains(&server)
        }

        fn linked_servers(&self) -> Vec<ServerId> {
            let mut servers: Vec<_> =
                self.linked.borrow().iter().copied().collect();
            servers.sort();
            servers
        }
    }

    fn tracker() -> (Tracker<Rc<MockNet>, Rc<MockNet>>, Rc<MockNet>) {
        let net = Rc::new(MockNet::default());
        let t = Tracker::new(SessionLog::new(), Rc::clone(&net), Rc::clone(&net));
        (t, net)
    }

    fn numeric(server: u16, slot: u32) -> SessionId {
        SessionId::new(ServerId(server), slot)
    }

    // =====================================================================
    // owner_of() / handle_authenticated()
    // =====================================================================

    #[test]
    fn test_owner_of_known_session_returns_account() {
        let (t, net) = tracker();
        net.connect(numeric(3, 42), 7, 1000);

        assert_eq!(t.owner_of(numeric(3, 42)).unwrap(), AccountId(7));
    }

    #[test]
    fn test_owner_of_unknown_session_is_error() {
        let (t, _net) = tracker();
        assert!(matches!(
            t.owner_of(numeric(3, 42)),
            Err(TrackerError::NoSuchSession(s)) if s == numeric(3, 42)
        ));
    }

    #[test]
    fn test_handle_authenticated_opens_store_record() {
        let (mut t, net) = tracker();
        net.connect(numeric(3, 42), 7, 1000);

        t.handle_authenticated(numeric(3, 42)).unwrap();

        let record = t.store().get(AccountId(7)).expect("record");
        assert!(record.is_open());
        assert_eq!(record.home_server, ServerId(3));
    }

    // =====================================================================
    // handle_session_lost()
    // =====================================================================

    #[test]
    fn test_lost_while_server_split_marks_dangling() {
        let (mut t, net) = tracker();
        net.connect(numeric(3, 42), 7, 1000);
        // Server 3 is not linked — this loss is part of a netsplit.
        let marked = t
            .handle_session_lost(numeric(3, 42), UnixTime(1100))
            .unwrap();

        assert!(marked);
        assert_eq!(t.dangling_on(ServerId(3)), 1);
    }

    #[test]
    fn test_lost_while_server_linked_is_voluntary_quit() {
        // The home server is fine — the user just left. Must not enter
        // the registry.
        let (mut t, net) = tracker();
        net.connect(numeric(3, 42), 7, 1000);
        net.link(ServerId(3));

        let marked = t
            .handle_session_lost(numeric(3, 42), UnixTime(1100))
            .unwrap();

        assert!(!marked);
        assert_eq!(t.dangling_on(ServerId(3)), 0);
    }

    #[test]
    fn test_lost_unknown_session_is_error() {
        let (mut t, _net) = tracker();
        assert!(t
            .handle_session_lost(numeric(3, 42), UnixTime(1100))
            .is_err());
    }

    // =====================================================================
    // handle_session_returned()
    // =====================================================================

    #[test]
    fn test_return_resolves_dangling_entry() {
        let (mut t, net) = tracker();
        net.connect(numeric(3, 42), 7, 1000);
        t.handle_session_lost(numeric(3, 42), UnixTime(1100)).unwrap();

        // The server rejoins with the user still on it.
        let was_dangling =
            t.handle_session_returned(numeric(3, 42)).unwrap();

        assert!(was_dangling);
        assert_eq!(t.dangling_on(ServerId(3)), 0);
    }

    #[test]
    fn test_return_of_never_dangling_session_is_false() {
        let (mut t, net) = tracker();
        net.connect(numeric(3, 42), 7, 1000);

        assert!(!t.handle_session_returned(numeric(3, 42)).unwrap());
    }

    #[test]
    fn test_return_with_new_auth_epoch_does_not_match_old_entry() {
        // The numeric was recycled to a different authentication epoch;
        // the dangling entry for the old epoch must stay put.
        let (mut t, net) = tracker();
        net.connect(numeric(3, 42), 7, 1000);
        t.handle_session_lost(numeric(3, 42), UnixTime(1100)).unwrap();

        net.connect(numeric(3, 42), 7, 5000); // re-auth, new epoch
        let was_dangling =
            t.handle_session_returned(numeric(3, 42)).unwrap();

        assert!(!was_dangling);
        assert_eq!(t.dangling_on(ServerId(3)), 1);
    }

    // =====================================================================
    // handle_server_linked() / sweep()
    // =====================================================================

    #[test]
    fn test_server_linked_finalizes_and_closes_records() {
        let (mut t, net) = tracker();
        net.connect(numeric(3, 42), 7, 1000);
        t.handle_authenticated(numeric(3, 42)).unwrap();
        t.handle_session_lost(numeric(3, 42), UnixTime(1100)).unwrap();
        net.drop_session(numeric(3, 42));

        let finalized = t.handle_server_linked(ServerId(3), UnixTime(2000));

        assert_eq!(finalized, Some(1));
        assert_eq!(t.dangling_on(ServerId(3)), 0);
        assert_eq!(
            t.store().get(AccountId(7)).unwrap().state,
            RecordState::Closed {
                closed_at: UnixTime(2000),
                reason: "netsplit".into()
            }
        );
    }

    #[test]
    fn test_server_linked_with_no_table_returns_none() {
        let (mut t, _net) = tracker();
        assert_eq!(t.handle_server_linked(ServerId(3), UnixTime(2000)), None);
    }

    #[test]
    fn test_sweep_catches_missed_relink() {
        // The relink event was never delivered; the periodic sweep still
        // reconciles once the topology reports the server linked.
        let (mut t, net) = tracker();
        net.connect(numeric(3, 42), 7, 1000);
        t.handle_session_lost(numeric(3, 42), UnixTime(1100)).unwrap();

        assert_eq!(t.sweep(UnixTime(2000)), 0); // still split
        net.link(ServerId(3));
        assert_eq!(t.sweep(UnixTime(2100)), 1);
        assert_eq!(t.sweep(UnixTime(2200)), 0); // idempotent
    }

    // =====================================================================
    // run_startup_scan()
    // =====================================================================

    #[test]
    fn test_startup_scan_marks_orphans_as_restart() {
        let (mut t, net) = tracker();
        // Two records restored from a snapshot; only account 1's
        // connection still exists.
        t.store_mut()
            .open_session(AccountId(1), numeric(3, 10), UnixTime(1000));
        t.store_mut()
            .open_session(AccountId(2), numeric(4, 20), UnixTime(1000));
        net.connect(numeric(3, 10), 1, 1000);

        let found = t.run_startup_scan(UnixTime(5000));

        assert_eq!(found, 1);
        assert_eq!(t.dangling_on(ServerId(4)), 1);
        assert_eq!(t.dangling_on(ServerId(3)), 0);

        // When server 4 links, the orphan closes with the restart reason.
        t.handle_server_linked(ServerId(4), UnixTime(6000));
        assert_eq!(
            t.store().get(AccountId(2)).unwrap().state,
            RecordState::Closed {
                closed_at: UnixTime(6000),
                reason: "restart".into()
            }
        );
    }

    #[test]
    fn test_startup_scan_empty_store_finds_nothing() {
        let (mut t, _net) = tracker();
        assert_eq!(t.run_startup_scan(UnixTime(5000)), 0);
    }

    // =====================================================================
    // Cross-table invariant
    // =====================================================================

    #[test]
    fn test_entry_key_lives_in_exactly_one_table() {
        // Marking sessions on different servers files each under its own
        // home server; resolving one leaves the others untouched.
        let (mut t, net) = tracker();
        for server in [3u16, 4, 5] {
            let sid = numeric(server, 42);
            net.connect(sid, u64::from(server), 1000);
            t.handle_session_lost(sid, UnixTime(1100)).unwrap();
        }
        assert_eq!(
            t.dangling_counts(),
            vec![(ServerId(3), 1), (ServerId(4), 1), (ServerId(5), 1)]
        );

        t.handle_session_returned(numeric(4, 42)).unwrap();

        assert_eq!(
            t.dangling_counts(),
            vec![(ServerId(3), 1), (ServerId(5), 1)]
        );
    }
}
