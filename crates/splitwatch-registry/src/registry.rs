//! The registry proper: a sparse server → table map with fixed-bucket
//! chained tables underneath.

use std::collections::HashMap;

use splitwatch_protocol::{AccountId, ServerId, SessionId, UnixTime};

use crate::DanglingEntry;

/// Buckets per server table.
///
/// Sized for the expected number of simultaneously-dangling sessions
/// behind a single split; chaining tolerates overflow with degraded
/// lookup time, not lost entries.
pub const BUCKET_COUNT: usize = 500;

fn bucket_of(session_id: SessionId) -> usize {
    session_id.0 as usize % BUCKET_COUNT
}

/// The dangling table for one server.
///
/// Exists only while it holds at least one entry; the registry drops it
/// the moment the last entry is removed, so an allocated-but-empty table
/// can never be observed.
struct ServerTable {
    buckets: Vec<Vec<DanglingEntry>>,
    len: usize,
}

impl ServerTable {
    fn new() -> Self {
        let mut buckets = Vec::with_capacity(BUCKET_COUNT);
        buckets.resize_with(BUCKET_COUNT, Vec::new);
        Self { buckets, len: 0 }
    }

    fn insert(&mut self, entry: DanglingEntry) {
        // Newest entry goes to the front of its chain, so a duplicate
        // key (a caller bug) would be shadowed by the latest insert.
        self.buckets[bucket_of(entry.session_id)].insert(0, entry);
        self.len += 1;
    }

    fn remove(
        &mut self,
        session_id: SessionId,
        account_id: AccountId,
        auth_ts: UnixTime,
    ) -> bool {
        let bucket = &mut self.buckets[bucket_of(session_id)];
        let Some(pos) = bucket
            .iter()
            .position(|e| e.matches(session_id, account_id, auth_ts))
        else {
            return false;
        };
        bucket.remove(pos);
        self.len -= 1;
        true
    }

    fn drain(&mut self) -> Vec<DanglingEntry> {
        let mut all = Vec::with_capacity(self.len);
        for bucket in &mut self.buckets {
            all.append(bucket);
        }
        self.len = 0;
        all
    }
}

/// Mapping from server id to that server's dangling table.
///
/// Sparse: most servers have no table at any given time. Tables are
/// created lazily on the first dangling entry for a server and destroyed
/// when the server's status resolves (or its last entry is individually
/// resolved).
pub struct DanglingRegistry {
    tables: HashMap<ServerId, ServerTable>,
}

impl DanglingRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    /// Files an entry under its server, creating the table if absent.
    ///
    /// No uniqueness check happens here: the caller guarantees at most
    /// one mark per uncertainty episode, so a duplicate key would be a
    /// caller bug rather than a condition to recover from.
    pub fn insert(&mut self, server: ServerId, entry: DanglingEntry) {
        self.tables
            .entry(server)
            .or_insert_with(ServerTable::new)
            .insert(entry);
    }

    /// Removes the first entry structurally equal to the full key.
    ///
    /// Returns whether a match was found. Absence is a normal outcome —
    /// the session genuinely was not dangling — not an error. If the
    /// removed entry was the table's last, the table is dropped too.
    pub fn remove(
        &mut self,
        server: ServerId,
        session_id: SessionId,
        account_id: AccountId,
        auth_ts: UnixTime,
    ) -> bool {
        let Some(table) = self.tables.get_mut(&server) else {
            return false;
        };
        let found = table.remove(session_id, account_id, auth_ts);
        if table.len == 0 {
            self.tables.remove(&server);
        }
        found
    }

    /// Removes every entry for a server, destroying its table.
    ///
    /// Returns `None` when the server has no table ("nothing to
    /// reconcile"), which callers report distinctly from a successful
    /// drain. A returned list is never empty: a table only exists while
    /// it holds entries.
    pub fn drain_all(&mut self, server: ServerId) -> Option<Vec<DanglingEntry>> {
        let mut table = self.tables.remove(&server)?;
        Some(table.drain())
    }

    /// Per-server entry counts, sorted by server id.
    ///
    /// Read-only diagnostic enumeration for the admin `dump` command.
    pub fn counts(&self) -> Vec<(ServerId, usize)> {
        let mut counts: Vec<_> =
            self.tables.iter().map(|(s, t)| (*s, t.len)).collect();
        counts.sort_by_key(|(s, _)| *s);
        counts
    }

    /// The entry count for one server (zero when it has no table).
    pub fn count_for(&self, server: ServerId) -> usize {
        self.tables.get(&server).map_or(0, |t| t.len)
    }

    /// Whether any server currently has dangling entries.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Total entries across all servers.
    pub fn total(&self) -> usize {
        self.tables.values().map(|t| t.len).sum()
    }
}

impl Default for DanglingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use splitwatch_protocol::LossReason;

    use super::*;

    // -- Helpers ----------------------------------------------------------

    fn entry(session: u32, account: u64, auth_ts: i64) -> DanglingEntry {
        DanglingEntry {
            session_id: SessionId(session),
            account_id: AccountId(account),
            auth_ts: UnixTime(auth_ts),
            lost_at: UnixTime(auth_ts + 100),
            reason: LossReason::Netsplit,
        }
    }

    fn sid(n: u16) -> ServerId {
        ServerId(n)
    }

    // =====================================================================
    // insert() / remove()
    // =====================================================================

    #[test]
    fn test_insert_creates_table_lazily() {
        let mut reg = DanglingRegistry::new();
        assert!(reg.is_empty());

        reg.insert(sid(3), entry(42, 7, 1000));

        assert_eq!(reg.count_for(sid(3)), 1);
        assert_eq!(reg.count_for(sid(4)), 0);
    }

    #[test]
    fn test_remove_matching_entry_returns_true() {
        let mut reg = DanglingRegistry::new();
        reg.insert(sid(3), entry(42, 7, 1000));

        assert!(reg.remove(sid(3), SessionId(42), AccountId(7), UnixTime(1000)));
        assert_eq!(reg.count_for(sid(3)), 0);
    }

    #[test]
    fn test_remove_unknown_server_returns_false() {
        let mut reg = DanglingRegistry::new();

        assert!(!reg.remove(sid(9), SessionId(1), AccountId(1), UnixTime(1)));
    }

    #[test]
    fn test_remove_requires_all_three_key_fields() {
        // Numerics are recycled — a session-id match alone must not
        // resolve an entry belonging to a different account or epoch.
        let mut reg = DanglingRegistry::new();
        reg.insert(sid(3), entry(42, 7, 1000));

        assert!(!reg.remove(sid(3), SessionId(42), AccountId(8), UnixTime(1000)));
        assert!(!reg.remove(sid(3), SessionId(42), AccountId(7), UnixTime(2000)));
        assert!(!reg.remove(sid(3), SessionId(43), AccountId(7), UnixTime(1000)));
        // Registry unchanged by the misses.
        assert_eq!(reg.count_for(sid(3)), 1);
    }

    #[test]
    fn test_remove_is_not_repeatable() {
        let mut reg = DanglingRegistry::new();
        reg.insert(sid(3), entry(42, 7, 1000));

        assert!(reg.remove(sid(3), SessionId(42), AccountId(7), UnixTime(1000)));
        assert!(!reg.remove(sid(3), SessionId(42), AccountId(7), UnixTime(1000)));
    }

    #[test]
    fn test_remove_last_entry_drops_table() {
        // A table exists iff it has at least one entry.
        let mut reg = DanglingRegistry::new();
        reg.insert(sid(3), entry(42, 7, 1000));
        reg.remove(sid(3), SessionId(42), AccountId(7), UnixTime(1000));

        // No table left: a drain now reports "nothing to reconcile".
        assert!(reg.drain_all(sid(3)).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_remove_keeps_table_while_entries_remain() {
        let mut reg = DanglingRegistry::new();
        reg.insert(sid(3), entry(42, 7, 1000));
        reg.insert(sid(3), entry(43, 8, 1000));

        reg.remove(sid(3), SessionId(42), AccountId(7), UnixTime(1000));

        assert_eq!(reg.count_for(sid(3)), 1);
        assert!(!reg.is_empty());
    }

    #[test]
    fn test_colliding_numerics_share_a_bucket_without_loss() {
        // Two numerics that hash to the same bucket chain together;
        // each remains individually removable.
        let mut reg = DanglingRegistry::new();
        let a = 42u32;
        let b = 42u32 + BUCKET_COUNT as u32;
        reg.insert(sid(3), entry(a, 1, 1000));
        reg.insert(sid(3), entry(b, 2, 1000));

        assert!(reg.remove(sid(3), SessionId(b), AccountId(2), UnixTime(1000)));
        assert!(reg.remove(sid(3), SessionId(a), AccountId(1), UnixTime(1000)));
        assert!(reg.is_empty());
    }

    // =====================================================================
    // drain_all()
    // =====================================================================

    #[test]
    fn test_drain_all_returns_every_entry_and_drops_table() {
        let mut reg = DanglingRegistry::new();
        reg.insert(sid(5), entry(1, 1, 1000));
        reg.insert(sid(5), entry(2, 2, 1000));
        reg.insert(sid(6), entry(3, 3, 1000));

        let drained = reg.drain_all(sid(5)).expect("table exists");

        assert_eq!(drained.len(), 2);
        assert_eq!(reg.count_for(sid(5)), 0);
        // Server 6 untouched.
        assert_eq!(reg.count_for(sid(6)), 1);
        // Second drain distinguishes "no table" from "drained zero".
        assert!(reg.drain_all(sid(5)).is_none());
    }

    #[test]
    fn test_drain_all_no_table_returns_none() {
        let mut reg = DanglingRegistry::new();
        assert!(reg.drain_all(sid(1)).is_none());
    }

    // =====================================================================
    // counts()
    // =====================================================================

    #[test]
    fn test_counts_sorted_by_server() {
        let mut reg = DanglingRegistry::new();
        reg.insert(sid(9), entry(1, 1, 1000));
        reg.insert(sid(2), entry(2, 2, 1000));
        reg.insert(sid(2), entry(3, 3, 1000));

        assert_eq!(reg.counts(), vec![(sid(2), 2), (sid(9), 1)]);
        assert_eq!(reg.total(), 3);
    }

    #[test]
    fn test_counts_empty_registry() {
        let reg = DanglingRegistry::new();
        assert!(reg.counts().is_empty());
        assert_eq!(reg.total(), 0);
    }
}
