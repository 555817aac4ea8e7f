//! Scripted netsplit scenario against a live tracker.
//!
//! Runs two process "lifetimes": a netsplit with a partial return, swept
//! up by the background sweeper, followed by a simulated restart that
//! reconciles an orphaned record from the snapshot. Run with
//! `RUST_LOG=debug` to watch the engine's decisions.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use splitwatch::prelude::*;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Simulated network state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Network {
    sessions: StdMutex<HashMap<SessionId, LiveSession>>,
    linked: StdMutex<HashSet<ServerId>>,
}

impl Network {
    fn connect(&self, session_id: SessionId, account: u64, auth_ts: i64) {
        self.sessions.lock().unwrap().insert(
            session_id,
            LiveSession {
                account_id: AccountId(account),
                auth_ts: UnixTime(auth_ts),
            },
        );
    }

    fn drop_session(&self, session_id: SessionId) {
        self.sessions.lock().unwrap().remove(&session_id);
    }

    fn link(&self, server: ServerId) {
        self.linked.lock().unwrap().insert(server);
    }

    fn split(&self, server: ServerId) {
        self.linked.lock().unwrap().remove(&server);
    }
}

/// Local newtype over [`Arc<Network>`] so the foreign `Directory` and
/// `Topology` traits can be implemented without tripping the orphan rule.
#[derive(Clone)]
struct Net(Arc<Network>);

impl Directory for Net {
    fn owner_of(&self, session_id: SessionId) -> Option<LiveSession> {
        self.0.sessions.lock().unwrap().get(&session_id).copied()
    }
}

impl Topology for Net {
    fn is_linked(&self, server: ServerId) -> bool {
        self.0.linked.lock().unwrap().contains(&server)
    }

    fn linked_servers(&self) -> Vec<ServerId> {
        let mut servers: Vec<_> =
            self.0.linked.lock().unwrap().iter().copied().collect();
        servers.sort();
        servers
    }
}

fn print_dump<D: Directory, T: Topology>(tracker: &Tracker<D, T>) {
    for line in dump(tracker) {
        println!("  {line}");
    }
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let net = Arc::new(Network::default());
    let hub = ServerId(1);
    let leaf = ServerId(2);
    net.link(hub);
    net.link(leaf);

    // Three users authenticate: one on the hub, two on the leaf.
    let on_hub = SessionId::new(hub, 100);
    let leaf_a = SessionId::new(leaf, 200);
    let leaf_b = SessionId::new(leaf, 201);
    net.connect(on_hub, 1, 1000);
    net.connect(leaf_a, 2, 1000);
    net.connect(leaf_b, 3, 1000);

    let mut tracker = Tracker::new(
        SessionLog::new(),
        Net(Arc::clone(&net)),
        Net(Arc::clone(&net)),
    );
    for sid in [on_hub, leaf_a, leaf_b] {
        tracker.handle_authenticated(sid).expect("live session");
    }

    // --- Lifetime 1: netsplit -------------------------------------------
    println!("== server {leaf} splits off ==");
    net.split(leaf);
    for sid in [leaf_a, leaf_b] {
        tracker.handle_session_lost(sid, UnixTime::now()).unwrap();
        net.drop_session(sid);
    }
    print_dump(&tracker);

    let tracker = Arc::new(Mutex::new(tracker));
    let sweeper = tokio::spawn(splitwatch::run_sweeper(
        Arc::clone(&tracker),
        Duration::from_millis(250),
    ));

    // The leaf rejoins and user 2 came back with it; user 3 did not.
    println!("== server {leaf} relinks, user #2 returns ==");
    net.connect(leaf_a, 2, 1000);
    tracker
        .lock()
        .await
        .handle_session_returned(leaf_a)
        .unwrap();
    net.link(leaf);

    // No link event is delivered on purpose — the sweeper catches it.
    tokio::time::sleep(Duration::from_millis(700)).await;
    print_dump(&*tracker.lock().await);
    sweeper.abort();

    let snapshot = tracker
        .lock()
        .await
        .store()
        .snapshot_json()
        .expect("snapshot");
    println!("== snapshot ==\n{snapshot}");

    // --- Lifetime 2: restart --------------------------------------------
    println!("== restart: restoring snapshot ==");
    let net = Arc::new(Network::default());
    net.link(hub);
    let store = SessionLog::restore_json(&snapshot).expect("restore");
    let mut tracker =
        Tracker::new(store, Net(Arc::clone(&net)), Net(Arc::clone(&net)));

    // Nobody is live after the restart; both open records are orphans.
    let orphans = tracker.run_startup_scan(UnixTime::now());
    println!("found {orphans} orphaned sessions");
    print_dump(&tracker);

    // An operator force-closes the hub's table instead of waiting.
    match delink(&mut tracker, &["1"], UnixTime::now()) {
        Ok(reply) => println!("delink: {reply}"),
        Err(e) => println!("delink failed: {e}"),
    }
    print_dump(&tracker);
}
