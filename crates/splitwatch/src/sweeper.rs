//! Periodic catch-all sweep task.
//!
//! Some code paths relink a server without a distinguishable event ever
//! reaching the tracker. The sweeper papers over all of them: every
//! `period`, finalize whatever is dangling on servers the topology
//! reports fully linked. Sweeping is idempotent, so the period is purely
//! a latency/overhead trade-off.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use splitwatch_protocol::UnixTime;
use tokio::sync::Mutex;
use tokio::time::{self, MissedTickBehavior};

use crate::{Directory, Topology, Tracker};

/// Runs the sweep loop forever. Spawn it and keep the `JoinHandle` to
/// abort at shutdown.
///
/// The first sweep is delayed by a random fraction of the period so that
/// multiple tracker processes started together don't sweep in lockstep.
pub async fn run_sweeper<D, T>(
    tracker: Arc<Mutex<Tracker<D, T>>>,
    period: Duration,
) where
    D: Directory,
    T: Topology,
{
    let jitter_ms = {
        let max = (period.as_millis().max(1)) as u64;
        rand::rng().random_range(0..max)
    };
    time::sleep(Duration::from_millis(jitter_ms)).await;

    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!(period_ms = period.as_millis() as u64, "sweeper started");

    loop {
        interval.tick().await;
        let finalized = tracker.lock().await.sweep(UnixTime::now());
        if finalized > 0 {
            tracing::info!(finalized, "periodic sweep finalized sessions");
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
