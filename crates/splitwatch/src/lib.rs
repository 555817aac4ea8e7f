//! # Splitwatch
//!
//! Dangling-session reconciliation for distributed IRC networks.
//!
//! When a server splits off the network, every authenticated session on
//! it becomes *uncertain*: neither confirmed present nor confirmed gone.
//! The same happens when the tracker process restarts with sessions still
//! open on remote servers. Splitwatch keeps per-server tables of these
//! dangling sessions and converges them correctly regardless of the order
//! in which users return, servers relink, and sweeps run.
//!
//! This crate is the outermost layer: it binds external lifecycle events
//! (authentication, loss, return, relink, startup) to the reconciliation
//! engine, exposes the admin `dump`/`delink` commands, and runs the
//! periodic catch-all sweep.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use splitwatch::prelude::*;
//!
//! let store = SessionLog::load_from(&snapshot_path)?;
//! let mut tracker = Tracker::new(store, my_directory, my_topology);
//! tracker.run_startup_scan(UnixTime::now());
//! // feed events:
//! // tracker.handle_session_lost(..) / handle_session_returned(..) / ...
//! ```

mod admin;
mod directory;
mod error;
mod sweeper;
mod tracker;

pub use admin::{AdminError, delink, dump};
pub use directory::{Directory, LiveSession, Topology};
pub use error::TrackerError;
pub use sweeper::run_sweeper;
pub use tracker::Tracker;

pub mod prelude {
    //! Everything needed to wire a tracker into a host process.
    pub use crate::{
        AdminError, Directory, LiveSession, Topology, Tracker, TrackerError,
        delink, dump, run_sweeper,
    };
    pub use splitwatch_protocol::{
        AccountId, LossReason, MAX_SERVERS, ServerId, SessionId, UnixTime,
    };
    pub use splitwatch_store::{SessionLog, StoreError};
}
