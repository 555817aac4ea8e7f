//! The dangling registry: per-server tables of sessions in limbo.
//!
//! Every entry here corresponds to a user who has an open record in the
//! session store, but whose actual fate is unknown — either their home
//! server split off the network, or the tracker restarted and found the
//! record with no matching live connection.
//!
//! Entries leave in exactly one of three ways: the user comes back (the
//! entry is dropped), the server relinks without them (the caller
//! finalizes the drained entries), or an operator force-closes the
//! server's table.
//!
//! This crate is a pure data structure — no logging, no I/O, no
//! callbacks. The reconciliation engine drives it.

mod entry;
mod registry;

pub use entry::DanglingEntry;
pub use registry::{BUCKET_COUNT, DanglingRegistry};
