//! The reconciliation engine: state transitions for dangling sessions.
//!
//! This crate decides what happens to a session in limbo:
//!
//! 1. **Marking** — a session becomes dangling ([`Reconciler::mark_dangling`])
//! 2. **Resolution** — the user comes back ([`Reconciler::resolve_return`])
//! 3. **Finalization** — the server relinks without them
//!    ([`Reconciler::finalize_server`], [`Reconciler::sweep_linked`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Event binding (above)  ← translates network/lifecycle events into calls here
//!     ↕
//! Engine (this crate)    ← drives the registry, notifies the session store
//!     ↕
//! Registry (below)       ← owns the per-server dangling tables
//! ```
//!
//! The durable session store plugs in through the [`SessionCloser`] trait;
//! the engine never talks to storage directly.

mod closer;
mod reconciler;

pub use closer::SessionCloser;
pub use reconciler::Reconciler;
