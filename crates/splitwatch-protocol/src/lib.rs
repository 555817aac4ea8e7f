//! Shared identity types for splitwatch.
//!
//! Every other crate in the workspace speaks in terms of these types:
//! who a session belongs to ([`AccountId`]), which connection it is
//! ([`SessionId`]), which server it lives on ([`ServerId`]), and why its
//! fate became uncertain ([`LossReason`]).

mod types;

pub use types::{
    AccountId, LossReason, MAX_SERVERS, ServerId, SessionId, UnixTime,
};
