//! Hexfront match server.
//!
//! Serializes concurrent order submissions into the core engine, fires turn
//! resolution when the readiness gate opens, and hands snapshots to a
//! `Broadcaster`. Network transport is an external collaborator; it talks to
//! a match only through `MatchSession` and the `protocol` message types.

pub mod config;
pub mod protocol;
mod session;

pub use crate::config::ServerConfig;
pub use crate::session::{
    Broadcaster, MatchSession, NullBroadcaster, SessionError, SubmitOutcome,
};
