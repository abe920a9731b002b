//! Deterministic simulation core for Hexfront.
//!
//! The engine is a plain in-memory state machine: catalogs compile once from
//! YAML, a `Game` owns the board and roster for one match, orders arrive
//! through `Game::submit_order`, and `Game::resolve_turn` runs the phased
//! pipeline once every player has committed.

mod board;
mod entities;
mod game;
mod rules;
mod unit;

pub use crate::board::*;
pub use crate::entities::*;
pub use crate::game::*;
pub use crate::rules::*;
pub use crate::unit::*;
