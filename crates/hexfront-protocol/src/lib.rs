//! Shared protocol types for the Hexfront simulation.
//!
//! This is the leaf crate of the workspace: hex coordinate math, typed ids,
//! the order/event/snapshot/catalog types exchanged between simulation and
//! transport layers, and the wire encoding helpers.

mod catalog;
mod event;
mod hex;
mod ids;
mod order;
mod snapshot;
mod victory;
pub mod wire;

pub use crate::catalog::*;
pub use crate::event::*;
pub use crate::hex::*;
pub use crate::ids::*;
pub use crate::order::*;
pub use crate::snapshot::*;
pub use crate::victory::*;
pub use crate::wire::WireError;
