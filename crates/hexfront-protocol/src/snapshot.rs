use serde::{Deserialize, Serialize};

use crate::{
    ActionId, Event, FactionId, Hex, PlayerId, ResourceId, TileTypeId, UnitId, UnitTypeId,
};

/// Full game state broadcast after each resolved turn (and for initial sync).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub turn: u32,
    pub board: BoardSnapshot,
    pub players: Vec<PlayerSnapshot>,
    pub units: Vec<UnitSnapshot>,
    /// Effect log of the turn that just resolved, in execution order.
    #[serde(default)]
    pub effects: Vec<Event>,
    /// Units removed during the last cleanup phase.
    #[serde(default)]
    pub defeated: Vec<DefeatedUnit>,
    /// Delayed/duration effects still waiting on a future turn.
    #[serde(default)]
    pub pending: Vec<PendingEffectSnapshot>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub radius: i32,
    pub tiles: Vec<TileSnapshot>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileSnapshot {
    pub pos: Hex,
    pub tile_type: TileTypeId,
    pub height: i32,
    pub owner: Option<PlayerId>,
    /// Standing resources still in the ground.
    #[serde(default)]
    pub standing: Vec<ResourceAmount>,
    /// Extracted resources stored on the tile.
    #[serde(default)]
    pub storage: Vec<ResourceAmount>,
    pub occupants: Vec<UnitId>,
    /// Directions (0..5) from which this tile can be entered uphill.
    #[serde(default)]
    pub enterable_from: Vec<u8>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ResourceAmount {
    pub resource: ResourceId,
    pub amount: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub faction: FactionId,
    pub resources: Vec<ResourceAmount>,
    pub unit_count: u32,
}

/// Compact unit state for broadcast.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: UnitId,
    pub owner: PlayerId,
    pub unit_type: UnitTypeId,
    pub pos: Hex,
    pub strength: i32,
    pub power: i32,
    pub active_actions: Vec<ActionId>,
    pub passive_actions: Vec<ActionId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DefeatedUnit {
    pub unit: UnitId,
    pub owner: PlayerId,
    pub unit_type: UnitTypeId,
    pub at: Hex,
}

/// A scheduled effect with its cast-time geometry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingEffectSnapshot {
    pub execute_turn: u32,
    pub unit: UnitId,
    pub action: ActionId,
    #[serde(default)]
    pub target: Option<Hex>,
    #[serde(default)]
    pub aoe: Vec<Hex>,
}
