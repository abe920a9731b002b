use serde::{Deserialize, Serialize};

use crate::{ActionId, FactionId, ResourceId, TileTypeId, UnitTypeId};

/// Phase bucket an action resolves in. Categories execute in a fixed global
/// order each turn; the three movement and attack tiers are distinct
/// categories so that, e.g., a fast attack lands before any regular move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    FastMove,
    FastAttack,
    Stun,
    Move,
    Attack,
    SlowMove,
    SlowAttack,
    Spawn,
    Evolve,
    Reload,
    Extract,
}

/// Which units on an affected tile an action applies to, relative to the actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFilter {
    Enemies,
    Friendly,
    All,
    None,
}

/// Full rules view for clients (action palettes, unit rosters, tile legend).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RulesCatalog {
    pub actions: Vec<CatalogAction>,
    pub unit_types: Vec<CatalogUnitType>,
    pub tile_types: Vec<CatalogTileType>,
    pub factions: Vec<CatalogFaction>,
    pub resources: Vec<CatalogResource>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogAction {
    pub id: ActionId,
    pub key: String,
    pub name: String,
    pub category: ActionCategory,
    pub min_range: i32,
    pub max_range: i32,
    pub power_cost: i32,
    pub strength_delta: i32,
    pub target_filter: TargetFilter,
    pub affects_self: bool,
    pub duration: u32,
    pub delay: u32,
    pub color: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogUnitType {
    pub id: UnitTypeId,
    pub key: String,
    pub name: String,
    pub base_strength: i32,
    pub starting_power: i32,
    pub active_actions: Vec<ActionId>,
    pub passive_actions: Vec<ActionId>,
    pub color: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogTileType {
    pub id: TileTypeId,
    pub key: String,
    pub resources: Vec<ResourceId>,
    pub color: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogFaction {
    pub id: FactionId,
    pub key: String,
    pub description: String,
    pub roster: Vec<UnitTypeId>,
    pub initial_units: Vec<UnitTypeId>,
    pub color: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogResource {
    pub id: ResourceId,
    pub key: String,
}
