use std::collections::{BTreeMap, HashMap};

use hexfront_protocol::{
    ActionCategory, ActionId, DataId, FactionId, ResourceId, TargetFilter, TileTypeId, UnitTypeId,
};
use serde::Deserialize;

use crate::rules::RulesError;

/// Global category execution order for turn resolution. Stun runs before the
/// regular move/attack phases so it can strip their orders; the fast tiers
/// resolve before stun and cannot be interrupted by it.
pub const CATEGORY_ORDER: [ActionCategory; 11] = [
    ActionCategory::FastMove,
    ActionCategory::FastAttack,
    ActionCategory::Stun,
    ActionCategory::Move,
    ActionCategory::Attack,
    ActionCategory::SlowMove,
    ActionCategory::SlowAttack,
    ActionCategory::Spawn,
    ActionCategory::Evolve,
    ActionCategory::Reload,
    ActionCategory::Extract,
];

#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub actions: Vec<Action>,
    pub unit_types: Vec<UnitType>,
    pub tile_types: Vec<TileType>,
    pub factions: Vec<Faction>,
    pub resources: Vec<Resource>,

    pub action_ids: HashMap<DataId, ActionId>,
    pub unit_type_ids: HashMap<DataId, UnitTypeId>,
    pub tile_type_ids: HashMap<DataId, TileTypeId>,
    pub faction_ids: HashMap<DataId, FactionId>,
    pub resource_ids: HashMap<DataId, ResourceId>,
}

impl CompiledRules {
    pub fn action(&self, id: ActionId) -> &Action {
        &self.actions[id.raw as usize]
    }

    pub fn unit_type(&self, id: UnitTypeId) -> &UnitType {
        &self.unit_types[id.raw as usize]
    }

    pub fn tile_type(&self, id: TileTypeId) -> &TileType {
        &self.tile_types[id.raw as usize]
    }

    pub fn faction(&self, id: FactionId) -> &Faction {
        &self.factions[id.raw as usize]
    }

    pub fn resource(&self, id: ResourceId) -> &Resource {
        &self.resources[id.raw as usize]
    }

    pub fn action_id(&self, data_id: &str) -> Option<ActionId> {
        self.action_ids.get(data_id).copied()
    }

    pub fn unit_type_id(&self, data_id: &str) -> Option<UnitTypeId> {
        self.unit_type_ids.get(data_id).copied()
    }

    pub fn tile_type_id(&self, data_id: &str) -> Option<TileTypeId> {
        self.tile_type_ids.get(data_id).copied()
    }

    pub fn faction_id(&self, data_id: &str) -> Option<FactionId> {
        self.faction_ids.get(data_id).copied()
    }

    pub fn resource_id(&self, data_id: &str) -> Option<ResourceId> {
        self.resource_ids.get(data_id).copied()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAction {
    pub name: String,
    pub category: ActionCategory,
    #[serde(default)]
    pub min_range: i32,
    #[serde(default)]
    pub max_range: i32,
    #[serde(default)]
    pub power_cost: i32,
    #[serde(default)]
    pub strength_delta: i32,
    #[serde(default = "default_target_filter")]
    pub target_filter: TargetFilter,
    #[serde(default)]
    pub affects_self: bool,
    #[serde(default)]
    pub area_of_effect: Option<RawAreaOfEffect>,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub delay: u32,
    #[serde(default)]
    pub disable_categories: Vec<ActionCategory>,
    #[serde(default)]
    pub spawn_unit: Option<String>,
    #[serde(default)]
    pub evolve_into: Option<String>,
    #[serde(default)]
    pub resource_cost: BTreeMap<String, i64>,
    #[serde(default)]
    pub moves_resources: bool,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_target_filter() -> TargetFilter {
    TargetFilter::None
}

fn default_color() -> String {
    "#e0e0e0".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAreaOfEffect {
    /// Offsets relative to the facing direction, each 0..=5.
    pub directions: Vec<u8>,
    #[serde(default = "default_aoe_distance")]
    pub distance: i32,
    pub impact: i32,
}

fn default_aoe_distance() -> i32 {
    1
}

impl RawAction {
    pub fn compile(
        self,
        key: &str,
        unit_type_ids: &HashMap<DataId, UnitTypeId>,
        resource_ids: &HashMap<DataId, ResourceId>,
    ) -> Result<Action, RulesError> {
        let area_of_effect = match self.area_of_effect {
            Some(raw) => {
                if raw.directions.iter().any(|d| *d > 5) {
                    return Err(RulesError::InvalidDefinition(format!(
                        "action '{key}': area-of-effect direction out of range 0..=5"
                    )));
                }
                Some(AreaOfEffect {
                    directions: raw.directions,
                    distance: raw.distance.max(1),
                    impact: raw.impact,
                })
            }
            None => None,
        };

        let spawn_unit = self
            .spawn_unit
            .map(|id| {
                unit_type_ids
                    .get(&id)
                    .copied()
                    .ok_or(RulesError::MissingId(id))
            })
            .transpose()?;
        let evolve_into = self
            .evolve_into
            .map(|id| {
                unit_type_ids
                    .get(&id)
                    .copied()
                    .ok_or(RulesError::MissingId(id))
            })
            .transpose()?;

        if self.category == ActionCategory::Spawn && spawn_unit.is_none() {
            return Err(RulesError::InvalidDefinition(format!(
                "action '{key}': spawn category requires spawn_unit"
            )));
        }
        if self.category == ActionCategory::Evolve && evolve_into.is_none() {
            return Err(RulesError::InvalidDefinition(format!(
                "action '{key}': evolve category requires evolve_into"
            )));
        }

        let resource_cost = self
            .resource_cost
            .into_iter()
            .map(|(id, amount)| {
                resource_ids
                    .get(&id)
                    .copied()
                    .map(|rid| (rid, amount))
                    .ok_or(RulesError::MissingId(id))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Action {
            key: key.to_string(),
            name: self.name,
            category: self.category,
            min_range: self.min_range.max(0),
            max_range: self.max_range.max(0),
            power_cost: self.power_cost,
            strength_delta: self.strength_delta,
            target_filter: self.target_filter,
            affects_self: self.affects_self,
            area_of_effect,
            duration: self.duration,
            delay: self.delay,
            disable_categories: self.disable_categories,
            spawn_unit,
            evolve_into,
            resource_cost,
            moves_resources: self.moves_resources,
            color: self.color,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Action {
    pub key: String,
    pub name: String,
    pub category: ActionCategory,
    pub min_range: i32,
    pub max_range: i32,
    /// Debited when the effect is prepared; negative values recharge.
    pub power_cost: i32,
    pub strength_delta: i32,
    pub target_filter: TargetFilter,
    pub affects_self: bool,
    pub area_of_effect: Option<AreaOfEffect>,
    /// Extra turns the effect repeats after the cast turn.
    pub duration: u32,
    /// Turns between cast and execution; geometry is fixed at cast time.
    pub delay: u32,
    pub disable_categories: Vec<ActionCategory>,
    pub spawn_unit: Option<UnitTypeId>,
    pub evolve_into: Option<UnitTypeId>,
    pub resource_cost: Vec<(ResourceId, i64)>,
    pub moves_resources: bool,
    pub color: String,
}

#[derive(Debug, Clone)]
pub struct AreaOfEffect {
    pub directions: Vec<u8>,
    pub distance: i32,
    pub impact: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUnitType {
    pub name: String,
    pub strength: i32,
    #[serde(default)]
    pub starting_power: Option<i32>,
    pub actions: Vec<String>,
    #[serde(default)]
    pub passive_actions: Vec<String>,
    #[serde(default = "default_color")]
    pub color: String,
}

impl RawUnitType {
    pub fn compile(
        self,
        key: &str,
        action_ids: &HashMap<DataId, ActionId>,
    ) -> Result<UnitType, RulesError> {
        let resolve = |ids: Vec<String>| {
            ids.into_iter()
                .map(|id| {
                    action_ids
                        .get(&id)
                        .copied()
                        .ok_or(RulesError::MissingId(id))
                })
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(UnitType {
            key: key.to_string(),
            name: self.name,
            base_strength: self.strength.max(1),
            starting_power: self.starting_power.unwrap_or(1).max(0),
            active_actions: resolve(self.actions)?,
            passive_actions: resolve(self.passive_actions)?,
            color: self.color,
        })
    }
}

#[derive(Debug, Clone)]
pub struct UnitType {
    pub key: String,
    pub name: String,
    pub base_strength: i32,
    pub starting_power: i32,
    pub active_actions: Vec<ActionId>,
    pub passive_actions: Vec<ActionId>,
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTileType {
    #[serde(default)]
    pub resources: Vec<String>,
    /// Standing quantities regrow every this many turns.
    #[serde(default)]
    pub growth_frequency: Option<u32>,
    /// Cap on each standing quantity when regrowing.
    #[serde(default)]
    pub max_resource: Option<i64>,
    #[serde(default = "default_color")]
    pub color: String,
}

impl RawTileType {
    pub fn compile(
        self,
        key: &str,
        resource_ids: &HashMap<DataId, ResourceId>,
    ) -> Result<TileType, RulesError> {
        let resources = self
            .resources
            .into_iter()
            .map(|id| {
                resource_ids
                    .get(&id)
                    .copied()
                    .ok_or(RulesError::MissingId(id))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let growth = self.growth_frequency.map(|frequency| ResourceGrowth {
            frequency: frequency.max(1),
            cap: self.max_resource.unwrap_or(i64::MAX),
        });

        Ok(TileType {
            key: key.to_string(),
            resources,
            growth,
            color: self.color,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TileType {
    pub key: String,
    pub resources: Vec<ResourceId>,
    pub growth: Option<ResourceGrowth>,
    pub color: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ResourceGrowth {
    pub frequency: u32,
    pub cap: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFaction {
    #[serde(default)]
    pub description: String,
    pub color: String,
    #[serde(default)]
    pub unit_types: Vec<String>,
    pub initial_units: Vec<String>,
}

impl RawFaction {
    pub fn compile(
        self,
        key: &str,
        unit_type_ids: &HashMap<DataId, UnitTypeId>,
    ) -> Result<Faction, RulesError> {
        let resolve = |ids: Vec<String>| {
            ids.into_iter()
                .map(|id| {
                    unit_type_ids
                        .get(&id)
                        .copied()
                        .ok_or(RulesError::MissingId(id))
                })
                .collect::<Result<Vec<_>, _>>()
        };

        let initial_units = resolve(self.initial_units)?;
        if initial_units.is_empty() {
            return Err(RulesError::InvalidDefinition(format!(
                "faction '{key}': initial_units must not be empty"
            )));
        }

        Ok(Faction {
            key: key.to_string(),
            description: self.description,
            color: self.color,
            roster: resolve(self.unit_types)?,
            initial_units,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Faction {
    pub key: String,
    pub description: String,
    pub color: String,
    pub roster: Vec<UnitTypeId>,
    pub initial_units: Vec<UnitTypeId>,
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub key: String,
}
