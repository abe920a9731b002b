use std::collections::{BTreeMap, HashSet};

use hexfront_protocol::{
    opposite_direction, ActionCategory, ActionId, BoardSnapshot, CatalogAction, CatalogFaction,
    CatalogResource, CatalogTileType, CatalogUnitType, DefeatedUnit, Event, FactionId, GameResult,
    Hex, Order, PendingEffectSnapshot, PlayerId, PlayerSnapshot, ResourceAmount, ResourceId,
    ResourceThreshold, RulesCatalog, Snapshot, TargetFilter, TileSnapshot, TileTypeId, UnitId,
    UnitSnapshot, UnitTypeId, VictoryReason, VictorySettings,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    board::{Board, BoardLayout},
    entities::EntityStore,
    rules::{AreaOfEffect, CompiledRules, RulesError, CATEGORY_ORDER},
    unit::Unit,
};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("unknown action")]
    UnknownAction,
    #[error("unknown unit")]
    UnknownUnit,
    #[error("unknown player")]
    UnknownPlayer,
    #[error("unit does not belong to the submitting player")]
    NotYourUnit,
    #[error("unit cannot perform this action")]
    MissingCapability,
    #[error("not enough power")]
    InsufficientPower,
    #[error("not enough stored resources on the unit's tile")]
    InsufficientResources,
    #[error("action requires a movement path")]
    MissingPath,
    #[error("path must start at the unit's tile")]
    DetachedPath,
    #[error("path contains a non-adjacent or off-board step")]
    BrokenPath,
    #[error("path exceeds the action's maximum range")]
    PathTooLong,
    #[error("path climbs where the height rule forbids it")]
    HeightBlocked,
    #[error("game is already over")]
    GameOver,
}

/// Per-match settings. Board shape and win conditions are data so matches of
/// different sizes and objectives share one engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchConfig {
    pub layout: BoardLayout,
    /// Upper bound on any unit's power.
    pub max_unit_power: i32,
    /// Win when every opponent has zero units.
    pub elimination: bool,
    /// Win when an accumulated resource total reaches a goal, by name.
    #[serde(default)]
    pub resource_goals: BTreeMap<String, i64>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            layout: BoardLayout::default(),
            max_unit_power: 5,
            elimination: true,
            resource_goals: BTreeMap::from([("gold".to_string(), 10)]),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub faction: FactionId,
    /// Recomputed from scratch every turn from exclusively-held tiles.
    pub resources: BTreeMap<ResourceId, i64>,
}

/// An order candidate awaiting the prepare phase: an explicit submission or
/// an injected passive.
struct Candidate {
    unit: UnitId,
    owner: PlayerId,
    action: ActionId,
    path: Vec<Hex>,
    amount: Option<i64>,
}

/// Target/AoE tiles fixed at cast time for delayed effects.
#[derive(Clone, Debug)]
struct Geometry {
    target: Hex,
    aoe: Vec<Hex>,
}

/// A prepared effect, ready for category execution this turn or a later one.
#[derive(Clone, Debug)]
struct Effect {
    unit: UnitId,
    owner: PlayerId,
    action: ActionId,
    category: ActionCategory,
    path: Vec<Hex>,
    amount: Option<i64>,
    geometry: Option<Geometry>,
}

#[derive(Clone, Debug)]
struct PendingEffect {
    execute_turn: u32,
    effect: Effect,
}

fn category_slot(category: ActionCategory) -> usize {
    match category {
        ActionCategory::FastMove => 0,
        ActionCategory::FastAttack => 1,
        ActionCategory::Stun => 2,
        ActionCategory::Move => 3,
        ActionCategory::Attack => 4,
        ActionCategory::SlowMove => 5,
        ActionCategory::SlowAttack => 6,
        ActionCategory::Spawn => 7,
        ActionCategory::Evolve => 8,
        ActionCategory::Reload => 9,
        ActionCategory::Extract => 10,
    }
}

/// One match of the game: board, roster, committed orders, and the turn
/// resolution machinery. Owns all mutable match state; transport layers only
/// reach it through order submission and read-only snapshots.
#[derive(Clone, Debug)]
pub struct Game {
    rules: CompiledRules,
    board: Board,
    players: Vec<Player>,
    units: EntityStore<Unit>,
    turn: u32,
    /// Committed orders per player, in submission order.
    committed: Vec<Vec<Order>>,
    pending: Vec<PendingEffect>,
    victory: VictorySettings,
    max_unit_power: i32,
    /// Effect log of the last resolved turn, in execution order.
    effects: Vec<Event>,
    defeated: Vec<DefeatedUnit>,
    result: Option<GameResult>,
}

impl Game {
    /// Set up a match: build the board, resolve win conditions, and place
    /// each faction's initial units on its start tile.
    pub fn new(
        rules: CompiledRules,
        config: MatchConfig,
        faction_keys: &[&str],
    ) -> Result<Self, RulesError> {
        let count = faction_keys.len();
        if !(2..=6).contains(&count) {
            return Err(RulesError::InvalidDefinition(format!(
                "a match needs 2 to 6 players, got {count}"
            )));
        }

        let mut factions = Vec::with_capacity(count);
        for key in faction_keys {
            factions.push(
                rules
                    .faction_id(key)
                    .ok_or_else(|| RulesError::MissingId(key.to_string()))?,
            );
        }

        let mut thresholds = Vec::new();
        for (name, amount) in &config.resource_goals {
            let resource = rules
                .resource_id(name)
                .ok_or_else(|| RulesError::MissingId(name.clone()))?;
            thresholds.push(ResourceThreshold {
                resource,
                amount: *amount,
            });
        }

        let board = Board::new(&config.layout, &rules)?;
        let starts = Board::start_positions(config.layout.radius.max(1), count);

        let mut game = Self {
            rules,
            board,
            players: factions
                .iter()
                .enumerate()
                .map(|(index, faction)| Player {
                    id: PlayerId(index as u8),
                    faction: *faction,
                    resources: BTreeMap::new(),
                })
                .collect(),
            units: EntityStore::default(),
            turn: 1,
            committed: vec![Vec::new(); count],
            pending: Vec::new(),
            victory: VictorySettings {
                elimination: config.elimination,
                thresholds,
            },
            max_unit_power: config.max_unit_power.max(1),
            effects: Vec::new(),
            defeated: Vec::new(),
            result: None,
        };

        for (index, faction) in factions.into_iter().enumerate() {
            let at = starts[index];
            let initial = game.rules.faction(faction).initial_units.clone();
            for type_id in initial {
                game.spawn_unit(PlayerId(index as u8), type_id, at);
            }
        }

        Ok(game)
    }

    pub fn rules(&self) -> &CompiledRules {
        &self.rules
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Living units of a player, in stable id order.
    pub fn units_of(&self, player: PlayerId) -> Vec<UnitId> {
        self.units
            .iter_ordered()
            .filter(|(_, unit)| unit.owner == player)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    // =========================================================================
    // Order intake & validation
    // =========================================================================

    /// Validate and commit one order. Acceptance replaces any previous order
    /// for the same unit; a declared resource cost is debited from the
    /// unit's tile immediately. On failure nothing changes.
    pub fn submit_order(&mut self, player: PlayerId, order: Order) -> Result<(), OrderError> {
        if self.result.is_some() {
            return Err(OrderError::GameOver);
        }
        let player_index = player.0 as usize;
        if player_index >= self.players.len() {
            return Err(OrderError::UnknownPlayer);
        }

        let action = self
            .rules
            .actions
            .get(order.action.raw as usize)
            .ok_or(OrderError::UnknownAction)?;
        let power_cost = action.power_cost;
        let max_range = action.max_range;
        let resource_cost = action.resource_cost.clone();

        let unit_pos = {
            let unit = self.units.get(order.unit).ok_or(OrderError::UnknownUnit)?;
            if unit.owner != player {
                return Err(OrderError::NotYourUnit);
            }
            if !unit.can_use(order.action) {
                return Err(OrderError::MissingCapability);
            }
            if unit.power < power_cost {
                return Err(OrderError::InsufficientPower);
            }
            unit.pos
        };

        if !resource_cost.is_empty() {
            let covered = self.board.get(unit_pos).is_some_and(|tile| {
                resource_cost
                    .iter()
                    .all(|(resource, amount)| tile.storage.get(resource).copied().unwrap_or(0) >= *amount)
            });
            if !covered {
                return Err(OrderError::InsufficientResources);
            }
        }

        if max_range > 0 {
            self.validate_path(unit_pos, max_range, &order.path)?;
        }

        // Accepted: the debit is part of acceptance and is not refunded if
        // the order is later replaced.
        if let Some(tile) = self.board.get_mut(unit_pos) {
            for (resource, amount) in &resource_cost {
                *tile.storage.entry(*resource).or_insert(0) -= amount;
            }
        }

        let bucket = &mut self.committed[player_index];
        if let Some(existing) = bucket.iter_mut().find(|o| o.unit == order.unit) {
            *existing = order;
        } else {
            bucket.push(order);
        }
        Ok(())
    }

    fn validate_path(
        &self,
        origin: Hex,
        max_range: i32,
        path: &[Hex],
    ) -> Result<(), OrderError> {
        if path.len() < 2 {
            return Err(OrderError::MissingPath);
        }
        if path[0] != origin {
            return Err(OrderError::DetachedPath);
        }
        if path.len() as i32 - 1 > max_range {
            return Err(OrderError::PathTooLong);
        }

        for pair in path.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            if from.distance(to) != 1 {
                return Err(OrderError::BrokenPath);
            }
            let src = self.board.get(from).ok_or(OrderError::BrokenPath)?;
            let dst = self.board.get(to).ok_or(OrderError::BrokenPath)?;
            if dst.height > src.height + 1 {
                return Err(OrderError::HeightBlocked);
            }
            if dst.height == src.height + 1 {
                let direction = from.direction_index(to).ok_or(OrderError::BrokenPath)?;
                if !dst.enterable_from(opposite_direction(direction)) {
                    return Err(OrderError::HeightBlocked);
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Readiness gate
    // =========================================================================

    /// The turn is ready once every player has exactly one committed order
    /// per living unit, covering each of their units.
    pub fn is_turn_ready(&self) -> bool {
        if self.result.is_some() {
            return false;
        }
        self.players.iter().all(|player| {
            let units = self.units_of(player.id);
            let orders = &self.committed[player.id.0 as usize];
            if orders.len() != units.len() {
                return false;
            }
            let covered: HashSet<UnitId> = orders.iter().map(|o| o.unit).collect();
            covered.len() == units.len() && units.iter().all(|u| covered.contains(u))
        })
    }

    /// Run the full resolution pipeline and return the broadcast snapshot.
    /// No-op (returns `None`) unless the readiness gate is open.
    pub fn resolve_turn(&mut self) -> Option<Snapshot> {
        if !self.is_turn_ready() {
            return None;
        }
        self.resolve();
        Some(self.snapshot())
    }

    // =========================================================================
    // Resolution pipeline
    // =========================================================================

    fn resolve(&mut self) {
        self.effects.clear();
        self.defeated.clear();

        // Phases 0-1: gather explicit + passive candidates, then prepare them
        // (power re-check and debit, duration/delay scheduling).
        let candidates = self.gather_candidates();
        let mut execution_set: Vec<Effect> = Vec::new();
        for candidate in candidates {
            self.prepare(candidate, &mut execution_set);
        }

        // Phase 2: effects scheduled for this turn join with their cast-time
        // geometry intact.
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].execute_turn == self.turn {
                execution_set.push(self.pending.remove(index).effect);
            } else {
                index += 1;
            }
        }

        // Phase 3: partition by category and execute in the global order.
        let mut buckets: Vec<Vec<Effect>> = (0..CATEGORY_ORDER.len()).map(|_| Vec::new()).collect();
        for effect in execution_set {
            buckets[category_slot(effect.category)].push(effect);
        }

        for slot in 0..CATEGORY_ORDER.len() {
            let batch = std::mem::take(&mut buckets[slot]);
            match CATEGORY_ORDER[slot] {
                ActionCategory::FastMove | ActionCategory::Move | ActionCategory::SlowMove => {
                    for effect in batch {
                        self.execute_movement(effect);
                    }
                }
                ActionCategory::FastAttack
                | ActionCategory::Attack
                | ActionCategory::SlowAttack => {
                    for effect in batch {
                        self.execute_attack(effect);
                    }
                }
                ActionCategory::Stun => {
                    for effect in batch {
                        self.execute_stun(effect);
                    }
                    // Orders of freshly stunned units vanish from every phase
                    // that has not run yet.
                    for later in buckets.iter_mut().skip(slot + 1) {
                        later.retain(|effect| {
                            !self
                                .units
                                .get(effect.unit)
                                .map(|unit| unit.is_disabled(effect.category))
                                .unwrap_or(false)
                        });
                    }
                }
                ActionCategory::Spawn => {
                    for effect in batch {
                        self.execute_spawn(effect);
                    }
                }
                ActionCategory::Evolve => {
                    for effect in batch {
                        self.execute_evolve(effect);
                    }
                }
                ActionCategory::Reload => {
                    for effect in batch {
                        self.execute_reload(effect);
                    }
                }
                ActionCategory::Extract => {
                    for effect in batch {
                        self.execute_extract(effect);
                    }
                }
            }
        }

        // Phases 4-6.
        self.cleanup();
        self.recompute_economy();
        self.board.grow_resources(self.turn, &self.rules);
        self.evaluate_victory();

        for bucket in &mut self.committed {
            bucket.clear();
        }
        self.turn += 1;
    }

    /// Phase 0: explicit orders in submission order, then every living
    /// unit's passive actions, player by player.
    fn gather_candidates(&self) -> Vec<Candidate> {
        let mut out = Vec::new();
        for player in &self.players {
            for order in &self.committed[player.id.0 as usize] {
                out.push(Candidate {
                    unit: order.unit,
                    owner: player.id,
                    action: order.action,
                    path: order.path.clone(),
                    amount: order.amount,
                });
            }
            for (id, unit) in self.units.iter_ordered() {
                if unit.owner != player.id {
                    continue;
                }
                for action in &unit.passive_actions {
                    out.push(Candidate {
                        unit: id,
                        owner: player.id,
                        action: *action,
                        path: Vec::new(),
                        amount: None,
                    });
                }
            }
        }
        out
    }

    /// Phase 1: re-check and debit power, then route the effect to this
    /// turn's execution set or the pending queue.
    fn prepare(&mut self, candidate: Candidate, execution_set: &mut Vec<Effect>) {
        let Some(action) = self.rules.actions.get(candidate.action.raw as usize) else {
            self.skip(candidate.unit, candidate.action, "action definition missing");
            return;
        };
        let category = action.category;
        let power_cost = action.power_cost;
        let duration = action.duration;
        let delay = action.delay;
        let max_power = self.max_unit_power;

        let power = match self.units.get(candidate.unit) {
            Some(unit) => unit.power,
            None => {
                self.skip(candidate.unit, candidate.action, "unit no longer exists");
                return;
            }
        };
        if power < power_cost {
            self.skip(candidate.unit, candidate.action, "not enough power");
            return;
        }
        if let Some(unit) = self.units.get_mut(candidate.unit) {
            unit.power = (power - power_cost).clamp(0, max_power);
        }

        let effect = Effect {
            unit: candidate.unit,
            owner: candidate.owner,
            action: candidate.action,
            category,
            path: candidate.path,
            amount: candidate.amount,
            geometry: None,
        };

        if duration > 0 {
            // Executes now and repeats on each of the next `duration` turns,
            // re-resolving its path coordinates each time.
            for offset in 1..=duration {
                self.pending.push(PendingEffect {
                    execute_turn: self.turn + offset,
                    effect: effect.clone(),
                });
            }
            execution_set.push(effect);
        } else if delay > 0 {
            // Geometry is fixed now, against the board as it stands at cast
            // time, and reused verbatim when the effect lands.
            match self.cast_geometry(&effect) {
                Some(geometry) => self.pending.push(PendingEffect {
                    execute_turn: self.turn + delay,
                    effect: Effect {
                        geometry: Some(geometry),
                        ..effect
                    },
                }),
                None => self.skip(effect.unit, effect.action, "target tile is off the board"),
            }
        } else {
            execution_set.push(effect);
        }
    }

    fn skip(&mut self, unit: UnitId, action: ActionId, reason: &str) {
        self.effects.push(Event::EffectSkipped {
            unit,
            action,
            reason: reason.to_string(),
        });
    }

    /// Resolve an effect's path into (from, target) tiles against the
    /// current board. Empty paths target the actor's own tile.
    fn resolve_target(&self, effect: &Effect) -> Option<(Hex, Hex)> {
        if effect.path.len() < 2 {
            let pos = effect
                .path
                .first()
                .copied()
                .or_else(|| self.units.get(effect.unit).map(|u| u.pos))?;
            return Some((pos, pos));
        }
        for pair in effect.path.windows(2) {
            if pair[0].distance(pair[1]) != 1 || !self.board.contains(pair[1]) {
                return None;
            }
        }
        let target = *effect.path.last()?;
        let from = effect.path[effect.path.len() - 2];
        Some((from, target))
    }

    fn cast_geometry(&self, effect: &Effect) -> Option<Geometry> {
        let (from, target) = self.resolve_target(effect)?;
        let aoe = match &self.rules.action(effect.action).area_of_effect {
            Some(descriptor) => self.aoe_tiles(from, target, descriptor),
            None => Vec::new(),
        };
        Some(Geometry { target, aoe })
    }

    /// Spoke tiles of an area effect. Facing is derived from source to
    /// primary target; each relative offset walks `distance` steps outward
    /// from the target, dropped if any step leaves the board. Self-targeted
    /// effects radiate in all six directions instead.
    fn aoe_tiles(&self, from: Hex, target: Hex, descriptor: &AreaOfEffect) -> Vec<Hex> {
        match from.direction_index(target) {
            None => (0..6)
                .filter_map(|dir| self.walk_spoke(target, dir, descriptor.distance))
                .collect(),
            Some(facing) => descriptor
                .directions
                .iter()
                .filter_map(|offset| {
                    let dir = (facing + *offset as usize) % 6;
                    self.walk_spoke(target, dir, descriptor.distance)
                })
                .collect(),
        }
    }

    fn walk_spoke(&self, origin: Hex, direction: usize, distance: i32) -> Option<Hex> {
        let mut hex = origin;
        for _ in 0..distance.max(1) {
            hex = hex.neighbor(direction);
            if !self.board.contains(hex) {
                return None;
            }
        }
        Some(hex)
    }

    /// Units on `at` the action applies to, per its target filter. The actor
    /// joins unconditionally when the self flag is set and it stands there.
    fn affected_units(
        &self,
        actor: UnitId,
        owner: PlayerId,
        at: Hex,
        filter: TargetFilter,
        affects_self: bool,
    ) -> Vec<UnitId> {
        let Some(tile) = self.board.get(at) else {
            return Vec::new();
        };
        let mut affected: Vec<UnitId> = tile
            .occupants
            .iter()
            .copied()
            .filter(|id| {
                let Some(unit) = self.units.get(*id) else {
                    return false;
                };
                match filter {
                    TargetFilter::Enemies => unit.owner != owner,
                    TargetFilter::Friendly => unit.owner == owner && *id != actor,
                    TargetFilter::All => true,
                    TargetFilter::None => false,
                }
            })
            .collect();
        if affects_self && tile.occupants.contains(&actor) && !affected.contains(&actor) {
            affected.push(actor);
        }
        affected
    }

    fn execute_movement(&mut self, effect: Effect) {
        let moves_resources = self.rules.action(effect.action).moves_resources;
        let Some(start) = self.units.get(effect.unit).map(|u| u.pos) else {
            self.skip(effect.unit, effect.action, "unit no longer exists");
            return;
        };
        if effect.path.len() < 2 {
            self.skip(effect.unit, effect.action, "no movement path");
            return;
        }

        let mut current = start;
        for next in effect.path[1..].to_vec() {
            if !self.board.contains(next) {
                self.skip(effect.unit, effect.action, "tile vanished mid-path");
                break;
            }
            if current.distance(next) != 1 {
                self.skip(effect.unit, effect.action, "path step not adjacent");
                break;
            }

            self.board.remove_occupant(current, effect.unit);
            self.board.add_occupant(next, effect.unit);
            if moves_resources {
                let carried = self
                    .board
                    .get_mut(current)
                    .map(|tile| std::mem::take(&mut tile.storage))
                    .unwrap_or_default();
                if let Some(tile) = self.board.get_mut(next) {
                    for (resource, amount) in carried {
                        *tile.storage.entry(resource).or_insert(0) += amount;
                    }
                }
            }
            if let Some(tile) = self.board.get_mut(next) {
                // Last mover wins the tile.
                tile.owner = Some(effect.owner);
            }
            if let Some(unit) = self.units.get_mut(effect.unit) {
                unit.pos = next;
            }
            self.effects.push(Event::Moved {
                unit: effect.unit,
                action: effect.action,
                from: current,
                to: next,
            });
            current = next;
        }
    }

    fn execute_attack(&mut self, effect: Effect) {
        let action = self.rules.action(effect.action).clone();

        let (target, aoe) = match &effect.geometry {
            Some(geometry) => (geometry.target, geometry.aoe.clone()),
            None => {
                let Some((from, target)) = self.resolve_target(&effect) else {
                    self.skip(effect.unit, effect.action, "target tile is off the board");
                    return;
                };
                let aoe = match &action.area_of_effect {
                    Some(descriptor) => self.aoe_tiles(from, target, descriptor),
                    None => Vec::new(),
                };
                (target, aoe)
            }
        };

        let from = self
            .units
            .get(effect.unit)
            .map(|u| u.pos)
            .unwrap_or(target);
        self.effects.push(Event::Struck {
            unit: effect.unit,
            action: effect.action,
            from,
            target,
            aoe: aoe.clone(),
        });

        for id in self.affected_units(
            effect.unit,
            effect.owner,
            target,
            action.target_filter,
            action.affects_self,
        ) {
            if let Some(unit) = self.units.get_mut(id) {
                unit.strength += action.strength_delta;
            }
        }

        let impact = action
            .area_of_effect
            .as_ref()
            .map(|d| d.impact)
            .unwrap_or(0);
        for hex in aoe {
            for id in self.affected_units(
                effect.unit,
                effect.owner,
                hex,
                action.target_filter,
                action.affects_self,
            ) {
                if let Some(unit) = self.units.get_mut(id) {
                    unit.strength += impact;
                }
            }
        }
    }

    fn execute_stun(&mut self, effect: Effect) {
        let action = self.rules.action(effect.action).clone();
        let Some((_, target)) = self.resolve_target(&effect) else {
            self.skip(effect.unit, effect.action, "target tile is off the board");
            return;
        };

        let affected = self.affected_units(
            effect.unit,
            effect.owner,
            target,
            action.target_filter,
            action.affects_self,
        );
        if affected.is_empty() {
            return;
        }

        for id in &affected {
            if let Some(unit) = self.units.get_mut(*id) {
                for category in &action.disable_categories {
                    unit.disable(*category);
                }
            }
        }
        self.effects.push(Event::Stunned {
            unit: effect.unit,
            action: effect.action,
            target,
            affected,
            disabled: action.disable_categories.clone(),
        });
    }

    fn execute_spawn(&mut self, effect: Effect) {
        let Some(unit_type) = self.rules.action(effect.action).spawn_unit else {
            self.skip(effect.unit, effect.action, "action spawns no unit type");
            return;
        };
        let Some((_, target)) = self.resolve_target(&effect) else {
            self.skip(effect.unit, effect.action, "target tile is off the board");
            return;
        };
        if !self.board.contains(target) {
            self.skip(effect.unit, effect.action, "tile vanished");
            return;
        }

        let id = self.spawn_unit(effect.owner, unit_type, target);
        self.effects.push(Event::Spawned {
            unit: id,
            owner: effect.owner,
            unit_type,
            at: target,
        });
    }

    fn execute_evolve(&mut self, effect: Effect) {
        let Some(into) = self.rules.action(effect.action).evolve_into else {
            self.skip(effect.unit, effect.action, "action has no evolution target");
            return;
        };
        let (active, passive) = {
            let unit_type = self.rules.unit_type(into);
            (
                unit_type.active_actions.clone(),
                unit_type.passive_actions.clone(),
            )
        };

        let Some(unit) = self.units.get_mut(effect.unit) else {
            self.skip(effect.unit, effect.action, "unit no longer exists");
            return;
        };
        let from_type = unit.type_id;
        unit.type_id = into;
        unit.active_actions = active;
        unit.passive_actions = passive;
        // Strength carries over; only the cleanup clamp against the new
        // type's base applies.
        self.effects.push(Event::Evolved {
            unit: effect.unit,
            from_type,
            to_type: into,
        });
    }

    fn execute_reload(&mut self, effect: Effect) {
        let amount = self.rules.action(effect.action).strength_delta;
        let max_power = self.max_unit_power;
        let Some(unit) = self.units.get_mut(effect.unit) else {
            self.skip(effect.unit, effect.action, "unit no longer exists");
            return;
        };
        unit.power = (unit.power + amount).clamp(0, max_power);
        self.effects.push(Event::Reloaded {
            unit: effect.unit,
            action: effect.action,
            amount,
        });
    }

    fn execute_extract(&mut self, effect: Effect) {
        let Some(pos) = self.units.get(effect.unit).map(|u| u.pos) else {
            self.skip(effect.unit, effect.action, "unit no longer exists");
            return;
        };
        let Some(tile_type) = self.board.get(pos).map(|t| t.tile_type) else {
            self.skip(effect.unit, effect.action, "tile vanished");
            return;
        };
        let Some(resource) = self.rules.tile_type(tile_type).resources.first().copied() else {
            self.skip(effect.unit, effect.action, "no resource on this tile");
            return;
        };

        let requested = effect.amount.unwrap_or(1).max(0);
        let Some(tile) = self.board.get_mut(pos) else {
            return;
        };
        let standing = tile.standing.get(&resource).copied().unwrap_or(0);
        let moved = requested.min(standing);
        if moved <= 0 {
            self.skip(effect.unit, effect.action, "nothing left to extract");
            return;
        }
        tile.standing.insert(resource, standing - moved);
        *tile.storage.entry(resource).or_insert(0) += moved;
        self.effects.push(Event::Extracted {
            unit: effect.unit,
            at: pos,
            resource,
            amount: moved,
        });
    }

    // =========================================================================
    // Housekeeping
    // =========================================================================

    /// Phase 4: clamp strength to the type's base, drop defeated units from
    /// roster and occupancy, and settle tile ownership.
    fn cleanup(&mut self) {
        let ids: Vec<UnitId> = self.units.iter_ordered().map(|(id, _)| id).collect();
        let mut casualties = Vec::new();

        for id in ids {
            let Some(unit) = self.units.get(id) else {
                continue;
            };
            let base = self.rules.unit_type(unit.type_id).base_strength;
            let Some(unit) = self.units.get_mut(id) else {
                continue;
            };
            unit.strength = unit.strength.min(base);
            unit.disabled.clear();
            if unit.strength <= 0 {
                casualties.push((id, unit.owner, unit.type_id, unit.pos));
            }
        }

        for (id, owner, unit_type, at) in casualties {
            self.units.remove(id);
            self.board.remove_occupant(at, id);
            let new_owner = self
                .board
                .get(at)
                .and_then(|tile| tile.occupants.first())
                .and_then(|survivor| self.units.get(*survivor))
                .map(|unit| unit.owner);
            if let Some(tile) = self.board.get_mut(at) {
                tile.owner = new_owner;
            }
            self.defeated.push(DefeatedUnit {
                unit: id,
                owner,
                unit_type,
                at,
            });
        }
    }

    /// Phase 5: player totals are recomputed from scratch as the sum of
    /// stored resources on tiles held exclusively by that player's units. A
    /// contested or vacated tile contributes nothing.
    fn recompute_economy(&mut self) {
        let mut totals: Vec<BTreeMap<ResourceId, i64>> =
            vec![BTreeMap::new(); self.players.len()];

        for (_, tile) in self.board.iter() {
            let mut owners = tile
                .occupants
                .iter()
                .filter_map(|id| self.units.get(*id))
                .map(|unit| unit.owner);
            let Some(first) = owners.next() else {
                continue;
            };
            if owners.any(|owner| owner != first) {
                continue;
            }
            let totals = &mut totals[first.0 as usize];
            for (resource, amount) in &tile.storage {
                if *amount > 0 {
                    *totals.entry(*resource).or_insert(0) += amount;
                }
            }
        }

        for (player, total) in self.players.iter_mut().zip(totals) {
            player.resources = total;
        }
    }

    fn evaluate_victory(&mut self) {
        if self.result.is_some() {
            return;
        }

        let mut winners: Vec<(PlayerId, VictoryReason)> = Vec::new();
        for player in &self.players {
            let eliminated_all = self.victory.elimination
                && self.players.iter().all(|other| {
                    other.id == player.id || self.units_of(other.id).is_empty()
                });
            if eliminated_all {
                winners.push((player.id, VictoryReason::Elimination));
                continue;
            }
            let reached_goal = self.victory.thresholds.iter().any(|threshold| {
                player.resources.get(&threshold.resource).copied().unwrap_or(0)
                    >= threshold.amount
            });
            if reached_goal {
                winners.push((player.id, VictoryReason::ResourceThreshold));
            }
        }

        let result = match winners.as_slice() {
            [] => return,
            [(winner, reason)] => GameResult {
                winner: Some(*winner),
                reason: reason.clone(),
                turn: self.turn,
            },
            _ => GameResult {
                winner: None,
                reason: VictoryReason::Draw,
                turn: self.turn,
            },
        };
        self.effects.push(Event::GameEnded {
            winner: result.winner,
        });
        self.result = Some(result);
    }

    fn spawn_unit(&mut self, owner: PlayerId, type_id: UnitTypeId, at: Hex) -> UnitId {
        let unit = Unit::new(type_id, owner, at, &self.rules);
        let id = self.units.insert(unit);
        self.board.add_occupant(at, id);
        id
    }

    // =========================================================================
    // Snapshots & catalog
    // =========================================================================

    pub fn snapshot(&self) -> Snapshot {
        let resource_vec = |map: &BTreeMap<ResourceId, i64>| {
            map.iter()
                .map(|(resource, amount)| ResourceAmount {
                    resource: *resource,
                    amount: *amount,
                })
                .collect::<Vec<_>>()
        };

        Snapshot {
            turn: self.turn,
            board: BoardSnapshot {
                radius: self.board.radius(),
                tiles: self
                    .board
                    .iter()
                    .map(|(pos, tile)| TileSnapshot {
                        pos,
                        tile_type: tile.tile_type,
                        height: tile.height,
                        owner: tile.owner,
                        standing: resource_vec(&tile.standing),
                        storage: resource_vec(&tile.storage),
                        occupants: tile.occupants.clone(),
                        enterable_from: tile.enterable_directions(),
                    })
                    .collect(),
            },
            players: self
                .players
                .iter()
                .map(|player| PlayerSnapshot {
                    id: player.id,
                    faction: player.faction,
                    resources: resource_vec(&player.resources),
                    unit_count: self.units_of(player.id).len() as u32,
                })
                .collect(),
            units: self
                .units
                .iter_ordered()
                .map(|(id, unit)| UnitSnapshot {
                    id,
                    owner: unit.owner,
                    unit_type: unit.type_id,
                    pos: unit.pos,
                    strength: unit.strength,
                    power: unit.power,
                    active_actions: unit.active_actions.clone(),
                    passive_actions: unit.passive_actions.clone(),
                })
                .collect(),
            effects: self.effects.clone(),
            defeated: self.defeated.clone(),
            pending: self
                .pending
                .iter()
                .map(|pending| PendingEffectSnapshot {
                    execute_turn: pending.execute_turn,
                    unit: pending.effect.unit,
                    action: pending.effect.action,
                    target: pending.effect.geometry.as_ref().map(|g| g.target),
                    aoe: pending
                        .effect
                        .geometry
                        .as_ref()
                        .map(|g| g.aoe.clone())
                        .unwrap_or_default(),
                })
                .collect(),
        }
    }

    /// Client-facing view of the loaded catalogs.
    pub fn rules_catalog(&self) -> RulesCatalog {
        RulesCatalog {
            actions: self
                .rules
                .actions
                .iter()
                .enumerate()
                .map(|(raw, action)| CatalogAction {
                    id: ActionId::new(raw as u16),
                    key: action.key.clone(),
                    name: action.name.clone(),
                    category: action.category,
                    min_range: action.min_range,
                    max_range: action.max_range,
                    power_cost: action.power_cost,
                    strength_delta: action.strength_delta,
                    target_filter: action.target_filter,
                    affects_self: action.affects_self,
                    duration: action.duration,
                    delay: action.delay,
                    color: action.color.clone(),
                })
                .collect(),
            unit_types: self
                .rules
                .unit_types
                .iter()
                .enumerate()
                .map(|(raw, unit_type)| CatalogUnitType {
                    id: UnitTypeId::new(raw as u16),
                    key: unit_type.key.clone(),
                    name: unit_type.name.clone(),
                    base_strength: unit_type.base_strength,
                    starting_power: unit_type.starting_power,
                    active_actions: unit_type.active_actions.clone(),
                    passive_actions: unit_type.passive_actions.clone(),
                    color: unit_type.color.clone(),
                })
                .collect(),
            tile_types: self
                .rules
                .tile_types
                .iter()
                .enumerate()
                .map(|(raw, tile_type)| CatalogTileType {
                    id: TileTypeId::new(raw as u16),
                    key: tile_type.key.clone(),
                    resources: tile_type.resources.clone(),
                    color: tile_type.color.clone(),
                })
                .collect(),
            factions: self
                .rules
                .factions
                .iter()
                .enumerate()
                .map(|(raw, faction)| CatalogFaction {
                    id: FactionId::new(raw as u16),
                    key: faction.key.clone(),
                    description: faction.description.clone(),
                    roster: faction.roster.clone(),
                    initial_units: faction.initial_units.clone(),
                    color: faction.color.clone(),
                })
                .collect(),
            resources: self
                .rules
                .resources
                .iter()
                .enumerate()
                .map(|(raw, resource)| CatalogResource {
                    id: ResourceId::new(raw as u16),
                    key: resource.key.clone(),
                })
                .collect(),
        }
    }
}
