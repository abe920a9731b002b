use std::collections::{BTreeMap, HashMap};

use hexfront_protocol::{Hex, PlayerId, ResourceId, TileTypeId, UnitId};
use serde::{Deserialize, Serialize};

use crate::rules::{CompiledRules, RulesError};

#[derive(Clone, Debug)]
pub struct Tile {
    pub tile_type: TileTypeId,
    pub height: i32,
    pub owner: Option<PlayerId>,
    /// Resources still in the ground, available for extraction.
    pub standing: BTreeMap<ResourceId, i64>,
    /// Extracted resources stored on the tile.
    pub storage: BTreeMap<ResourceId, i64>,
    /// Units on this tile, in arrival order.
    pub occupants: Vec<UnitId>,
    /// Bitmask of directions (0..5) from which this tile can be entered uphill.
    enterable_from: u8,
}

impl Tile {
    fn new(tile_type: TileTypeId, height: i32) -> Self {
        Self {
            tile_type,
            height,
            owner: None,
            standing: BTreeMap::new(),
            storage: BTreeMap::new(),
            occupants: Vec::new(),
            enterable_from: 0,
        }
    }

    #[inline]
    pub fn enterable_from(&self, direction: usize) -> bool {
        self.enterable_from & (1 << (direction % 6)) != 0
    }

    pub fn enterable_directions(&self) -> Vec<u8> {
        (0..6u8).filter(|d| self.enterable_from(*d as usize)).collect()
    }

    pub fn remove_occupant(&mut self, unit: UnitId) {
        self.occupants.retain(|u| *u != unit);
    }
}

/// Declarative placement of a non-default tile at a fixed coordinate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TilePlacement {
    pub at: Hex,
    pub tile_type: String,
    #[serde(default)]
    pub height: i32,
    /// Initial standing quantities, by resource name.
    #[serde(default)]
    pub standing: BTreeMap<String, i64>,
}

/// Board construction recipe: a radial hex field plus fixed placements.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoardLayout {
    /// Tiles cover every (q, r) with |q|, |r|, |q + r| all < radius.
    pub radius: i32,
    pub placements: Vec<TilePlacement>,
}

impl BoardLayout {
    /// The standard skirmish map: gold at the center and a ring of six
    /// smaller deposits two tiles out.
    pub fn skirmish(radius: i32) -> Self {
        let gold = |q: i32, r: i32, amount: i64| TilePlacement {
            at: Hex { q, r },
            tile_type: "gold".to_string(),
            height: 0,
            standing: BTreeMap::from([("gold".to_string(), amount)]),
        };
        Self {
            radius,
            placements: vec![
                gold(0, 0, 10),
                gold(-2, 2, 10),
                gold(-2, 0, 5),
                gold(0, -2, 5),
                gold(2, -2, 5),
                gold(2, 0, 5),
                gold(0, 2, 5),
            ],
        }
    }
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self::skirmish(4)
    }
}

/// The tile field. Tiles live in a Vec in deterministic coordinate order,
/// with a hex → index map for lookup.
#[derive(Clone, Debug)]
pub struct Board {
    radius: i32,
    index: HashMap<Hex, usize>,
    coords: Vec<Hex>,
    tiles: Vec<Tile>,
}

impl Board {
    pub fn new(layout: &BoardLayout, rules: &CompiledRules) -> Result<Self, RulesError> {
        let radius = layout.radius.max(1);
        let default_type = rules
            .tile_type_id("default")
            .ok_or_else(|| RulesError::MissingId("default".to_string()))?;

        let center = Hex { q: 0, r: 0 };
        let coords: Vec<Hex> = center.ring_inclusive(radius - 1).collect();
        let index: HashMap<Hex, usize> =
            coords.iter().enumerate().map(|(i, h)| (*h, i)).collect();
        let mut tiles: Vec<Tile> = coords.iter().map(|_| Tile::new(default_type, 0)).collect();

        for placement in &layout.placements {
            let slot = index.get(&placement.at).ok_or_else(|| {
                RulesError::InvalidDefinition(format!(
                    "tile placement at ({}, {}) is off the board",
                    placement.at.q, placement.at.r
                ))
            })?;
            let tile_type = rules
                .tile_type_id(&placement.tile_type)
                .ok_or_else(|| RulesError::MissingId(placement.tile_type.clone()))?;

            let tile = &mut tiles[*slot];
            tile.tile_type = tile_type;
            tile.height = placement.height;
            for (name, amount) in &placement.standing {
                let resource = rules
                    .resource_id(name)
                    .ok_or_else(|| RulesError::MissingId(name.clone()))?;
                tile.standing.insert(resource, *amount);
            }
        }

        let mut board = Self {
            radius,
            index,
            coords,
            tiles,
        };
        board.compute_enterable_directions();
        Ok(board)
    }

    /// Tile T is enterable from direction d iff the neighbor in direction d
    /// sits exactly one level below T. Recomputed once after construction;
    /// heights never change afterwards.
    fn compute_enterable_directions(&mut self) {
        let mut masks = vec![0u8; self.tiles.len()];
        for (i, hex) in self.coords.iter().enumerate() {
            let height = self.tiles[i].height;
            for dir in 0..6 {
                if let Some(neighbor) = self.get(hex.neighbor(dir)) {
                    if neighbor.height == height - 1 {
                        masks[i] |= 1 << dir;
                    }
                }
            }
        }
        for (tile, mask) in self.tiles.iter_mut().zip(masks) {
            tile.enterable_from = mask;
        }
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn contains(&self, hex: Hex) -> bool {
        self.index.contains_key(&hex)
    }

    pub fn get(&self, hex: Hex) -> Option<&Tile> {
        self.index.get(&hex).map(|i| &self.tiles[*i])
    }

    pub fn get_mut(&mut self, hex: Hex) -> Option<&mut Tile> {
        let i = *self.index.get(&hex)?;
        Some(&mut self.tiles[i])
    }

    /// Tiles in deterministic coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = (Hex, &Tile)> {
        self.coords.iter().copied().zip(self.tiles.iter())
    }

    pub fn add_occupant(&mut self, hex: Hex, unit: UnitId) {
        if let Some(tile) = self.get_mut(hex) {
            tile.occupants.push(unit);
        }
    }

    pub fn remove_occupant(&mut self, hex: Hex, unit: UnitId) {
        if let Some(tile) = self.get_mut(hex) {
            tile.remove_occupant(unit);
        }
    }

    /// Regrow standing quantities on tiles whose type declares a growth
    /// frequency: +1 per resource whenever `turn % frequency == 0`, capped.
    pub fn grow_resources(&mut self, turn: u32, rules: &CompiledRules) {
        for tile in &mut self.tiles {
            let tile_type = rules.tile_type(tile.tile_type);
            let Some(growth) = tile_type.growth else {
                continue;
            };
            if turn % growth.frequency != 0 {
                continue;
            }
            for resource in &tile_type.resources {
                let quantity = tile.standing.entry(*resource).or_insert(0);
                if *quantity < growth.cap {
                    *quantity += 1;
                }
            }
        }
    }

    /// Start positions for `players` factions, spread around the rim.
    pub fn start_positions(radius: i32, players: usize) -> Vec<Hex> {
        let e = radius - 1;
        let hex = |q, r| Hex { q, r };
        match players {
            2 => vec![hex(0, -e), hex(0, e)],
            3 => vec![hex(0, -e), hex(-e, e), hex(e, 0)],
            4 => vec![hex(-1, -e + 1), hex(-e, e - 1), hex(1, e - 1), hex(e, -e + 1)],
            5 => vec![
                hex(0, -e),
                hex(-e, 1),
                hex(-e / 2, e),
                hex(e / 2, e / 2),
                hex(e, -e + 1),
            ],
            6 => vec![
                hex(0, -e),
                hex(-e, 0),
                hex(-e, e),
                hex(0, e),
                hex(e, 0),
                hex(e, -e),
            ],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{load_rules, RulesSource};

    fn rules() -> CompiledRules {
        load_rules(RulesSource::Embedded).expect("rules load")
    }

    #[test]
    fn radial_board_has_expected_tile_count() {
        let rules = rules();
        let board = Board::new(&BoardLayout::skirmish(3), &rules).unwrap();
        // 1 + 3 * 2 * 3 hexes within distance 2 of the center.
        assert_eq!(board.iter().count(), 19);
        assert!(board.contains(Hex { q: 2, r: 0 }));
        assert!(!board.contains(Hex { q: 3, r: 0 }));
    }

    #[test]
    fn placements_assign_types_and_standing_quantities() {
        let rules = rules();
        let board = Board::new(&BoardLayout::skirmish(4), &rules).unwrap();
        let gold = rules.resource_id("gold").unwrap();

        let center = board.get(Hex { q: 0, r: 0 }).unwrap();
        assert_eq!(center.tile_type, rules.tile_type_id("gold").unwrap());
        assert_eq!(center.standing.get(&gold), Some(&10));

        let plain = board.get(Hex { q: 1, r: 0 }).unwrap();
        assert_eq!(plain.tile_type, rules.tile_type_id("default").unwrap());
    }

    #[test]
    fn enterable_directions_follow_height_steps() {
        let rules = rules();
        let mut layout = BoardLayout::skirmish(3);
        layout.placements.push(TilePlacement {
            at: Hex { q: 1, r: 0 },
            tile_type: "default".to_string(),
            height: 1,
            standing: BTreeMap::new(),
        });
        let board = Board::new(&layout, &rules).unwrap();

        let raised = board.get(Hex { q: 1, r: 0 }).unwrap();
        // Every neighbor sits one level below the raised tile.
        assert_eq!(raised.enterable_directions(), vec![0, 1, 2, 3, 4, 5]);

        let flat = board.get(Hex { q: 0, r: 0 }).unwrap();
        assert!(flat.enterable_directions().is_empty());
    }

    #[test]
    fn growth_caps_standing_quantities() {
        let rules = rules();
        let mut board = Board::new(&BoardLayout::skirmish(4), &rules).unwrap();
        let gold = rules.resource_id("gold").unwrap();
        let center = Hex { q: 0, r: 0 };

        board.grow_resources(5, &rules);
        assert_eq!(board.get(center).unwrap().standing.get(&gold), Some(&11));

        // Off-frequency turns change nothing.
        board.grow_resources(6, &rules);
        assert_eq!(board.get(center).unwrap().standing.get(&gold), Some(&11));

        for turn in (10..=200).step_by(5) {
            board.grow_resources(turn, &rules);
        }
        assert_eq!(board.get(center).unwrap().standing.get(&gold), Some(&20));
    }

    #[test]
    fn start_positions_sit_on_the_board() {
        let rules = rules();
        for players in 2..=6 {
            let board = Board::new(&BoardLayout::skirmish(4), &rules).unwrap();
            let positions = Board::start_positions(4, players);
            assert_eq!(positions.len(), players);
            assert!(positions.iter().all(|p| board.contains(*p)));
        }
    }
}
