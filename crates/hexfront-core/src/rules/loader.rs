use std::collections::{BTreeMap, BTreeSet, HashMap};

use hexfront_protocol::{ActionId, FactionId, ResourceId, TileTypeId, UnitTypeId};
use serde::Deserialize;
use thiserror::Error;

use crate::rules::{CompiledRules, Resource};

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("missing referenced id: {0}")]
    MissingId(String),
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub enum RulesSource<'a> {
    Embedded,
    Path(String),
    Bytes {
        actions: &'a [u8],
        units: &'a [u8],
        tiles: &'a [u8],
        factions: &'a [u8],
    },
}

#[derive(Debug, Deserialize)]
struct RawRules {
    actions: BTreeMap<String, crate::rules::RawAction>,
    units: BTreeMap<String, crate::rules::RawUnitType>,
    tiles: BTreeMap<String, crate::rules::RawTileType>,
    factions: BTreeMap<String, crate::rules::RawFaction>,
}

pub fn load_rules(source: RulesSource<'_>) -> Result<CompiledRules, RulesError> {
    let raw: RawRules = match source {
        RulesSource::Embedded => {
            let actions_yaml = include_str!("../../data/base/actions.yaml");
            let units_yaml = include_str!("../../data/base/units.yaml");
            let tiles_yaml = include_str!("../../data/base/tiles.yaml");
            let factions_yaml = include_str!("../../data/base/factions.yaml");
            parse_raw_rules(actions_yaml, units_yaml, tiles_yaml, factions_yaml)?
        }
        RulesSource::Path(path) => {
            let actions_yaml = std::fs::read_to_string(format!("{path}/actions.yaml"))?;
            let units_yaml = std::fs::read_to_string(format!("{path}/units.yaml"))?;
            let tiles_yaml = std::fs::read_to_string(format!("{path}/tiles.yaml"))?;
            let factions_yaml = std::fs::read_to_string(format!("{path}/factions.yaml"))?;
            parse_raw_rules(&actions_yaml, &units_yaml, &tiles_yaml, &factions_yaml)?
        }
        RulesSource::Bytes {
            actions,
            units,
            tiles,
            factions,
        } => parse_raw_rules(
            std::str::from_utf8(actions)?,
            std::str::from_utf8(units)?,
            std::str::from_utf8(tiles)?,
            std::str::from_utf8(factions)?,
        )?,
    };

    compile_rules(raw)
}

fn parse_raw_rules(
    actions_yaml: &str,
    units_yaml: &str,
    tiles_yaml: &str,
    factions_yaml: &str,
) -> Result<RawRules, RulesError> {
    Ok(RawRules {
        actions: serde_yaml::from_str(actions_yaml)?,
        units: serde_yaml::from_str(units_yaml)?,
        tiles: serde_yaml::from_str(tiles_yaml)?,
        factions: serde_yaml::from_str(factions_yaml)?,
    })
}

fn compile_rules(raw: RawRules) -> Result<CompiledRules, RulesError> {
    let action_ids = raw
        .actions
        .keys()
        .enumerate()
        .map(|(i, k)| (k.clone(), ActionId::new(i as u16)))
        .collect::<HashMap<_, _>>();
    let unit_type_ids = raw
        .units
        .keys()
        .enumerate()
        .map(|(i, k)| (k.clone(), UnitTypeId::new(i as u16)))
        .collect::<HashMap<_, _>>();
    let tile_type_ids = raw
        .tiles
        .keys()
        .enumerate()
        .map(|(i, k)| (k.clone(), TileTypeId::new(i as u16)))
        .collect::<HashMap<_, _>>();
    let faction_ids = raw
        .factions
        .keys()
        .enumerate()
        .map(|(i, k)| (k.clone(), FactionId::new(i as u16)))
        .collect::<HashMap<_, _>>();

    // Resources are interned from every name the catalogs mention, in sorted
    // order so id assignment is deterministic.
    let resource_names: BTreeSet<String> = raw
        .tiles
        .values()
        .flat_map(|t| t.resources.iter().cloned())
        .chain(
            raw.actions
                .values()
                .flat_map(|a| a.resource_cost.keys().cloned()),
        )
        .collect();
    let resource_ids = resource_names
        .iter()
        .enumerate()
        .map(|(i, k)| (k.clone(), ResourceId::new(i as u16)))
        .collect::<HashMap<_, _>>();
    let resources = resource_names
        .into_iter()
        .map(|key| Resource { key })
        .collect::<Vec<_>>();

    let actions = raw
        .actions
        .into_iter()
        .map(|(key, a)| a.compile(&key, &unit_type_ids, &resource_ids))
        .collect::<Result<Vec<_>, _>>()?;
    let unit_types = raw
        .units
        .into_iter()
        .map(|(key, u)| u.compile(&key, &action_ids))
        .collect::<Result<Vec<_>, _>>()?;
    let tile_types = raw
        .tiles
        .into_iter()
        .map(|(key, t)| t.compile(&key, &resource_ids))
        .collect::<Result<Vec<_>, _>>()?;
    let factions = raw
        .factions
        .into_iter()
        .map(|(key, f)| f.compile(&key, &unit_type_ids))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompiledRules {
        actions,
        unit_types,
        tile_types,
        factions,
        resources,
        action_ids,
        unit_type_ids,
        tile_type_ids,
        faction_ids,
        resource_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexfront_protocol::ActionCategory;

    #[test]
    fn embedded_rules_compile() {
        let rules = load_rules(RulesSource::Embedded).expect("embedded rules load");
        assert!(!rules.actions.is_empty());
        assert!(!rules.unit_types.is_empty());
        assert!(rules.factions.len() >= 2);

        // Every unit action reference resolved to a live entry.
        for unit_type in &rules.unit_types {
            for action in unit_type
                .active_actions
                .iter()
                .chain(unit_type.passive_actions.iter())
            {
                assert!((action.raw as usize) < rules.actions.len());
            }
        }
    }

    #[test]
    fn spawn_actions_carry_their_unit_type() {
        let rules = load_rules(RulesSource::Embedded).unwrap();
        for action in &rules.actions {
            if action.category == ActionCategory::Spawn {
                assert!(action.spawn_unit.is_some(), "action {}", action.key);
            }
        }
    }

    #[test]
    fn mortar_is_delayed_with_area_effect() {
        let rules = load_rules(RulesSource::Embedded).unwrap();
        let mortar = rules.action(rules.action_id("attack_mortar").unwrap());
        assert_eq!(mortar.delay, 1);
        let aoe = mortar.area_of_effect.as_ref().unwrap();
        assert_eq!(aoe.directions, vec![3]);
        assert_eq!(aoe.distance, 1);
    }

    #[test]
    fn unknown_action_reference_is_rejected() {
        let result = load_rules(RulesSource::Bytes {
            actions: b"wait:\n  name: Wait\n  category: reload\n",
            units: b"ghost:\n  name: Ghost\n  strength: 75\n  actions: [does_not_exist]\n",
            tiles: b"default:\n  color: '#e0e0e0'\n",
            factions: b"solo:\n  color: '#fff'\n  initial_units: [ghost]\n",
        });
        assert!(matches!(result, Err(RulesError::MissingId(id)) if id == "does_not_exist"));
    }
}
