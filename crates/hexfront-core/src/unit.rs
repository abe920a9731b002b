use hexfront_protocol::{ActionCategory, ActionId, Hex, PlayerId, UnitTypeId};

use crate::rules::CompiledRules;

#[derive(Clone, Debug)]
pub struct Unit {
    pub type_id: UnitTypeId,
    pub owner: PlayerId,
    pub pos: Hex,
    pub strength: i32,
    pub power: i32,
    /// Copied from the unit type at spawn and replaced on evolve.
    pub active_actions: Vec<ActionId>,
    pub passive_actions: Vec<ActionId>,
    /// Categories stunned out for the current resolution; cleared at cleanup.
    pub disabled: Vec<ActionCategory>,
}

impl Unit {
    pub fn new(type_id: UnitTypeId, owner: PlayerId, pos: Hex, rules: &CompiledRules) -> Self {
        let utype = rules.unit_type(type_id);
        Self {
            type_id,
            owner,
            pos,
            strength: utype.base_strength,
            power: utype.starting_power,
            active_actions: utype.active_actions.clone(),
            passive_actions: utype.passive_actions.clone(),
            disabled: Vec::new(),
        }
    }

    pub fn can_use(&self, action: ActionId) -> bool {
        self.active_actions.contains(&action)
    }

    pub fn is_disabled(&self, category: ActionCategory) -> bool {
        self.disabled.contains(&category)
    }

    pub fn disable(&mut self, category: ActionCategory) {
        if !self.disabled.contains(&category) {
            self.disabled.push(category);
        }
    }
}
