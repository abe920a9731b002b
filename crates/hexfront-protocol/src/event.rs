use serde::{Deserialize, Serialize};

use crate::{ActionCategory, ActionId, Hex, PlayerId, ResourceId, UnitId, UnitTypeId};

/// Per-turn effect log entries, in execution order. Fully serializable;
/// clients replay these to animate the turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// One hex step of a movement action.
    Moved {
        unit: UnitId,
        action: ActionId,
        from: Hex,
        to: Hex,
    },
    /// An attack landed on `target`, plus any area-of-effect spoke tiles.
    Struck {
        unit: UnitId,
        action: ActionId,
        from: Hex,
        target: Hex,
        #[serde(default)]
        aoe: Vec<Hex>,
    },
    /// Units on `target` had action categories disabled for this turn.
    Stunned {
        unit: UnitId,
        action: ActionId,
        target: Hex,
        affected: Vec<UnitId>,
        disabled: Vec<ActionCategory>,
    },
    Spawned {
        unit: UnitId,
        owner: PlayerId,
        unit_type: UnitTypeId,
        at: Hex,
    },
    Evolved {
        unit: UnitId,
        from_type: UnitTypeId,
        to_type: UnitTypeId,
    },
    Reloaded {
        unit: UnitId,
        action: ActionId,
        amount: i32,
    },
    Extracted {
        unit: UnitId,
        at: Hex,
        resource: ResourceId,
        amount: i64,
    },
    /// An effect could not execute (stale target, vanished tile, dead actor).
    /// The turn continues without it.
    EffectSkipped {
        unit: UnitId,
        action: ActionId,
        reason: String,
    },
    GameEnded {
        winner: Option<PlayerId>,
    },
}
