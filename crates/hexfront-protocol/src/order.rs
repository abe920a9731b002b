use serde::{Deserialize, Serialize};

use crate::{ActionId, Hex, UnitId};

/// A single client-submitted order: one action for one unit.
///
/// `path` starts at the unit's current tile and walks hex-by-hex to the
/// target; it is empty for self-targeted actions. At most one order per unit
/// is live at a time — resubmitting replaces the previous one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub unit: UnitId,
    pub action: ActionId,
    #[serde(default)]
    pub path: Vec<Hex>,
    /// Requested amount for extraction orders; defaults to 1.
    #[serde(default)]
    pub amount: Option<i64>,
}

impl Order {
    pub fn new(unit: UnitId, action: ActionId) -> Self {
        Self {
            unit,
            action,
            path: Vec::new(),
            amount: None,
        }
    }

    pub fn with_path(unit: UnitId, action: ActionId, path: Vec<Hex>) -> Self {
        Self {
            unit,
            action,
            path,
            amount: None,
        }
    }
}
