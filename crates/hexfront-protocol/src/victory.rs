//! Win conditions and game results.

use serde::{Deserialize, Serialize};

use crate::{PlayerId, ResourceId};

/// Win conditions evaluated after every resolved turn.
///
/// Elimination and resource thresholds can be combined; any satisfied
/// condition ends the game.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VictorySettings {
    /// Win when every opponent has zero units.
    pub elimination: bool,
    /// Win when an accumulated resource total reaches a threshold.
    #[serde(default)]
    pub thresholds: Vec<ResourceThreshold>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ResourceThreshold {
    pub resource: ResourceId,
    pub amount: i64,
}

/// How the game ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VictoryReason {
    Elimination,
    ResourceThreshold,
    /// Several players satisfied a condition on the same turn.
    Draw,
}

/// Result of a completed game. `winner` is `None` for a draw.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameResult {
    pub winner: Option<PlayerId>,
    pub reason: VictoryReason,
    pub turn: u32,
}
