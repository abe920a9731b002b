//! Server configuration

use hexfront_core::MatchConfig;
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Minimum players to start (2-6)
    pub min_players: u8,
    /// Maximum players allowed (2-6)
    pub max_players: u8,
    /// Match settings (board layout, power cap, win conditions)
    pub game: MatchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 6,
            game: MatchConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn allows_player_count(&self, count: usize) -> bool {
        count >= self.min_players as usize && count <= self.max_players as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_player_bounds() {
        let config = ServerConfig::default();
        assert!(!config.allows_player_count(1));
        assert!(config.allows_player_count(2));
        assert!(config.allows_player_count(6));
        assert!(!config.allows_player_count(7));
    }
}
