//! Static game content: actions, unit types, tile types, and factions,
//! loaded once from YAML and compiled into id-indexed tables.

mod loader;
mod types;

pub use loader::{load_rules, RulesError, RulesSource};
pub use types::*;
