//! Server-authoritative match session.
//!
//! The transport layer owns connections and framing; the authoritative
//! simulation lives in `hexfront_core::Game`. This module wraps the engine
//! behind a mutex so concurrent submissions serialize into atomic,
//! individually validated mutations: acceptance, the readiness check, and a
//! possible synchronous resolution form one critical section, and two
//! resolutions can never overlap.

use std::sync::{Mutex, MutexGuard};

use hexfront_core::{CompiledRules, Game, RulesError};
use hexfront_protocol::{GameResult, Order, PlayerId, RulesCatalog, Snapshot};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("player count {got} outside the allowed {min}..={max}")]
    PlayerCount { got: usize, min: u8, max: u8 },
    #[error(transparent)]
    Rules(#[from] RulesError),
}

/// Consumer of resolved-turn snapshots and the game-over signal. Transport
/// implementations live outside this crate.
pub trait Broadcaster: Send {
    fn turn_resolved(&mut self, snapshot: &Snapshot);
    fn game_over(&mut self, result: &GameResult);
}

/// Discards everything; for headless simulations and tests.
pub struct NullBroadcaster;

impl Broadcaster for NullBroadcaster {
    fn turn_resolved(&mut self, _snapshot: &Snapshot) {}
    fn game_over(&mut self, _result: &GameResult) {}
}

/// What happened to a submitted order.
#[derive(Debug)]
pub enum SubmitOutcome {
    Accepted {
        /// True when this submission closed the readiness gate and the turn
        /// resolved synchronously before returning.
        turn_resolved: bool,
    },
    Rejected {
        reason: String,
    },
}

struct Inner {
    game: Game,
    broadcaster: Box<dyn Broadcaster>,
}

/// One running match behind a mutex.
pub struct MatchSession {
    inner: Mutex<Inner>,
}

impl MatchSession {
    /// Validate the roster against the server limits and set up the match.
    pub fn start(
        rules: CompiledRules,
        config: &ServerConfig,
        faction_keys: &[&str],
        broadcaster: Box<dyn Broadcaster>,
    ) -> Result<Self, SessionError> {
        if !config.allows_player_count(faction_keys.len()) {
            return Err(SessionError::PlayerCount {
                got: faction_keys.len(),
                min: config.min_players,
                max: config.max_players,
            });
        }
        let game = Game::new(rules, config.game.clone(), faction_keys)?;
        info!(
            players = faction_keys.len(),
            radius = config.game.layout.radius,
            "match started"
        );
        Ok(Self {
            inner: Mutex::new(Inner { game, broadcaster }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Validate and commit one order. If the submission closes the readiness
    /// gate, the turn resolves before this call returns and the broadcaster
    /// receives the snapshot.
    pub fn submit_order(&self, player: PlayerId, order: Order) -> SubmitOutcome {
        let mut inner = self.lock();
        match inner.game.submit_order(player, order) {
            Ok(()) => {
                debug!(player = player.0, "order accepted");
                let turn_resolved = Self::resolve_if_ready(&mut inner);
                SubmitOutcome::Accepted { turn_resolved }
            }
            Err(err) => {
                warn!(player = player.0, error = %err, "order rejected");
                SubmitOutcome::Rejected {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Resolve the turn if the gate is open; no-op otherwise. Returns
    /// whether a turn resolved.
    pub fn resolve_turn(&self) -> bool {
        let mut inner = self.lock();
        Self::resolve_if_ready(&mut inner)
    }

    fn resolve_if_ready(inner: &mut Inner) -> bool {
        let Some(snapshot) = inner.game.resolve_turn() else {
            return false;
        };
        info!(
            turn = snapshot.turn,
            effects = snapshot.effects.len(),
            defeated = snapshot.defeated.len(),
            "turn resolved"
        );
        inner.broadcaster.turn_resolved(&snapshot);
        if let Some(result) = inner.game.result() {
            info!(winner = ?result.winner, "game over");
            inner.broadcaster.game_over(result);
        }
        true
    }

    pub fn is_turn_ready(&self) -> bool {
        self.lock().game.is_turn_ready()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.lock().game.snapshot()
    }

    pub fn catalog(&self) -> RulesCatalog {
        self.lock().game.rules_catalog()
    }

    pub fn result(&self) -> Option<GameResult> {
        self.lock().game.result().cloned()
    }
}
