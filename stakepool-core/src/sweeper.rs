//! Deadline sweep: forces every open game past its deadline into the started
//! state so it can be ended without an explicit `start_game`.

use crate::config::SweepPolicy;
use crate::error::Result;
use crate::game::Game;
use crate::lifecycle::Escrow;
use crate::storage::{GameStore, WriteBatch};
use crate::types::{CallContext, GameId};
use chrono::{DateTime, Utc};

/// Starts every not-yet-started game whose deadline is before `now` and
/// returns the flipped games. Linear scan, no deadline index.
pub fn sweep_expired(games: Vec<Game>, now: DateTime<Utc>) -> Vec<Game> {
    games
        .into_iter()
        .filter_map(|mut game| game.start_if_expired(now).then_some(game))
        .collect()
}

impl<S: GameStore> Escrow<S> {
    /// Idempotent: a second sweep at the same time flips nothing.
    pub fn check_deadlines(&self, ctx: &CallContext) -> Result<Vec<GameId>> {
        let mut ledger = self.ledger.lock();
        if ledger.config.sweep_policy == SweepPolicy::PrivilegedOnly {
            ledger
                .config
                .access
                .ensure_privileged(&ctx.sender, "check deadlines")?;
        }

        let flipped = sweep_expired(ledger.store.games()?, ctx.now);
        if flipped.is_empty() {
            tracing::debug!("Deadline sweep found no expired games");
            return Ok(Vec::new());
        }

        let ids: Vec<GameId> = flipped.iter().map(Game::id).collect();
        ledger.commit(WriteBatch {
            config: None,
            games: flipped,
        })?;

        tracing::info!("Deadline sweep started {} games: {:?}", ids.len(), ids);
        Ok(ids)
    }
}
