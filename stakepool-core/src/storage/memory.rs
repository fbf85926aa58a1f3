use crate::config::GlobalConfig;
use crate::error::Result;
use crate::game::Game;
use crate::storage::{GameStore, WriteBatch};
use crate::types::GameId;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct MemoryStore {
    config: Option<GlobalConfig>,
    games: BTreeMap<GameId, Game>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for MemoryStore {
    fn load_config(&self) -> Result<Option<GlobalConfig>> {
        Ok(self.config.clone())
    }

    fn get_game(&self, id: GameId) -> Result<Option<Game>> {
        Ok(self.games.get(&id).cloned())
    }

    fn game_ids(&self) -> Result<Vec<GameId>> {
        Ok(self.games.keys().copied().collect())
    }

    fn games(&self) -> Result<Vec<Game>> {
        Ok(self.games.values().cloned().collect())
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<()> {
        if let Some(config) = batch.config {
            self.config = Some(config);
        }
        for game in batch.games {
            self.games.insert(game.id(), game);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Identity;
    use chrono::Utc;

    #[test]
    fn test_commit_and_lookup() {
        let mut store = MemoryStore::new();
        assert!(store.load_config().unwrap().is_none());

        let batch = WriteBatch::new()
            .with_config(GlobalConfig::new(Identity::new("owner")))
            .with_game(Game::new(1, 3, Utc::now()))
            .with_game(Game::new(0, 2, Utc::now()));
        store.commit(batch).unwrap();

        assert!(store.load_config().unwrap().is_some());
        assert_eq!(store.game_ids().unwrap(), vec![0, 1]);
        assert_eq!(store.get_game(1).unwrap().unwrap().max_participants(), 3);
        assert!(store.get_game(7).unwrap().is_none());
    }
}
