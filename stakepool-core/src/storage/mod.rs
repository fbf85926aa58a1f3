pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::GlobalConfig;
use crate::error::Result;
use crate::game::Game;
use crate::types::GameId;

/// Changes produced by one escrow operation, applied all-or-nothing.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub config: Option<GlobalConfig>,
    pub games: Vec<Game>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: GlobalConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_game(mut self, game: Game) -> Self {
        self.games.push(game);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.config.is_none() && self.games.is_empty()
    }
}

/// Keyed game records plus the escrow-wide config.
///
/// Callers serialize access; implementations need no internal locking but
/// must make `commit` atomic.
pub trait GameStore {
    fn load_config(&self) -> Result<Option<GlobalConfig>>;

    fn get_game(&self, id: GameId) -> Result<Option<Game>>;

    /// Ascending.
    fn game_ids(&self) -> Result<Vec<GameId>>;

    /// Every stored game, ascending by id.
    fn games(&self) -> Result<Vec<Game>> {
        let mut games = Vec::new();
        for id in self.game_ids()? {
            if let Some(game) = self.get_game(id)? {
                games.push(game);
            }
        }
        Ok(games)
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<()>;
}
