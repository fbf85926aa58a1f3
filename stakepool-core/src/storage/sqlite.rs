use crate::config::GlobalConfig;
use crate::error::{EscrowError, Result};
use crate::game::Game;
use crate::storage::{GameStore, WriteBatch};
use crate::types::{Amount, GameId, Identity};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

const GAME_COLUMNS: &str =
    "id, participants, total_amount, started, ended, max_participants, deadline";

/// SQLite-backed store. Each `commit` is one transaction.
pub struct SqliteStore {
    conn: Connection,
}

/// Raw column values of a `games` row.
struct GameRow {
    id: i64,
    participants: String,
    total_amount: i64,
    started: bool,
    ended: bool,
    max_participants: u32,
    deadline: String,
}

impl GameRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            participants: row.get(1)?,
            total_amount: row.get(2)?,
            started: row.get(3)?,
            ended: row.get(4)?,
            max_participants: row.get(5)?,
            deadline: row.get(6)?,
        })
    }

    fn into_game(self) -> Result<Game> {
        let participants: BTreeMap<Identity, Amount> = serde_json::from_str(&self.participants)?;
        let deadline = DateTime::parse_from_rfc3339(&self.deadline)
            .map_err(|e| {
                EscrowError::internal(format!("Invalid deadline for game {}: {}", self.id, e))
            })?
            .with_timezone(&Utc);

        let game = Game::from_parts(
            self.id as GameId,
            participants,
            Amount::from_units(self.total_amount as u64),
            self.started,
            self.ended,
            self.max_participants,
            deadline,
        );

        if !game.is_balanced() {
            return Err(EscrowError::internal(format!(
                "Corrupted game {}: total does not match deposits",
                game.id()
            )));
        }

        Ok(game)
    }
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        // Single-row config table
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS escrow_config (
                id INTEGER PRIMARY KEY CHECK (id = 0),
                data TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        // Games table
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY,
                participants TEXT NOT NULL,
                total_amount INTEGER NOT NULL,
                started INTEGER NOT NULL,
                ended INTEGER NOT NULL,
                max_participants INTEGER NOT NULL,
                deadline TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }
}

impl GameStore for SqliteStore {
    fn load_config(&self) -> Result<Option<GlobalConfig>> {
        let data: Option<String> = self
            .conn
            .query_row("SELECT data FROM escrow_config WHERE id = 0", [], |row| {
                row.get(0)
            })
            .optional()?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn get_game(&self, id: GameId) -> Result<Option<Game>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM games WHERE id = ?1", GAME_COLUMNS),
                params![id as i64],
                GameRow::from_row,
            )
            .optional()?;

        row.map(GameRow::into_game).transpose()
    }

    fn game_ids(&self) -> Result<Vec<GameId>> {
        let mut stmt = self.conn.prepare("SELECT id FROM games ORDER BY id ASC")?;
        let id_iter = stmt.query_map([], |row| row.get::<_, i64>(0))?;

        let mut ids = Vec::new();
        for id in id_iter {
            ids.push(id? as GameId);
        }
        Ok(ids)
    }

    fn games(&self) -> Result<Vec<Game>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM games ORDER BY id ASC", GAME_COLUMNS))?;
        let row_iter = stmt.query_map([], GameRow::from_row)?;

        let mut games = Vec::new();
        for row in row_iter {
            games.push(row?.into_game()?);
        }
        Ok(games)
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let now = Utc::now().timestamp();
        let tx = self.conn.transaction()?;

        if let Some(config) = &batch.config {
            tx.execute(
                "INSERT OR REPLACE INTO escrow_config (id, data, updated_at) VALUES (0, ?1, ?2)",
                params![serde_json::to_string(config)?, now],
            )?;
        }

        for game in &batch.games {
            tx.execute(
                "INSERT OR REPLACE INTO games
                 (id, participants, total_amount, started, ended, max_participants, deadline, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    game.id() as i64,
                    serde_json::to_string(game.participants())?,
                    game.total_amount().to_units() as i64,
                    game.is_started(),
                    game.is_ended(),
                    game.max_participants(),
                    game.deadline().to_rfc3339_opts(SecondsFormat::Nanos, true),
                    now,
                ],
            )?;
        }

        tx.commit()?;
        tracing::debug!(
            "Committed batch: config={}, games={}",
            batch.config.is_some(),
            batch.games.len()
        );
        Ok(())
    }
}
