pub mod admin;
pub mod game;

pub use admin::{handle_admin_command, AdminCommands};
pub use game::{handle_game_command, GameCommands};

use anyhow::{anyhow, Result};
use comfy_table::{presets::UTF8_FULL, Table};
use stakepool_core::{CallContext, Escrow, Game, SqliteStore, Transfer};
use std::path::Path;

/// An opened escrow plus the identity commands act as.
pub struct Session {
    pub escrow: Escrow<SqliteStore>,
    sender: Option<String>,
}

impl Session {
    pub fn open(db_path: &Path, sender: Option<String>) -> Result<Self> {
        let store = SqliteStore::open(db_path)?;
        let escrow = Escrow::load(store)?;
        Ok(Self { escrow, sender })
    }

    pub fn context(&self) -> Result<CallContext> {
        let sender = self.sender.as_deref().ok_or_else(|| {
            anyhow!("No sender identity; pass --sender or run 'stakepool use <identity>'")
        })?;
        Ok(CallContext::new(sender))
    }
}

pub fn print_transfers(transfers: &[Transfer]) {
    if transfers.is_empty() {
        println!("No transfers.");
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Recipient", "Amount", "Reason"]);
    for transfer in transfers {
        table.add_row(vec![
            transfer.recipient.to_string(),
            transfer.amount.to_string(),
            transfer.reason.to_string(),
        ]);
    }
    println!("{}", table);
}

pub fn print_games(games: &[Game]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "Status", "Players", "Pool", "Deadline"]);
    for game in games {
        table.add_row(vec![
            game.id().to_string(),
            game.status().to_string(),
            format!("{}/{}", game.participant_count(), game.max_participants()),
            game.total_amount().to_string(),
            game.deadline().format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    println!("{}", table);
}
