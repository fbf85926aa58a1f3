use super::{print_games, print_transfers, Session};
use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use stakepool_core::{Amount, GameId, Identity};

#[derive(Subcommand)]
pub enum GameCommands {
    /// Open a new game (admin)
    Create {
        /// Maximum number of participants
        max_participants: u32,
        /// Seconds from now until the join deadline
        deadline_secs: u64,
    },
    /// Join a game with a stake
    Join {
        /// Game ID
        game_id: GameId,
        /// Stake in base units
        amount: u64,
    },
    /// Start a game regardless of fill (admin)
    Start {
        /// Game ID
        game_id: GameId,
    },
    /// End a started game and pay the winners (admin)
    End {
        /// Game ID
        game_id: GameId,
        /// Winners, in prize order
        #[arg(required = true)]
        winners: Vec<String>,
    },
    /// Cancel a game and refund every participant (admin)
    Cancel {
        /// Game ID
        game_id: GameId,
    },
    /// Change capacity of a game that has not started (admin)
    SetMax {
        /// Game ID
        game_id: GameId,
        /// New maximum number of participants
        max_participants: u32,
    },
    /// Start every open game past its deadline
    CheckDeadlines,
    /// Show a single game
    Status {
        /// Game ID
        game_id: GameId,
    },
    /// List all games
    List,
}

pub fn handle_game_command(cmd: GameCommands, session: &Session) -> Result<()> {
    let escrow = &session.escrow;

    match cmd {
        GameCommands::Create {
            max_participants,
            deadline_secs,
        } => {
            let offset = i64::try_from(deadline_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .ok_or_else(|| anyhow!("Deadline offset out of range: {}", deadline_secs))?;
            let game_id = escrow.create_game(&session.context()?, max_participants, offset)?;

            println!("Created game {}", game_id);
            println!("Max participants: {}", max_participants);
            println!("Deadline: {}", escrow.game(game_id)?.deadline());
        }

        GameCommands::Join { game_id, amount } => {
            let ctx = session.context()?;
            let refunds = escrow.join_game(&ctx, game_id, Amount::from_units(amount))?;
            let game = escrow.game(game_id)?;

            println!("{} joined game {} with {}", ctx.sender, game_id, amount);
            println!(
                "Players: {}/{}  Pool: {}",
                game.participant_count(),
                game.max_participants(),
                game.total_amount()
            );
            if game.is_started() {
                println!("Game is full and has started.");
            }
            if !refunds.is_empty() {
                println!("Previous stake replaced:");
                print_transfers(&refunds);
            }
        }

        GameCommands::Start { game_id } => {
            escrow.start_game(&session.context()?, game_id)?;
            println!("Game {} started", game_id);
        }

        GameCommands::End { game_id, winners } => {
            let winners: Vec<Identity> = winners.into_iter().map(Identity::from).collect();
            let settlement = escrow.end_game(&session.context()?, game_id, &winners)?;

            println!("Game {} ended", game_id);
            println!("Protocol fee: {}", settlement.fee);
            println!("Prize pool: {}", settlement.prize);
            if settlement.residue > Amount::ZERO {
                println!("Rounding residue kept in escrow: {}", settlement.residue);
            }
            print_transfers(&settlement.transfers);
        }

        GameCommands::Cancel { game_id } => {
            let refunds = escrow.cancel_game(&session.context()?, game_id)?;
            println!("Game {} cancelled", game_id);
            print_transfers(&refunds);
        }

        GameCommands::SetMax {
            game_id,
            max_participants,
        } => {
            escrow.set_max_participants(&session.context()?, game_id, max_participants)?;
            println!(
                "Game {} max participants set to {}",
                game_id, max_participants
            );
        }

        GameCommands::CheckDeadlines => {
            let started = escrow.check_deadlines(&session.context()?)?;
            if started.is_empty() {
                println!("No games past their deadline.");
            } else {
                println!("Started {} game(s): {:?}", started.len(), started);
            }
        }

        GameCommands::Status { game_id } => {
            let game = escrow.game(game_id)?;

            println!("Game {}:", game.id());
            println!("  Status: {}", game.status());
            println!(
                "  Players: {}/{}",
                game.participant_count(),
                game.max_participants()
            );
            println!("  Pool: {}", game.total_amount());
            println!("  Deadline: {}", game.deadline());
            let now = Utc::now();
            if game.can_join(now) {
                println!("  Accepting joins");
            } else if !game.is_started() && !game.is_ended() && game.is_expired(now) {
                println!("  Deadline passed; will start on next deadline check");
            }

            if game.participant_count() > 0 {
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec!["Participant", "Stake"]);
                for (participant, amount) in game.participants() {
                    table.add_row(vec![participant.to_string(), amount.to_string()]);
                }
                println!("{}", table);
            }
        }

        GameCommands::List => {
            let games = escrow.games()?;
            if games.is_empty() {
                println!("No games yet.");
            } else {
                print_games(&games);
            }
        }
    }

    Ok(())
}
