mod commands;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AdminCommands, GameCommands, Session};
use config::CliConfig;
use stakepool_core::config::DEFAULT_WINNER_DISTRIBUTION;
use stakepool_core::{Escrow, EscrowError, GlobalConfig, Identity, SqliteStore, SweepPolicy};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DB_FILE: &str = "stakepool.db";

#[derive(Parser)]
#[command(name = "stakepool")]
#[command(about = "Stakepool - pooled-stake game escrow")]
#[command(version)]
struct Cli {
    /// Data directory for escrow storage
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Identity to act as (overrides the stored default)
    #[arg(short, long, global = true)]
    sender: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the escrow with its owner and payout settings
    Init {
        /// Owner identity
        #[arg(long)]
        owner: String,
        /// Protocol fee percentage
        #[arg(long, default_value_t = stakepool_core::config::DEFAULT_FEE_PERCENTAGE)]
        fee: u8,
        /// Winner percentages, comma separated; fixes the number of winners
        #[arg(long, value_delimiter = ',')]
        distribution: Option<Vec<u8>>,
        /// Only admins may trigger deadline checks
        #[arg(long)]
        restrict_sweeper: bool,
    },
    /// Store the default sender identity
    Use {
        /// Identity to act as
        identity: String,
    },

    #[command(flatten)]
    Game(GameCommands),

    #[command(flatten)]
    Admin(AdminCommands),
}

fn init_escrow(
    db_path: &Path,
    owner: String,
    fee: u8,
    distribution: Option<Vec<u8>>,
    restrict_sweeper: bool,
) -> anyhow::Result<()> {
    let distribution = distribution.unwrap_or_else(|| DEFAULT_WINNER_DISTRIBUTION.to_vec());
    let policy = if restrict_sweeper {
        SweepPolicy::PrivilegedOnly
    } else {
        SweepPolicy::Open
    };
    let config =
        GlobalConfig::with_payout(Identity::from(owner), fee, distribution)?.with_sweep_policy(policy);

    let store = SqliteStore::open(db_path)?;
    let escrow = Escrow::initialize(store, config)?;
    let config = escrow.config();

    println!("Initialized escrow at {}", db_path.display());
    println!("Owner: {}", config.owner());
    println!("Fee: {}%", config.fee_percentage);
    println!("Distribution: {:?}", config.winner_distribution);
    Ok(())
}

fn run(cli: Cli, data_dir: &Path, mut cli_config: CliConfig) -> anyhow::Result<()> {
    let db_path = data_dir.join(DB_FILE);
    let sender = cli.sender.or_else(|| cli_config.default_sender.clone());

    match cli.command {
        Commands::Init {
            owner,
            fee,
            distribution,
            restrict_sweeper,
        } => init_escrow(&db_path, owner, fee, distribution, restrict_sweeper),
        Commands::Use { identity } => {
            cli_config.default_sender = Some(identity.clone());
            cli_config.save(data_dir)?;
            println!("Now acting as '{}'", identity);
            Ok(())
        }
        Commands::Game(cmd) => {
            let session = Session::open(&db_path, sender)?;
            commands::handle_game_command(cmd, &session)
        }
        Commands::Admin(cmd) => {
            let session = Session::open(&db_path, sender)?;
            commands::handle_admin_command(cmd, &session)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Get data directory
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(CliConfig::default_data_dir);

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    let cli_config = CliConfig::load(&data_dir)?;

    // Initialize logging
    let log_level = if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "stakepool={},stakepool_core={}",
            log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(cli, &data_dir, cli_config) {
        match e.downcast_ref::<EscrowError>() {
            Some(EscrowError::Unauthorized(msg)) => {
                eprintln!("Error: Unauthorized: {}", msg);
                eprintln!("Use --sender to act as a different identity");
            }
            Some(EscrowError::NotFound(game_id)) => {
                eprintln!("Error: Game {} not found", game_id);
                eprintln!("Use 'stakepool list' to see available games");
            }
            Some(EscrowError::Config(msg)) => {
                eprintln!("Error: {}", msg);
                eprintln!("Use 'stakepool init --owner <identity>' to create the escrow");
            }
            Some(err) if err.is_rejection() => {
                eprintln!("Rejected: {}", err);
            }
            _ => {
                eprintln!("Error: {:#}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
