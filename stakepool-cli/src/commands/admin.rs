use super::{print_transfers, Session};
use anyhow::Result;
use clap::Subcommand;
use stakepool_core::Identity;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Grant admin rights (owner)
    AddAdmin {
        /// Identity to promote
        identity: String,
    },
    /// Revoke admin rights (owner)
    RemoveAdmin {
        /// Identity to demote
        identity: String,
    },
    /// Hand ownership to another identity (owner)
    TransferOwnership {
        /// New owner
        identity: String,
    },
    /// Replace the winner percentage table (admin)
    SetDistribution {
        /// Percentages in prize order, summing to 100
        #[arg(required = true, value_delimiter = ',')]
        percentages: Vec<u8>,
    },
    /// Set the protocol fee percentage (admin)
    SetFee {
        /// Fee percentage, 0-100
        percentage: u8,
    },
    /// Pay accrued protocol fees to the owner (owner)
    WithdrawFees,
    /// Show escrow-wide settings
    Config,
}

pub fn handle_admin_command(cmd: AdminCommands, session: &Session) -> Result<()> {
    let escrow = &session.escrow;

    match cmd {
        AdminCommands::AddAdmin { identity } => {
            escrow.add_admin(&session.context()?, Identity::from(identity.clone()))?;
            println!("Added admin '{}'", identity);
        }

        AdminCommands::RemoveAdmin { identity } => {
            escrow.remove_admin(&session.context()?, &Identity::from(identity.clone()))?;
            println!("Removed admin '{}'", identity);
        }

        AdminCommands::TransferOwnership { identity } => {
            escrow.transfer_ownership(&session.context()?, Identity::from(identity.clone()))?;
            println!("Ownership transferred to '{}'", identity);
        }

        AdminCommands::SetDistribution { percentages } => {
            escrow.set_winner_distribution(&session.context()?, percentages.clone())?;
            println!("Winner distribution set to {:?}", percentages);
        }

        AdminCommands::SetFee { percentage } => {
            escrow.set_fee_percentage(&session.context()?, percentage)?;
            println!("Fee percentage set to {}%", percentage);
        }

        AdminCommands::WithdrawFees => {
            let transfers = escrow.withdraw_fees(&session.context()?)?;
            if transfers.is_empty() {
                println!("No fees accrued.");
            } else {
                print_transfers(&transfers);
            }
        }

        AdminCommands::Config => {
            let config = escrow.config();

            println!("Escrow configuration:");
            println!("  Owner: {}", config.owner());
            let admins: Vec<String> = config.access.admins().map(|a| a.to_string()).collect();
            println!("  Admins: {}", admins.join(", "));
            println!("  Fee: {}%", config.fee_percentage);
            println!("  Winners: {}", config.num_winners);
            println!("  Distribution: {:?}", config.winner_distribution);
            println!("  Accrued fees: {}", config.total_fee);
            println!("  Games created: {}", config.game_counter);
            println!("  Deadline checks: {:?}", config.sweep_policy);
        }
    }

    Ok(())
}
