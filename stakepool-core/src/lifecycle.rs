//! The escrow engine: game lifecycle operations over a [`GameStore`].
//!
//! Every operation runs under one lock. It validates against the current
//! config and game, stages the changes in a [`WriteBatch`], commits the batch,
//! and only then publishes the new config and hands back the transfer
//! instructions. A rejected or failed operation leaves nothing behind.

use crate::accounting::{
    allocate_prizes, compute_split, rounding_residue, validate_distribution,
    validate_fee_percentage,
};
use crate::config::GlobalConfig;
use crate::error::{EscrowError, Result};
use crate::game::Game;
use crate::storage::{GameStore, MemoryStore, WriteBatch};
use crate::types::{Amount, CallContext, GameId, Identity, Transfer, TransferReason};
use chrono::Duration;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Outcome of a normal game close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub game_id: GameId,
    pub fee: Amount,
    pub prize: Amount,
    /// Prize left undistributed by floored shares.
    pub residue: Amount,
    pub transfers: Vec<Transfer>,
}

pub(crate) struct Ledger<S> {
    pub(crate) config: GlobalConfig,
    pub(crate) store: S,
}

impl<S: GameStore> Ledger<S> {
    pub(crate) fn game(&self, game_id: GameId) -> Result<Game> {
        self.store
            .get_game(game_id)?
            .ok_or(EscrowError::NotFound(game_id))
    }

    /// Persists the batch, then adopts its config.
    pub(crate) fn commit(&mut self, batch: WriteBatch) -> Result<()> {
        let config = batch.config.clone();
        self.store.commit(batch)?;
        if let Some(config) = config {
            self.config = config;
        }
        Ok(())
    }
}

pub struct Escrow<S: GameStore> {
    pub(crate) ledger: Mutex<Ledger<S>>,
}

impl Escrow<MemoryStore> {
    pub fn in_memory(owner: Identity) -> Result<Self> {
        Self::initialize(MemoryStore::new(), GlobalConfig::new(owner))
    }
}

impl<S: GameStore> Escrow<S> {
    /// Writes the genesis config into an empty store.
    pub fn initialize(mut store: S, config: GlobalConfig) -> Result<Self> {
        if store.load_config()?.is_some() {
            return Err(EscrowError::config("escrow is already initialized"));
        }
        config.validate()?;

        store.commit(WriteBatch::new().with_config(config.clone()))?;
        tracing::info!("Initialized escrow owned by {}", config.owner());

        Ok(Self {
            ledger: Mutex::new(Ledger { config, store }),
        })
    }

    pub fn load(store: S) -> Result<Self> {
        let config = store
            .load_config()?
            .ok_or_else(|| EscrowError::config("escrow is not initialized"))?;
        config.validate()?;

        Ok(Self {
            ledger: Mutex::new(Ledger { config, store }),
        })
    }

    pub fn config(&self) -> GlobalConfig {
        self.ledger.lock().config.clone()
    }

    pub fn is_privileged(&self, actor: &Identity) -> bool {
        self.ledger.lock().config.access.is_privileged(actor)
    }

    pub fn game(&self, game_id: GameId) -> Result<Game> {
        self.ledger.lock().game(game_id)
    }

    pub fn games(&self) -> Result<Vec<Game>> {
        self.ledger.lock().store.games()
    }

    pub fn create_game(
        &self,
        ctx: &CallContext,
        max_participants: u32,
        deadline_offset: Duration,
    ) -> Result<GameId> {
        let mut ledger = self.ledger.lock();
        ledger
            .config
            .access
            .ensure_privileged(&ctx.sender, "create a game")?;

        let deadline = ctx
            .now
            .checked_add_signed(deadline_offset)
            .ok_or_else(|| EscrowError::invalid_operation("deadline out of range"))?;

        let mut config = ledger.config.clone();
        let game_id = config.game_counter;
        config.game_counter = game_id
            .checked_add(1)
            .ok_or_else(|| EscrowError::internal("game counter exhausted"))?;

        let game = Game::new(game_id, max_participants, deadline);
        ledger.commit(WriteBatch::new().with_config(config).with_game(game))?;

        tracing::info!(
            "Game {} created by {}: max {} participants, deadline {}",
            game_id,
            ctx.sender,
            max_participants,
            deadline
        );
        Ok(game_id)
    }

    /// Returns the refund of a superseded stake when the sender re-joins.
    pub fn join_game(
        &self,
        ctx: &CallContext,
        game_id: GameId,
        amount: Amount,
    ) -> Result<Vec<Transfer>> {
        let mut ledger = self.ledger.lock();
        let mut game = ledger.game(game_id)?;

        let previous = game.join(ctx.sender.clone(), amount, ctx.now)?;
        let started = game.is_started();
        ledger.commit(WriteBatch::new().with_game(game))?;

        tracing::info!("{} joined game {} with {}", ctx.sender, game_id, amount);
        if started {
            tracing::info!("Game {} is full and has started", game_id);
        }

        let transfers = match previous {
            Some(old) => {
                tracing::info!(
                    "{} replaced stake {} in game {}",
                    ctx.sender,
                    old,
                    game_id
                );
                vec![Transfer {
                    recipient: ctx.sender.clone(),
                    amount: old,
                    reason: TransferReason::Refund { game_id },
                }]
            }
            None => Vec::new(),
        };
        Ok(transfers)
    }

    pub fn start_game(&self, ctx: &CallContext, game_id: GameId) -> Result<()> {
        let mut ledger = self.ledger.lock();
        ledger
            .config
            .access
            .ensure_privileged(&ctx.sender, "start the game")?;

        let mut game = ledger.game(game_id)?;
        game.start();
        ledger.commit(WriteBatch::new().with_game(game))?;

        tracing::info!("Game {} started by {}", game_id, ctx.sender);
        Ok(())
    }

    /// Splits the pool into the protocol fee and one prize per winner, in
    /// winner order. Winners are not required to be participants.
    pub fn end_game(
        &self,
        ctx: &CallContext,
        game_id: GameId,
        winners: &[Identity],
    ) -> Result<Settlement> {
        let mut ledger = self.ledger.lock();
        ledger
            .config
            .access
            .ensure_privileged(&ctx.sender, "end the game")?;

        let mut game = ledger.game(game_id)?;
        game.ensure_endable()?;

        let mut config = ledger.config.clone();
        if winners.len() != config.num_winners {
            return Err(EscrowError::invalid_operation(format!(
                "expected {} winners, got {}",
                config.num_winners,
                winners.len()
            )));
        }

        let (fee, prize) = compute_split(game.total_amount(), config.fee_percentage);
        let shares = allocate_prizes(prize, &config.winner_distribution);
        let residue = rounding_residue(prize, &shares);
        config.total_fee = config.total_fee.add_or_overflow(fee)?;

        let transfers: Vec<Transfer> = winners
            .iter()
            .zip(shares)
            .enumerate()
            .map(|(rank, (winner, amount))| Transfer {
                recipient: winner.clone(),
                amount,
                reason: TransferReason::Prize { game_id, rank },
            })
            .collect();

        game.close();
        ledger.commit(WriteBatch::new().with_config(config).with_game(game))?;

        tracing::info!(
            "Game {} ended: fee {}, prize {} to {} winners",
            game_id,
            fee,
            prize,
            winners.len()
        );
        if residue > Amount::ZERO {
            tracing::warn!("Game {} left {} undistributed after rounding", game_id, residue);
        }

        Ok(Settlement {
            game_id,
            fee,
            prize,
            residue,
            transfers,
        })
    }

    /// Refunds every participant's recorded deposit. Works whether or not
    /// the game has started.
    pub fn cancel_game(&self, ctx: &CallContext, game_id: GameId) -> Result<Vec<Transfer>> {
        let mut ledger = self.ledger.lock();
        ledger
            .config
            .access
            .ensure_privileged(&ctx.sender, "cancel the game")?;

        let mut game = ledger.game(game_id)?;
        game.ensure_cancellable()?;

        let refunds = game.refunds();
        let refunded = game.total_amount();
        game.close();
        ledger.commit(WriteBatch::new().with_game(game))?;

        tracing::info!(
            "Game {} cancelled by {}: refunded {} to {} participants",
            game_id,
            ctx.sender,
            refunded,
            refunds.len()
        );
        Ok(refunds)
    }

    pub fn set_max_participants(
        &self,
        ctx: &CallContext,
        game_id: GameId,
        max_participants: u32,
    ) -> Result<()> {
        let mut ledger = self.ledger.lock();
        ledger
            .config
            .access
            .ensure_privileged(&ctx.sender, "set the max participants")?;

        let mut game = ledger.game(game_id)?;
        game.set_max_participants(max_participants)?;
        ledger.commit(WriteBatch::new().with_game(game))?;

        tracing::info!(
            "Game {} max participants set to {}",
            game_id,
            max_participants
        );
        Ok(())
    }

    /// Applies to every game closed from now on, including open ones.
    pub fn set_winner_distribution(&self, ctx: &CallContext, table: Vec<u8>) -> Result<()> {
        let mut ledger = self.ledger.lock();
        ledger
            .config
            .access
            .ensure_privileged(&ctx.sender, "set the winner distribution")?;
        validate_distribution(&table, ledger.config.num_winners)?;

        let mut config = ledger.config.clone();
        config.winner_distribution = table;
        ledger.commit(WriteBatch::new().with_config(config))?;

        tracing::info!(
            "Winner distribution set to {:?}",
            ledger.config.winner_distribution
        );
        Ok(())
    }

    pub fn set_fee_percentage(&self, ctx: &CallContext, fee_percentage: u8) -> Result<()> {
        let mut ledger = self.ledger.lock();
        ledger
            .config
            .access
            .ensure_privileged(&ctx.sender, "set the fee percentage")?;
        validate_fee_percentage(fee_percentage)?;

        let mut config = ledger.config.clone();
        config.fee_percentage = fee_percentage;
        ledger.commit(WriteBatch::new().with_config(config))?;

        tracing::info!("Fee percentage set to {}%", fee_percentage);
        Ok(())
    }

    pub fn add_admin(&self, ctx: &CallContext, admin: Identity) -> Result<()> {
        let mut ledger = self.ledger.lock();
        let mut config = ledger.config.clone();
        config.access.add_admin(&ctx.sender, admin.clone())?;
        ledger.commit(WriteBatch::new().with_config(config))?;

        tracing::info!("Admin {} added", admin);
        Ok(())
    }

    pub fn remove_admin(&self, ctx: &CallContext, admin: &Identity) -> Result<()> {
        let mut ledger = self.ledger.lock();
        let mut config = ledger.config.clone();
        config.access.remove_admin(&ctx.sender, admin)?;
        ledger.commit(WriteBatch::new().with_config(config))?;

        tracing::info!("Admin {} removed", admin);
        Ok(())
    }

    pub fn transfer_ownership(&self, ctx: &CallContext, new_owner: Identity) -> Result<()> {
        let mut ledger = self.ledger.lock();
        let mut config = ledger.config.clone();
        config
            .access
            .transfer_ownership(&ctx.sender, new_owner.clone())?;
        ledger.commit(WriteBatch::new().with_config(config))?;

        tracing::info!("Ownership transferred from {} to {}", ctx.sender, new_owner);
        Ok(())
    }

    /// Pays the accrued protocol fee to the owner. Nothing is emitted when no
    /// fee has accrued.
    pub fn withdraw_fees(&self, ctx: &CallContext) -> Result<Vec<Transfer>> {
        let mut ledger = self.ledger.lock();
        ledger
            .config
            .access
            .ensure_owner(&ctx.sender, "withdraw fees")?;

        let amount = ledger.config.total_fee;
        if amount == Amount::ZERO {
            tracing::debug!("No fees to withdraw");
            return Ok(Vec::new());
        }

        let mut config = ledger.config.clone();
        config.total_fee = Amount::ZERO;
        let recipient = config.owner().clone();
        ledger.commit(WriteBatch::new().with_config(config))?;

        tracing::info!("Withdrew {} in fees to {}", amount, recipient);
        Ok(vec![Transfer {
            recipient,
            amount,
            reason: TransferReason::FeeWithdrawal,
        }])
    }
}
