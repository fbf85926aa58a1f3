//! Stakepool - pooled-stake game escrow
//!
//! Administrators open games, participants deposit a stake to join, and on
//! close the pool is split between a protocol fee and a fixed number of
//! winners. Value movements are never executed here: operations return
//! [`Transfer`] instructions for the host ledger, committed together with the
//! state change that produced them.

pub mod access;
pub mod accounting;
pub mod config;
pub mod error;
pub mod game;
pub mod lifecycle;
pub mod storage;
pub mod sweeper;
pub mod types;

pub use access::AccessControl;
pub use config::{GlobalConfig, SweepPolicy};
pub use error::{EscrowError, Result};
pub use game::{Game, GameStatus};
pub use lifecycle::{Escrow, Settlement};
pub use storage::{GameStore, MemoryStore, SqliteStore, WriteBatch};
pub use types::{Amount, CallContext, GameId, Identity, Transfer, TransferReason};
