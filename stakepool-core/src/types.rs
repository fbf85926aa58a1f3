use crate::error::{EscrowError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

pub type GameId = u64;

/// Opaque account identity as supplied by the host (the "current sender").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Identity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Native value in indivisible base units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_units(units: u64) -> Self {
        Self(units)
    }

    pub const fn to_units(self) -> u64 {
        self.0
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    /// `floor(self * pct / 100)`, computed without intermediate overflow.
    pub fn percent(self, pct: u8) -> Amount {
        Amount((self.0 as u128 * pct as u128 / 100) as u64)
    }

    pub(crate) fn add_or_overflow(self, rhs: Amount) -> Result<Amount> {
        self.checked_add(rhs)
            .ok_or_else(|| EscrowError::invalid_operation("amount overflow"))
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host-supplied context of a single invocation.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub sender: Identity,
    pub now: DateTime<Utc>,
}

impl CallContext {
    pub fn new(sender: impl Into<Identity>) -> Self {
        Self::at(sender, Utc::now())
    }

    pub fn at(sender: impl Into<Identity>, now: DateTime<Utc>) -> Self {
        Self {
            sender: sender.into(),
            now,
        }
    }
}

/// Value-transfer instruction for the host ledger, emitted together with the
/// state change that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub recipient: Identity,
    pub amount: Amount,
    pub reason: TransferReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferReason {
    /// `rank` is the zero-based position in the winner list.
    Prize { game_id: GameId, rank: usize },
    Refund { game_id: GameId },
    FeeWithdrawal,
}

impl fmt::Display for TransferReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferReason::Prize { game_id, rank } => {
                write!(f, "prize #{} (game {})", rank + 1, game_id)
            }
            TransferReason::Refund { game_id } => write!(f, "refund (game {})", game_id),
            TransferReason::FeeWithdrawal => f.write_str("fee withdrawal"),
        }
    }
}

pub fn total_transferred(transfers: &[Transfer]) -> Amount {
    transfers.iter().map(|t| t.amount).sum()
}
