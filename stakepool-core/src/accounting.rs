//! Fee and prize arithmetic. All functions are pure.
//!
//! Shares are floored, and the rounding remainder of `allocate_prizes` is not
//! redistributed: it stays in the escrow as residue.

use crate::error::{EscrowError, Result};
use crate::types::Amount;

pub const MAX_FEE_PERCENTAGE: u8 = 100;

/// Returns `(fee, prize)` with `fee = floor(total * fee_pct / 100)`.
/// Percentages above 100 are clamped, so the fee never exceeds `total`.
pub fn compute_split(total: Amount, fee_pct: u8) -> (Amount, Amount) {
    let fee = total.percent(fee_pct.min(MAX_FEE_PERCENTAGE));
    (fee, total - fee)
}

pub fn validate_fee_percentage(fee_pct: u8) -> Result<()> {
    if fee_pct > MAX_FEE_PERCENTAGE {
        return Err(EscrowError::invalid_operation(
            "fee percentage must be less than or equal to 100",
        ));
    }
    Ok(())
}

pub fn validate_distribution(table: &[u8], num_winners: usize) -> Result<()> {
    if table.len() != num_winners {
        return Err(EscrowError::invalid_distribution(format!(
            "expected {} entries, got {}",
            num_winners,
            table.len()
        )));
    }

    let sum: u32 = table.iter().map(|&p| p as u32).sum();
    if sum != 100 {
        return Err(EscrowError::invalid_distribution(format!(
            "percentages sum to {}, expected 100",
            sum
        )));
    }

    Ok(())
}

/// One floored share per table entry, in table order.
pub fn allocate_prizes(prize: Amount, table: &[u8]) -> Vec<Amount> {
    table.iter().map(|&p| prize.percent(p)).collect()
}

/// What `allocate_prizes` leaves behind.
pub fn rounding_residue(prize: Amount, shares: &[Amount]) -> Amount {
    let paid: Amount = shares.iter().copied().sum();
    prize.checked_sub(paid).unwrap_or(Amount::ZERO)
}
