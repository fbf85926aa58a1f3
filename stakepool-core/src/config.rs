use crate::access::AccessControl;
use crate::accounting::{validate_distribution, validate_fee_percentage};
use crate::error::{EscrowError, Result};
use crate::types::{Amount, GameId, Identity};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FEE_PERCENTAGE: u8 = 2;
pub const DEFAULT_NUM_WINNERS: usize = 3;
pub const DEFAULT_WINNER_DISTRIBUTION: [u8; DEFAULT_NUM_WINNERS] = [50, 30, 20];

/// Who may trigger a deadline sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepPolicy {
    #[default]
    Open,
    PrivilegedOnly,
}

/// Escrow-wide settings and balances shared by every game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub fee_percentage: u8,
    /// Fixed at genesis.
    pub num_winners: usize,
    pub winner_distribution: Vec<u8>,
    pub access: AccessControl,
    pub total_fee: Amount,
    pub game_counter: GameId,
    #[serde(default)]
    pub sweep_policy: SweepPolicy,
}

impl GlobalConfig {
    pub fn new(owner: Identity) -> Self {
        Self {
            fee_percentage: DEFAULT_FEE_PERCENTAGE,
            num_winners: DEFAULT_NUM_WINNERS,
            winner_distribution: DEFAULT_WINNER_DISTRIBUTION.to_vec(),
            access: AccessControl::new(owner),
            total_fee: Amount::ZERO,
            game_counter: 0,
            sweep_policy: SweepPolicy::default(),
        }
    }

    /// Genesis config with a custom payout table; the table length becomes
    /// the permanent number of winners.
    pub fn with_payout(owner: Identity, fee_percentage: u8, distribution: Vec<u8>) -> Result<Self> {
        let config = Self {
            fee_percentage,
            num_winners: distribution.len(),
            winner_distribution: distribution,
            ..Self::new(owner)
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_sweep_policy(mut self, policy: SweepPolicy) -> Self {
        self.sweep_policy = policy;
        self
    }

    pub fn owner(&self) -> &Identity {
        self.access.owner()
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_winners == 0 {
            return Err(EscrowError::config("number of winners must be greater than 0"));
        }

        validate_fee_percentage(self.fee_percentage)?;
        validate_distribution(&self.winner_distribution, self.num_winners)?;

        if !self.access.is_consistent() {
            return Err(EscrowError::config("owner must be an admin"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GlobalConfig::new(Identity::new("owner"));
        assert!(config.validate().is_ok());
        assert_eq!(config.fee_percentage, 2);
        assert_eq!(config.winner_distribution, vec![50, 30, 20]);
        assert_eq!(config.sweep_policy, SweepPolicy::Open);
    }

    #[test]
    fn test_with_payout() {
        let config = GlobalConfig::with_payout(Identity::new("owner"), 10, vec![70, 30]).unwrap();
        assert_eq!(config.num_winners, 2);

        let result = GlobalConfig::with_payout(Identity::new("owner"), 10, vec![]);
        assert!(matches!(result, Err(EscrowError::Config(_))));

        let result = GlobalConfig::with_payout(Identity::new("owner"), 10, vec![70, 20]);
        assert!(matches!(result, Err(EscrowError::InvalidDistribution(_))));

        let result = GlobalConfig::with_payout(Identity::new("owner"), 101, vec![100]);
        assert!(matches!(result, Err(EscrowError::InvalidOperation(_))));
    }

    #[test]
    fn test_serde_defaults_sweep_policy() {
        let config = GlobalConfig::new(Identity::new("owner"));
        let mut value = serde_json::to_value(&config).unwrap();
        value.as_object_mut().unwrap().remove("sweep_policy");

        let restored: GlobalConfig = serde_json::from_value(value).unwrap();
        assert_eq!(restored, config);
    }
}
