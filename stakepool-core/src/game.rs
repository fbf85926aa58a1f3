use crate::error::{EscrowError, Result};
use crate::types::{Amount, GameId, Identity, Transfer, TransferReason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle position derived from the `started`/`ended` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Open,
    Started,
    Closed,
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GameStatus::Open => "open",
            GameStatus::Started => "started",
            GameStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// One pooled round. Closed games are kept as history and never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    id: GameId,
    participants: BTreeMap<Identity, Amount>,
    total_amount: Amount,
    started: bool,
    ended: bool,
    max_participants: u32,
    deadline: DateTime<Utc>,
}

impl Game {
    pub fn new(id: GameId, max_participants: u32, deadline: DateTime<Utc>) -> Self {
        Self {
            id,
            participants: BTreeMap::new(),
            total_amount: Amount::ZERO,
            started: false,
            ended: false,
            max_participants,
            deadline,
        }
    }

    pub(crate) fn from_parts(
        id: GameId,
        participants: BTreeMap<Identity, Amount>,
        total_amount: Amount,
        started: bool,
        ended: bool,
        max_participants: u32,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            participants,
            total_amount,
            started,
            ended,
            max_participants,
            deadline,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn participants(&self) -> &BTreeMap<Identity, Amount> {
        &self.participants
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn total_amount(&self) -> Amount {
        self.total_amount
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn max_participants(&self) -> u32 {
        self.max_participants
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn status(&self) -> GameStatus {
        if self.ended {
            GameStatus::Closed
        } else if self.started {
            GameStatus::Started
        } else {
            GameStatus::Open
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() as u64 >= self.max_participants as u64
    }

    /// `total_amount` equals the sum of all recorded deposits.
    pub fn is_balanced(&self) -> bool {
        let sum = self
            .participants
            .values()
            .try_fold(Amount::ZERO, |acc, &a| acc.checked_add(a));
        sum == Some(self.total_amount)
    }

    pub fn can_join(&self, now: DateTime<Utc>) -> bool {
        !self.started && !self.ended && !self.is_expired(now) && !self.is_full()
    }

    /// Records `participant`'s stake. A repeated join replaces the earlier
    /// stake, which is returned so the caller can refund it. Reaching
    /// `max_participants` starts the game.
    pub fn join(
        &mut self,
        participant: Identity,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<Option<Amount>> {
        if self.started {
            return Err(EscrowError::invalid_state("game already started"));
        }
        if self.ended {
            return Err(EscrowError::invalid_state("game already ended"));
        }
        if self.is_expired(now) {
            return Err(EscrowError::Expired);
        }
        if self.is_full() {
            return Err(EscrowError::Full);
        }

        let previous = self.participants.get(&participant).copied();
        let total = match previous {
            Some(old) => (self.total_amount - old).add_or_overflow(amount)?,
            None => self.total_amount.add_or_overflow(amount)?,
        };

        self.participants.insert(participant, amount);
        self.total_amount = total;

        if self.participants.len() as u64 == self.max_participants as u64 {
            self.started = true;
        }

        Ok(previous)
    }

    /// Unconditional; an ended game stays ended.
    pub fn start(&mut self) {
        self.started = true;
    }

    /// Starts an open game whose deadline has passed. Returns whether the
    /// game was flipped.
    pub fn start_if_expired(&mut self, now: DateTime<Utc>) -> bool {
        if !self.started && self.is_expired(now) {
            self.started = true;
            return true;
        }
        false
    }

    pub fn set_max_participants(&mut self, max_participants: u32) -> Result<()> {
        if self.started {
            return Err(EscrowError::invalid_state(
                "cannot set max participants after game has started",
            ));
        }
        self.max_participants = max_participants;
        Ok(())
    }

    /// Checks that the game can be settled with winners.
    pub fn ensure_endable(&self) -> Result<()> {
        if !self.started {
            return Err(EscrowError::invalid_state("game not started"));
        }
        if self.ended {
            return Err(EscrowError::invalid_state("game already ended"));
        }
        Ok(())
    }

    pub fn ensure_cancellable(&self) -> Result<()> {
        if self.ended {
            return Err(EscrowError::invalid_state("game already ended"));
        }
        Ok(())
    }

    /// One refund per participant of exactly the recorded deposit.
    pub fn refunds(&self) -> Vec<Transfer> {
        self.participants
            .iter()
            .map(|(participant, &amount)| Transfer {
                recipient: participant.clone(),
                amount,
                reason: TransferReason::Refund { game_id: self.id },
            })
            .collect()
    }

    pub(crate) fn close(&mut self) {
        self.ended = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn units(n: u64) -> Amount {
        Amount::from_units(n)
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn open_game(max: u32) -> Game {
        Game::new(0, max, t0() + Duration::seconds(60))
    }

    #[test]
    fn test_join_until_full_auto_starts() {
        let mut game = open_game(3);
        for who in ["alice", "bob", "charlie"] {
            assert_eq!(game.status(), GameStatus::Open);
            game.join(Identity::new(who), units(1000), t0()).unwrap();
        }

        assert_eq!(game.status(), GameStatus::Started);
        assert_eq!(game.total_amount(), units(3000));
        assert!(game.is_balanced());

        let result = game.join(Identity::new("dave"), units(1000), t0());
        assert!(matches!(result, Err(EscrowError::InvalidState(_))));
    }

    #[test]
    fn test_closed_game_rejects_join() {
        let mut game = open_game(3);
        game.join(Identity::new("alice"), units(500), t0()).unwrap();
        assert!(game.can_join(t0()));

        game.close();
        assert!(!game.is_started());
        assert!(!game.can_join(t0()));

        let result = game.join(Identity::new("bob"), units(500), t0());
        assert!(matches!(result, Err(EscrowError::InvalidState(_))));
        assert_eq!(game.participant_count(), 1);
        assert_eq!(game.total_amount(), units(500));
    }

    #[test]
    fn test_rejoin_replaces_stake() {
        let mut game = open_game(3);
        game.join(Identity::new("alice"), units(1000), t0()).unwrap();
        let previous = game.join(Identity::new("alice"), units(400), t0()).unwrap();

        assert_eq!(previous, Some(units(1000)));
        assert_eq!(game.participant_count(), 1);
        assert_eq!(game.total_amount(), units(400));
        assert!(game.is_balanced());
    }

    #[test]
    fn test_join_after_deadline_is_expired() {
        let mut game = open_game(3);
        let late = t0() + Duration::seconds(61);
        let result = game.join(Identity::new("alice"), units(1000), late);
        assert!(matches!(result, Err(EscrowError::Expired)));

        // deadline itself is still accepted
        let on_time = t0() + Duration::seconds(60);
        assert!(game.join(Identity::new("alice"), units(1000), on_time).is_ok());
    }

    #[test]
    fn test_zero_capacity_game_is_always_full() {
        let mut game = open_game(0);
        let result = game.join(Identity::new("alice"), units(1), t0());
        assert!(matches!(result, Err(EscrowError::Full)));
        assert!(game.is_balanced());
    }

    #[test]
    fn test_lowered_capacity_rejects_join() {
        let mut game = open_game(3);
        game.join(Identity::new("alice"), units(10), t0()).unwrap();
        game.join(Identity::new("bob"), units(10), t0()).unwrap();
        game.set_max_participants(1).unwrap();

        let result = game.join(Identity::new("charlie"), units(10), t0());
        assert!(matches!(result, Err(EscrowError::Full)));
        assert!(!game.is_started());
    }

    #[test]
    fn test_set_max_participants_after_start_fails() {
        let mut game = open_game(3);
        game.start();
        let result = game.set_max_participants(5);
        assert!(matches!(result, Err(EscrowError::InvalidState(_))));
        assert_eq!(game.max_participants(), 3);
    }

    #[test]
    fn test_start_if_expired() {
        let mut game = open_game(3);
        assert!(!game.start_if_expired(t0()));
        assert!(game.start_if_expired(t0() + Duration::seconds(61)));
        assert!(!game.start_if_expired(t0() + Duration::seconds(62)));
        assert!(game.is_started());
    }

    #[test]
    fn test_refunds_match_deposits() {
        let mut game = open_game(5);
        game.join(Identity::new("alice"), units(700), t0()).unwrap();
        game.join(Identity::new("bob"), units(300), t0()).unwrap();

        let refunds = game.refunds();
        assert_eq!(refunds.len(), 2);
        assert_eq!(crate::types::total_transferred(&refunds), game.total_amount());
        assert!(refunds
            .iter()
            .all(|t| game.participants()[&t.recipient] == t.amount));
    }

    #[test]
    fn test_endable_and_cancellable() {
        let mut game = open_game(3);
        assert!(matches!(
            game.ensure_endable(),
            Err(EscrowError::InvalidState(_))
        ));
        assert!(game.ensure_cancellable().is_ok());

        game.start();
        assert!(game.ensure_endable().is_ok());

        game.close();
        assert_eq!(game.status(), GameStatus::Closed);
        assert!(game.ensure_endable().is_err());
        assert!(game.ensure_cancellable().is_err());
    }
}
