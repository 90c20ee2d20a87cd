//! Jackpot pool accounting across rounds.
//!
//! Each round first feeds a fixed share of ticket sales into the pool, then
//! settles tier 1. When nobody hits, the pool rolls over. When at least one
//! ticket hits, winners split the pool evenly (rounded down to the cent), the
//! remainder stays behind and the pool is topped back up to the floor. Every
//! top-up is recorded as seed debt, which a configurable share of later
//! contributions repays.

use lotto_types::{amount, JackpotConfig, JackpotState};
use thiserror::Error as ThisError;

#[derive(Debug, Clone, Copy, ThisError, PartialEq, Eq)]
#[error("jackpot pool overflow (pool={pool}, added={added})")]
pub struct PoolOverflow {
    pub pool: u64,
    pub added: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contribution {
    /// Share of the round's bets taken for the jackpot.
    pub total: u64,
    /// Part of `total` used to repay seed debt.
    pub repaid: u64,
    /// Part of `total` added to the pool.
    pub added: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JackpotSettlement {
    pub winners: u64,
    pub per_winner: u64,
    pub total: u64,
    /// Undivided cents carried into the reset pool.
    pub remainder: u64,
    pub pool_before: u64,
    pub pool_after: u64,
}

impl JackpotSettlement {
    pub fn is_hit(&self) -> bool {
        self.winners > 0
    }
}

#[derive(Clone, Debug)]
pub struct JackpotLedger {
    config: JackpotConfig,
    state: JackpotState,
}

impl JackpotLedger {
    pub fn new(config: JackpotConfig) -> Self {
        Self {
            state: JackpotState::new(&config),
            config,
        }
    }

    pub fn state(&self) -> &JackpotState {
        &self.state
    }

    pub fn pool(&self) -> u64 {
        self.state.pool
    }

    pub fn floor(&self) -> u64 {
        self.config.floor
    }

    /// Feed the jackpot share of `total_bet` into the pool.
    ///
    /// Leaves the ledger untouched on overflow.
    pub fn contribute(&mut self, total_bet: u64) -> Result<Contribution, PoolOverflow> {
        let total = amount::apply_bps(total_bet, self.config.contribution_bps);
        let repaid = amount::apply_bps(total, self.config.seed_repay_bps).min(self.state.seed_debt);
        let added = total - repaid;
        let pool = self.state.pool.checked_add(added).ok_or(PoolOverflow {
            pool: self.state.pool,
            added,
        })?;

        self.state.pool = pool;
        self.state.seed_debt -= repaid;
        Ok(Contribution {
            total,
            repaid,
            added,
        })
    }

    /// Pay out tier 1 to `winners` tickets.
    pub fn settle(&mut self, winners: u64) -> Result<JackpotSettlement, PoolOverflow> {
        let pool_before = self.state.pool;
        if winners == 0 {
            self.state.rounds_since_hit = self.state.rounds_since_hit.saturating_add(1);
            return Ok(JackpotSettlement {
                winners,
                per_winner: 0,
                total: 0,
                remainder: 0,
                pool_before,
                pool_after: pool_before,
            });
        }

        let per_winner = pool_before / winners;
        let total = per_winner * winners;
        let remainder = pool_before - total;
        let pool_after = self.config.floor.checked_add(remainder).ok_or(PoolOverflow {
            pool: self.config.floor,
            added: remainder,
        })?;

        self.state.pool = pool_after;
        self.state.seed_debt = self.state.seed_debt.saturating_add(self.config.floor);
        self.state.rounds_since_hit = 0;
        self.state.hit_rounds = self.state.hit_rounds.saturating_add(1);
        Ok(JackpotSettlement {
            winners,
            per_winner,
            total,
            remainder,
            pool_before,
            pool_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_config() -> JackpotConfig {
        JackpotConfig {
            floor: 1_000,
            contribution_bps: 1_500,
            seed_repay_bps: 0,
        }
    }

    #[test]
    fn test_rollover_accumulates() {
        let mut ledger = JackpotLedger::new(test_config());
        let contribution = ledger.contribute(2_000).unwrap();
        assert_eq!(contribution.total, 300);
        assert_eq!(contribution.added, 300);

        let settlement = ledger.settle(0).unwrap();
        assert!(!settlement.is_hit());
        assert_eq!(settlement.pool_after, 1_300);
        assert_eq!(ledger.pool(), 1_300);
        assert_eq!(ledger.state().rounds_since_hit, 1);
        assert_eq!(ledger.state().hit_rounds, 0);
    }

    #[test]
    fn test_hit_splits_and_resets() {
        let mut ledger = JackpotLedger::new(test_config());
        ledger.contribute(2_000).unwrap();
        ledger.settle(0).unwrap();

        let settlement = ledger.settle(3).unwrap();
        assert_eq!(settlement.pool_before, 1_300);
        assert_eq!(settlement.per_winner, 433);
        assert_eq!(settlement.total, 1_299);
        assert_eq!(settlement.remainder, 1);
        assert_eq!(settlement.pool_after, 1_001);
        assert_eq!(ledger.state().rounds_since_hit, 0);
        assert_eq!(ledger.state().hit_rounds, 1);
        assert_eq!(ledger.state().seed_debt, 2_000);
    }

    #[test]
    fn test_seed_repay() {
        let mut ledger = JackpotLedger::new(JackpotConfig {
            seed_repay_bps: 5_000,
            ..test_config()
        });
        let contribution = ledger.contribute(2_000).unwrap();
        assert_eq!(contribution.repaid, 150);
        assert_eq!(contribution.added, 150);
        assert_eq!(ledger.state().seed_debt, 850);
        assert_eq!(ledger.pool(), 1_150);
    }

    #[test]
    fn test_seed_repay_capped_by_debt() {
        let mut ledger = JackpotLedger::new(JackpotConfig {
            floor: 100,
            contribution_bps: 10_000,
            seed_repay_bps: 10_000,
        });
        let contribution = ledger.contribute(1_000).unwrap();
        assert_eq!(contribution.repaid, 100);
        assert_eq!(contribution.added, 900);
        assert_eq!(ledger.state().seed_debt, 0);
        assert_eq!(ledger.pool(), 1_000);
    }

    #[test]
    fn test_contribute_overflow_leaves_state() {
        let mut ledger = JackpotLedger::new(JackpotConfig {
            floor: u64::MAX - 1,
            contribution_bps: 10_000,
            seed_repay_bps: 0,
        });
        assert!(ledger.contribute(10).is_err());
        assert_eq!(ledger.pool(), u64::MAX - 1);
    }

    proptest! {
        #[test]
        fn prop_pool_never_below_floor(
            rounds in prop::collection::vec((0u64..1_000_000, 0u64..4), 1..64),
            repay_bps in 0u16..=10_000,
        ) {
            let config = JackpotConfig { seed_repay_bps: repay_bps, ..test_config() };
            let mut ledger = JackpotLedger::new(config);
            for (bet, winners) in rounds {
                ledger.contribute(bet).unwrap();
                let settlement = ledger.settle(winners).unwrap();
                prop_assert!(ledger.pool() >= config.floor);
                prop_assert!(settlement.total <= settlement.pool_before);
                prop_assert_eq!(settlement.total + settlement.remainder,
                    if winners == 0 { 0 } else { settlement.pool_before });
                if winners > 0 {
                    prop_assert!(settlement.remainder < winners);
                }
            }
        }
    }
}
