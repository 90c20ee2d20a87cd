use serde::{Serialize, Serializer};
use thiserror::Error as ThisError;

use crate::amount::{self, BPS_DENOMINATOR, CENTS_PER_UNIT};

/// Size of the number pool for the default game (numbers `1..=42`).
pub const DEFAULT_POOL_SIZE: u8 = 42;

/// Numbers drawn per round and picked per ticket for the default game.
pub const DEFAULT_PICK_COUNT: u8 = 6;

/// Numbers are stored in a 64-bit set.
pub const MAX_POOL_SIZE: u8 = 64;

/// Jackpot floor (and initial pool) for the default game.
pub const DEFAULT_JACKPOT_FLOOR: u64 = 10_000_000 * CENTS_PER_UNIT;

/// Share of every round's ticket sales fed into the jackpot pool (15%).
pub const DEFAULT_CONTRIBUTION_BPS: u16 = 1_500;

/// Fixed prizes for tiers 2..=5 (5, 4, 3 and 2 matches).
pub const DEFAULT_FIXED_PRIZES: [u64; 4] = [
    3_000 * CENTS_PER_UNIT,
    200 * CENTS_PER_UNIT,
    10 * CENTS_PER_UNIT,
    5 * CENTS_PER_UNIT,
];

/// Ticket owners are indexed with a `u32` within a round.
pub const MAX_PLAYERS_PER_ROUND: u64 = u32::MAX as u64;

/// A set of distinct lottery numbers in `1..=64`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NumberSet(u64);

impl NumberSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Add a number to the set. Numbers outside `1..=64` are ignored.
    pub fn insert(&mut self, number: u8) {
        if (1..=MAX_POOL_SIZE).contains(&number) {
            self.0 |= 1u64 << (number - 1);
        }
    }

    pub fn contains(&self, number: u8) -> bool {
        (1..=MAX_POOL_SIZE).contains(&number) && self.0 & (1u64 << (number - 1)) != 0
    }

    pub fn len(&self) -> u32 {
        self.0.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Count the numbers shared with `other`.
    pub fn matches(&self, other: &NumberSet) -> u8 {
        (self.0 & other.0).count_ones() as u8
    }

    /// Numbers in ascending order.
    pub fn numbers(&self) -> Vec<u8> {
        (1..=MAX_POOL_SIZE).filter(|n| self.contains(*n)).collect()
    }
}

impl FromIterator<u8> for NumberSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = NumberSet::empty();
        for number in iter {
            set.insert(number);
        }
        set
    }
}

impl Serialize for NumberSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.numbers())
    }
}

/// Winning numbers for one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Draw {
    pub numbers: NumberSet,
}

/// A purchased combination, owned by a player index within its round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub player: u32,
    pub numbers: NumberSet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payout {
    /// Winners split the jackpot pool.
    PoolShare,
    /// Every winner receives the same amount.
    Fixed {
        #[serde(serialize_with = "amount::serialize_units")]
        amount: u64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TierRule {
    /// Prize level, 1 is the jackpot.
    pub level: u8,
    /// Minimum number of matching numbers required.
    pub matches: u8,
    pub payout: Payout,
}

#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum RulesError {
    #[error("pool size out of range (got={got}, max={max})")]
    PoolSize { got: u8, max: u8 },
    #[error("pick count out of range (got={got}, pool={pool})")]
    PickCount { got: u8, pool: u8 },
    #[error("at least one prize tier is required")]
    NoTiers,
    #[error("tier {level} is out of order (expected level {expected})")]
    LevelOrder { level: u8, expected: u8 },
    #[error("tier {level} has an invalid match threshold ({matches})")]
    Threshold { level: u8, matches: u8 },
    #[error("tier 1 must share the jackpot pool")]
    JackpotPayout,
    #[error("tier {level} cannot share the jackpot pool")]
    ExtraPoolShare { level: u8 },
    #[error("jackpot floor must be greater than zero")]
    ZeroFloor,
    #[error("{field} exceeds 100% (got={got} bps)")]
    Rate { field: &'static str, got: u16 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct JackpotConfig {
    /// Pool value after a reset; also the initial pool.
    #[serde(serialize_with = "amount::serialize_units")]
    pub floor: u64,
    /// Share of total bets contributed to the pool, in basis points.
    pub contribution_bps: u16,
    /// Share of each contribution used to repay seed debt, in basis points.
    pub seed_repay_bps: u16,
}

impl Default for JackpotConfig {
    fn default() -> Self {
        Self {
            floor: DEFAULT_JACKPOT_FLOOR,
            contribution_bps: DEFAULT_CONTRIBUTION_BPS,
            seed_repay_bps: 0,
        }
    }
}

/// Rules of the game, fixed for the lifetime of the process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GameRules {
    pub pool_size: u8,
    pub pick_count: u8,
    pub tiers: Vec<TierRule>,
    pub jackpot: JackpotConfig,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            pick_count: DEFAULT_PICK_COUNT,
            tiers: standard_tiers(DEFAULT_PICK_COUNT, &DEFAULT_FIXED_PRIZES),
            jackpot: JackpotConfig::default(),
        }
    }
}

/// Build the usual tier table: tier 1 matches every pick and shares the pool,
/// each following tier requires one match fewer and pays a fixed prize.
pub fn standard_tiers(pick_count: u8, fixed_prizes: &[u64]) -> Vec<TierRule> {
    let mut tiers = vec![TierRule {
        level: 1,
        matches: pick_count,
        payout: Payout::PoolShare,
    }];
    for (i, amount) in fixed_prizes.iter().enumerate() {
        let offset = (i + 1) as u8;
        tiers.push(TierRule {
            level: offset + 1,
            matches: pick_count.saturating_sub(offset),
            payout: Payout::Fixed { amount: *amount },
        });
    }
    tiers
}

impl GameRules {
    pub fn new(
        pool_size: u8,
        pick_count: u8,
        fixed_prizes: &[u64],
        jackpot: JackpotConfig,
    ) -> Result<Self, RulesError> {
        let rules = Self {
            pool_size,
            pick_count,
            tiers: standard_tiers(pick_count, fixed_prizes),
            jackpot,
        };
        rules.validate()?;
        Ok(rules)
    }

    pub fn validate(&self) -> Result<(), RulesError> {
        if self.pool_size == 0 || self.pool_size > MAX_POOL_SIZE {
            return Err(RulesError::PoolSize {
                got: self.pool_size,
                max: MAX_POOL_SIZE,
            });
        }
        if self.pick_count == 0 || self.pick_count > self.pool_size {
            return Err(RulesError::PickCount {
                got: self.pick_count,
                pool: self.pool_size,
            });
        }
        if self.tiers.is_empty() {
            return Err(RulesError::NoTiers);
        }

        let mut previous = self.pick_count + 1;
        for (i, tier) in self.tiers.iter().enumerate() {
            let expected = (i + 1) as u8;
            if tier.level != expected {
                return Err(RulesError::LevelOrder {
                    level: tier.level,
                    expected,
                });
            }
            if tier.matches == 0 || tier.matches >= previous {
                return Err(RulesError::Threshold {
                    level: tier.level,
                    matches: tier.matches,
                });
            }
            previous = tier.matches;
            match (i, tier.payout) {
                (0, Payout::PoolShare) => {}
                (0, Payout::Fixed { .. }) => return Err(RulesError::JackpotPayout),
                (_, Payout::PoolShare) => {
                    return Err(RulesError::ExtraPoolShare { level: tier.level })
                }
                (_, Payout::Fixed { .. }) => {}
            }
        }

        if self.jackpot.floor == 0 {
            return Err(RulesError::ZeroFloor);
        }
        if self.jackpot.contribution_bps as u64 > BPS_DENOMINATOR {
            return Err(RulesError::Rate {
                field: "contribution_bps",
                got: self.jackpot.contribution_bps,
            });
        }
        if self.jackpot.seed_repay_bps as u64 > BPS_DENOMINATOR {
            return Err(RulesError::Rate {
                field: "seed_repay_bps",
                got: self.jackpot.seed_repay_bps,
            });
        }
        Ok(())
    }

    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// Largest fixed prize, if any tier pays one.
    pub fn largest_fixed_prize(&self) -> Option<u64> {
        self.tiers
            .iter()
            .filter_map(|tier| match tier.payout {
                Payout::Fixed { amount } => Some(amount),
                Payout::PoolShare => None,
            })
            .max()
    }
}

#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
    #[error("{field} range is inverted (min={min}, max={max})")]
    InvertedRange {
        field: &'static str,
        min: u64,
        max: u64,
    },
    #[error("{field} exceeds maximum (got={got}, max={max})")]
    TooLarge {
        field: &'static str,
        got: u64,
        max: u64,
    },
    #[error("ticket_price must be a finite amount of at least 0.01")]
    InvalidTicketPrice,
}

/// Parameters of one simulation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SimulationConfig {
    pub total_rounds: u64,
    pub players_min: u64,
    pub players_max: u64,
    pub cards_min: u64,
    pub cards_max: u64,
    #[serde(serialize_with = "amount::serialize_units")]
    pub ticket_price: u64,
    /// RNG seed; drawn from entropy when absent.
    pub seed: Option<u64>,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_rounds == 0 {
            return Err(ConfigError::NotPositive {
                field: "total_rounds",
            });
        }
        check_range("players", self.players_min, self.players_max)?;
        if self.players_max > MAX_PLAYERS_PER_ROUND {
            return Err(ConfigError::TooLarge {
                field: "max_players",
                got: self.players_max,
                max: MAX_PLAYERS_PER_ROUND,
            });
        }
        check_range("cards", self.cards_min, self.cards_max)?;
        if self.ticket_price == 0 {
            return Err(ConfigError::InvalidTicketPrice);
        }
        Ok(())
    }
}

fn check_range(field: &'static str, min: u64, max: u64) -> Result<(), ConfigError> {
    if min == 0 {
        return Err(ConfigError::NotPositive { field });
    }
    if min > max {
        return Err(ConfigError::InvertedRange { field, min, max });
    }
    Ok(())
}

/// Jackpot pool state carried from one round to the next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct JackpotState {
    #[serde(serialize_with = "amount::serialize_units")]
    pub pool: u64,
    pub contribution_bps: u16,
    pub rounds_since_hit: u64,
    /// Floor injections (including the initial pool) not yet repaid.
    #[serde(serialize_with = "amount::serialize_units")]
    pub seed_debt: u64,
    /// Rounds in which tier 1 was won.
    pub hit_rounds: u64,
}

impl JackpotState {
    pub fn new(config: &JackpotConfig) -> Self {
        Self {
            pool: config.floor,
            contribution_bps: config.contribution_bps,
            rounds_since_hit: 0,
            seed_debt: config.floor,
            hit_rounds: 0,
        }
    }
}

/// Outcome of one simulated round.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoundResult {
    /// 1-based round index.
    pub round: u64,
    pub draw: Draw,
    pub player_count: u64,
    pub ticket_count: u64,
    #[serde(serialize_with = "amount::serialize_units")]
    pub total_bet: u64,
    #[serde(serialize_with = "amount::serialize_units")]
    pub total_payout: u64,
    /// Winning tickets per tier (index 0 is tier 1).
    pub tier_winners: Vec<u64>,
    #[serde(serialize_with = "amount::serialize_units_vec")]
    pub tier_payouts: Vec<u64>,
    /// Pool before this round's contribution.
    #[serde(serialize_with = "amount::serialize_units")]
    pub jackpot_before: u64,
    /// Pool after contribution, before settlement.
    #[serde(serialize_with = "amount::serialize_units")]
    pub jackpot_at_settle: u64,
    #[serde(serialize_with = "amount::serialize_units")]
    pub jackpot_after: u64,
    /// Payout over bet (a ratio, not a percentage).
    pub rtp: f64,
}

impl RoundResult {
    pub fn jackpot_winners(&self) -> u64 {
        self.tier_winners.first().copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SimulationConfig {
        SimulationConfig {
            total_rounds: 10,
            players_min: 1,
            players_max: 5,
            cards_min: 1,
            cards_max: 3,
            ticket_price: 200,
            seed: None,
        }
    }

    #[test]
    fn test_number_set_matches() {
        let a: NumberSet = [1, 2, 3, 4, 5, 6].into_iter().collect();
        let b: NumberSet = [4, 5, 6, 7, 8, 42].into_iter().collect();
        assert_eq!(a.len(), 6);
        assert_eq!(a.matches(&b), 3);
        assert_eq!(b.numbers(), vec![4, 5, 6, 7, 8, 42]);
        assert!(b.contains(42));
        assert!(!b.contains(0));
    }

    #[test]
    fn test_number_set_ignores_out_of_range() {
        let set: NumberSet = [0, 65, 64].into_iter().collect();
        assert_eq!(set.numbers(), vec![64]);
    }

    #[test]
    fn test_number_set_serializes_sorted() {
        let set: NumberSet = [9, 3, 27].into_iter().collect();
        assert_eq!(serde_json::to_string(&set).unwrap(), "[3,9,27]");
    }

    #[test]
    fn test_default_rules_are_valid() {
        let rules = GameRules::default();
        assert!(rules.validate().is_ok());
        assert_eq!(rules.tier_count(), 5);
        let thresholds: Vec<u8> = rules.tiers.iter().map(|t| t.matches).collect();
        assert_eq!(thresholds, vec![6, 5, 4, 3, 2]);
        assert_eq!(rules.tiers[0].payout, Payout::PoolShare);
        assert_eq!(rules.tiers[1].payout, Payout::Fixed { amount: 300_000 });
    }

    #[test]
    fn test_largest_fixed_prize() {
        assert_eq!(GameRules::default().largest_fixed_prize(), Some(300_000));

        let unsorted = GameRules::new(42, 6, &[50, 700, 10], JackpotConfig::default()).unwrap();
        assert_eq!(unsorted.largest_fixed_prize(), Some(700));

        let jackpot_only = GameRules::new(42, 6, &[], JackpotConfig::default()).unwrap();
        assert_eq!(jackpot_only.largest_fixed_prize(), None);
    }

    #[test]
    fn test_rules_validation() {
        let valid = GameRules::default();

        let bad_pool = GameRules { pool_size: 65, ..valid.clone() };
        assert!(matches!(bad_pool.validate(), Err(RulesError::PoolSize { .. })));

        let bad_pick = GameRules { pick_count: 43, ..valid.clone() };
        assert!(matches!(bad_pick.validate(), Err(RulesError::PickCount { .. })));

        // Six fixed prizes would need a zero-match tier.
        let too_many = GameRules::new(42, 6, &[1, 1, 1, 1, 1, 1], JackpotConfig::default());
        assert!(matches!(too_many, Err(RulesError::Threshold { level: 7, matches: 0 })));

        let mut fixed_jackpot = valid.clone();
        fixed_jackpot.tiers[0].payout = Payout::Fixed { amount: 1 };
        assert_eq!(fixed_jackpot.validate(), Err(RulesError::JackpotPayout));

        let mut second_pool = valid.clone();
        second_pool.tiers[2].payout = Payout::PoolShare;
        assert_eq!(
            second_pool.validate(),
            Err(RulesError::ExtraPoolShare { level: 3 })
        );

        let mut zero_floor = valid.clone();
        zero_floor.jackpot.floor = 0;
        assert_eq!(zero_floor.validate(), Err(RulesError::ZeroFloor));

        let mut rate = valid;
        rate.jackpot.contribution_bps = 10_001;
        assert!(matches!(rate.validate(), Err(RulesError::Rate { .. })));
    }

    #[test]
    fn test_config_validation() {
        assert!(valid_config().validate().is_ok());

        let zero_rounds = SimulationConfig { total_rounds: 0, ..valid_config() };
        assert_eq!(
            zero_rounds.validate(),
            Err(ConfigError::NotPositive { field: "total_rounds" })
        );

        let zero_players = SimulationConfig { players_min: 0, ..valid_config() };
        assert_eq!(
            zero_players.validate(),
            Err(ConfigError::NotPositive { field: "players" })
        );

        let inverted = SimulationConfig { cards_min: 4, cards_max: 3, ..valid_config() };
        assert_eq!(
            inverted.validate(),
            Err(ConfigError::InvertedRange { field: "cards", min: 4, max: 3 })
        );

        let huge = SimulationConfig { players_max: MAX_PLAYERS_PER_ROUND + 1, ..valid_config() };
        assert!(matches!(huge.validate(), Err(ConfigError::TooLarge { .. })));

        let free = SimulationConfig { ticket_price: 0, ..valid_config() };
        assert_eq!(free.validate(), Err(ConfigError::InvalidTicketPrice));
    }

    #[test]
    fn test_jackpot_state_starts_at_floor() {
        let state = JackpotState::new(&JackpotConfig::default());
        assert_eq!(state.pool, DEFAULT_JACKPOT_FLOOR);
        assert_eq!(state.seed_debt, DEFAULT_JACKPOT_FLOOR);
        assert_eq!(state.rounds_since_hit, 0);
    }
}
