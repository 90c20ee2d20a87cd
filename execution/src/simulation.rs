use lotto_types::{GameRules, JackpotState, SimulationConfig};
use tracing::debug;

use crate::jackpot::JackpotLedger;
use crate::prize::PrizeResolver;
use crate::rng::DrawRng;
use crate::round::{run_round, RoundError, SettledRound};
use crate::totals::RunTotals;

/// Everything needed to play a run round by round.
pub struct Simulation {
    config: SimulationConfig,
    rules: GameRules,
    resolver: PrizeResolver,
    ledger: JackpotLedger,
    rng: DrawRng,
    totals: RunTotals,
}

impl Simulation {
    /// Create a simulation for an already validated config.
    ///
    /// Uses the configured seed, or one drawn from entropy.
    pub fn new(config: SimulationConfig, rules: GameRules) -> Self {
        let rng = match config.seed {
            Some(seed) => DrawRng::from_seed(seed),
            None => DrawRng::from_entropy(),
        };
        Self {
            resolver: PrizeResolver::new(&rules),
            ledger: JackpotLedger::new(rules.jackpot),
            totals: RunTotals::new(rules.tier_count()),
            config,
            rules,
            rng,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    pub fn totals(&self) -> &RunTotals {
        &self.totals
    }

    pub fn jackpot(&self) -> &JackpotState {
        self.ledger.state()
    }

    pub fn completed_rounds(&self) -> u64 {
        self.totals.rounds
    }

    pub fn is_finished(&self) -> bool {
        self.totals.rounds >= self.config.total_rounds
    }

    /// Play the next round. Returns `None` once every round has been played.
    pub fn step(&mut self) -> Result<Option<SettledRound>, RoundError> {
        if self.is_finished() {
            return Ok(None);
        }
        let round = self.totals.rounds + 1;
        let settled = run_round(
            round,
            &self.config,
            &self.rules,
            &self.resolver,
            &mut self.ledger,
            &mut self.rng,
        )?;
        if settled.jackpot.is_hit() {
            debug!(
                round,
                winners = settled.jackpot.winners,
                per_winner = settled.jackpot.per_winner,
                "jackpot hit"
            );
        }
        self.totals.fold(&settled.result);
        Ok(Some(settled))
    }
}
