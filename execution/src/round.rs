//! One draw-and-settle cycle.

use lotto_types::{GameRules, Payout, RoundResult, SimulationConfig};
use thiserror::Error as ThisError;

use crate::jackpot::{JackpotLedger, JackpotSettlement};
use crate::prize::PrizeResolver;
use crate::rng::DrawRng;

#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum RoundError {
    #[error("amount overflow in round {round} while computing {what}")]
    AmountOverflow { round: u64, what: &'static str },
}

impl RoundError {
    pub fn round(&self) -> u64 {
        match self {
            Self::AmountOverflow { round, .. } => *round,
        }
    }
}

/// A settled round together with its jackpot settlement.
#[derive(Clone, Debug)]
pub struct SettledRound {
    pub result: RoundResult,
    pub jackpot: JackpotSettlement,
}

/// Run round `round` (1-based) end to end.
///
/// The draw is taken before tickets are generated so that tickets can be
/// resolved as they are produced.
pub fn run_round(
    round: u64,
    config: &SimulationConfig,
    rules: &GameRules,
    resolver: &PrizeResolver,
    ledger: &mut JackpotLedger,
    rng: &mut DrawRng,
) -> Result<SettledRound, RoundError> {
    let overflow = |what| RoundError::AmountOverflow { round, what };

    let player_count = rng.generate_players(config);
    let draw = rng.generate_draw(rules);
    let mut ticket_count = 0u64;
    let tier_winners = resolver.resolve(
        &draw,
        rng.tickets(player_count, config, rules)
            .inspect(|_| ticket_count += 1),
    );
    let total_bet = ticket_count
        .checked_mul(config.ticket_price)
        .ok_or_else(|| overflow("total bet"))?;

    let jackpot_before = ledger.pool();
    ledger
        .contribute(total_bet)
        .map_err(|_| overflow("jackpot contribution"))?;
    let jackpot_at_settle = ledger.pool();
    let jackpot_winners = tier_winners.first().copied().unwrap_or(0);
    let settlement = ledger
        .settle(jackpot_winners)
        .map_err(|_| overflow("jackpot reset"))?;

    let mut tier_payouts = Vec::with_capacity(tier_winners.len());
    for (tier, winners) in rules.tiers.iter().zip(&tier_winners) {
        let paid = match tier.payout {
            Payout::PoolShare => settlement.total,
            Payout::Fixed { amount } => winners
                .checked_mul(amount)
                .ok_or_else(|| overflow("tier payout"))?,
        };
        tier_payouts.push(paid);
    }
    let total_payout = tier_payouts
        .iter()
        .try_fold(0u64, |sum, paid| sum.checked_add(*paid))
        .ok_or_else(|| overflow("total payout"))?;

    let rtp = if total_bet == 0 {
        0.0
    } else {
        total_payout as f64 / total_bet as f64
    };

    Ok(SettledRound {
        result: RoundResult {
            round,
            draw,
            player_count,
            ticket_count,
            total_bet,
            total_payout,
            tier_winners,
            tier_payouts,
            jackpot_before,
            jackpot_at_settle,
            jackpot_after: ledger.pool(),
            rtp,
        },
        jackpot: settlement,
    })
}
