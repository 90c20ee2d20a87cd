use lotto_types::{CurrentStats, RoundResult};

/// Running aggregates over every round of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub rounds: u64,
    pub players: u64,
    pub tickets: u64,
    pub total_bet: u64,
    pub total_payout: u64,
    pub tier_winners: Vec<u64>,
    pub tier_payouts: Vec<u64>,
    /// Rounds in which tier 1 was won.
    pub jackpot_rounds: u64,
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

impl RunTotals {
    pub fn new(tiers: usize) -> Self {
        Self {
            tier_winners: vec![0; tiers],
            tier_payouts: vec![0; tiers],
            ..Self::default()
        }
    }

    pub fn fold(&mut self, result: &RoundResult) {
        self.rounds += 1;
        self.players = self.players.saturating_add(result.player_count);
        self.tickets = self.tickets.saturating_add(result.ticket_count);
        self.total_bet = self.total_bet.saturating_add(result.total_bet);
        self.total_payout = self.total_payout.saturating_add(result.total_payout);
        for (total, winners) in self.tier_winners.iter_mut().zip(&result.tier_winners) {
            *total = total.saturating_add(*winners);
        }
        for (total, paid) in self.tier_payouts.iter_mut().zip(&result.tier_payouts) {
            *total = total.saturating_add(*paid);
        }
        if result.jackpot_winners() > 0 {
            self.jackpot_rounds += 1;
        }
    }

    pub fn avg_players(&self) -> f64 {
        ratio(self.players, self.rounds)
    }

    /// Tickets per player.
    pub fn avg_cards(&self) -> f64 {
        ratio(self.tickets, self.players)
    }

    /// Winning tier-1 tickets.
    pub fn jackpot_hits(&self) -> u64 {
        self.tier_winners.first().copied().unwrap_or(0)
    }

    /// Cumulative payout over bet, as a percentage.
    pub fn rtp_pct(&self) -> f64 {
        ratio(self.total_payout, self.total_bet) * 100.0
    }

    pub fn current_stats(
        &self,
        total_rounds: u64,
        jackpot_pool: u64,
        elapsed_ms: u64,
    ) -> CurrentStats {
        CurrentStats {
            avg_players: self.avg_players(),
            total_bet_amount: self.total_bet,
            total_payout: self.total_payout,
            jackpot_hits: self.jackpot_hits(),
            current_rtp: self.rtp_pct(),
            total_tickets: self.tickets,
            jackpot_pool,
            progress_pct: ratio(self.rounds, total_rounds) * 100.0,
            elapsed_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lotto_types::{Draw, NumberSet};

    fn result(players: u64, tickets: u64, winners: Vec<u64>, payouts: Vec<u64>) -> RoundResult {
        RoundResult {
            round: 1,
            draw: Draw {
                numbers: NumberSet::from_iter([1, 2, 3, 4, 5, 6]),
            },
            player_count: players,
            ticket_count: tickets,
            total_bet: tickets * 200,
            total_payout: payouts.iter().sum(),
            tier_winners: winners,
            tier_payouts: payouts,
            jackpot_before: 0,
            jackpot_at_settle: 0,
            jackpot_after: 0,
            rtp: 0.0,
        }
    }

    #[test]
    fn test_empty_totals() {
        let totals = RunTotals::new(5);
        assert_eq!(totals.avg_players(), 0.0);
        assert_eq!(totals.avg_cards(), 0.0);
        assert_eq!(totals.rtp_pct(), 0.0);

        let stats = totals.current_stats(10, 500, 0);
        assert_eq!(stats.progress_pct, 0.0);
        assert_eq!(stats.jackpot_pool, 500);
    }

    #[test]
    fn test_fold() {
        let mut totals = RunTotals::new(3);
        totals.fold(&result(2, 4, vec![0, 1, 1], vec![0, 300, 100]));
        totals.fold(&result(4, 6, vec![2, 0, 1], vec![1_000, 0, 100]));

        assert_eq!(totals.rounds, 2);
        assert_eq!(totals.avg_players(), 3.0);
        assert_eq!(totals.avg_cards(), 10.0 / 6.0);
        assert_eq!(totals.total_bet, 2_000);
        assert_eq!(totals.total_payout, 1_500);
        assert_eq!(totals.tier_winners, vec![2, 1, 2]);
        assert_eq!(totals.tier_payouts, vec![1_000, 300, 200]);
        assert_eq!(totals.jackpot_hits(), 2);
        assert_eq!(totals.jackpot_rounds, 1);
        assert_eq!(totals.rtp_pct(), 75.0);

        let stats = totals.current_stats(8, 0, 12);
        assert_eq!(stats.progress_pct, 25.0);
        assert_eq!(stats.total_tickets, 10);
        assert_eq!(stats.elapsed_ms, 12);
    }
}
