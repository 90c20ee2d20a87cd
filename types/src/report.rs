use serde::Serialize;

use crate::amount;
use crate::game::{JackpotState, RoundResult, SimulationConfig};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total_rounds: u64,
    pub avg_players: f64,
    /// Tickets per player across the run.
    pub avg_cards: f64,
    #[serde(serialize_with = "amount::serialize_units")]
    pub total_bet_amount: u64,
    #[serde(serialize_with = "amount::serialize_units")]
    pub total_payout: u64,
    pub jackpot_hits: u64,
    /// Percentage.
    pub average_rtp: f64,
    pub total_tickets: u64,
    #[serde(serialize_with = "amount::serialize_units")]
    pub final_jackpot: u64,
    pub jackpot_rounds: u64,
    pub seed: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PrizeStat {
    pub prize_level: u8,
    pub match_count: u8,
    pub total_winners: u64,
    #[serde(serialize_with = "amount::serialize_units")]
    pub total_amount: u64,
    pub avg_winners_per_round: f64,
    /// Winners over tickets sold.
    pub probability: f64,
    pub theoretical_probability: f64,
    /// Tier payout over total bet, as a percentage.
    pub rtp: f64,
}

/// Axis values: category labels or numbers.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Series {
    Labels(Vec<String>),
    Values(Vec<f64>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Trace {
    pub x: Series,
    pub y: Vec<f64>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Trace {
    pub fn bar(x: Series, y: Vec<f64>) -> Self {
        Self {
            x,
            y,
            kind: "bar".to_string(),
            mode: None,
            name: None,
        }
    }

    pub fn line(x: Series, y: Vec<f64>) -> Self {
        Self {
            x,
            y,
            kind: "scatter".to_string(),
            mode: Some("lines".to_string()),
            name: None,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Axis {
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Layout {
    pub title: String,
    pub xaxis: Axis,
    pub yaxis: Axis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<String>,
}

impl Layout {
    pub fn new(title: &str, x_title: &str, y_title: &str) -> Self {
        Self {
            title: title.to_string(),
            xaxis: Axis {
                title: x_title.to_string(),
            },
            yaxis: Axis {
                title: y_title.to_string(),
            },
            barmode: None,
        }
    }
}

/// A `{data, layout}` pair ready for a plotting library.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Chart {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartSet {
    pub probability_dist: Chart,
    pub rtp_dist: Chart,
    pub jackpot_trend: Chart,
    pub money_comparison: Chart,
    pub players_trend: Chart,
}

/// One or more consecutive rounds folded together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryPoint {
    pub first_round: u64,
    pub last_round: u64,
    pub rounds: u64,
    pub players: u64,
    pub tickets: u64,
    #[serde(serialize_with = "amount::serialize_units")]
    pub bet: u64,
    #[serde(serialize_with = "amount::serialize_units")]
    pub payout: u64,
    pub tier_winners: Vec<u64>,
    /// Pool after the last round in the bucket.
    #[serde(serialize_with = "amount::serialize_units")]
    pub jackpot_after: u64,
}

impl HistoryPoint {
    pub fn from_round(result: &RoundResult) -> Self {
        Self {
            first_round: result.round,
            last_round: result.round,
            rounds: 1,
            players: result.player_count,
            tickets: result.ticket_count,
            bet: result.total_bet,
            payout: result.total_payout,
            tier_winners: result.tier_winners.clone(),
            jackpot_after: result.jackpot_after,
        }
    }

    /// Fold the following bucket into this one.
    pub fn absorb(&mut self, next: &HistoryPoint) {
        self.last_round = next.last_round;
        self.rounds += next.rounds;
        self.players = self.players.saturating_add(next.players);
        self.tickets = self.tickets.saturating_add(next.tickets);
        self.bet = self.bet.saturating_add(next.bet);
        self.payout = self.payout.saturating_add(next.payout);
        for (total, winners) in self.tier_winners.iter_mut().zip(&next.tier_winners) {
            *total = total.saturating_add(*winners);
        }
        self.jackpot_after = next.jackpot_after;
    }

    pub fn avg_players(&self) -> f64 {
        if self.rounds == 0 {
            return 0.0;
        }
        self.players as f64 / self.rounds as f64
    }

    /// Mean bet per round in the bucket, in currency units.
    pub fn avg_bet(&self) -> f64 {
        per_round(self.bet, self.rounds)
    }

    /// Mean payout per round in the bucket, in currency units.
    pub fn avg_payout(&self) -> f64 {
        per_round(self.payout, self.rounds)
    }

    /// Payout over bet for the bucket, as a ratio.
    pub fn rtp(&self) -> f64 {
        if self.bet == 0 {
            return 0.0;
        }
        self.payout as f64 / self.bet as f64
    }
}

fn per_round(cents: u64, rounds: u64) -> f64 {
    if rounds == 0 {
        return 0.0;
    }
    amount::to_units(cents) / rounds as f64
}

/// A round in which tier 1 was won.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JackpotHit {
    pub round: u64,
    pub winners: u64,
    #[serde(serialize_with = "amount::serialize_units")]
    pub prize_per_winner: u64,
    #[serde(serialize_with = "amount::serialize_units")]
    pub total_prize: u64,
    #[serde(serialize_with = "amount::serialize_units")]
    pub pool_before: u64,
    #[serde(serialize_with = "amount::serialize_units")]
    pub pool_after: u64,
}

/// Everything known about a completed run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationReport {
    pub run_id: u64,
    pub config: SimulationConfig,
    pub summary: SummaryStats,
    pub prize_stats: Vec<PrizeStat>,
    pub charts: ChartSet,
    pub history: Vec<HistoryPoint>,
    /// Rounds per history bucket.
    pub history_stride: u64,
    pub jackpot_hits: Vec<JackpotHit>,
    /// Hit records dropped once the cap was reached.
    pub jackpot_hits_dropped: u64,
    pub final_jackpot: JackpotState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::NumberSet;
    use crate::Draw;
    use serde_json::json;

    fn round(index: u64, bet: u64, payout: u64) -> RoundResult {
        RoundResult {
            round: index,
            draw: Draw {
                numbers: NumberSet::from_iter([1, 2, 3, 4, 5, 6]),
            },
            player_count: 2,
            ticket_count: 3,
            total_bet: bet,
            total_payout: payout,
            tier_winners: vec![0, 0, 1, 0, 2],
            tier_payouts: vec![0, 0, 20_000, 0, 1_000],
            jackpot_before: 100,
            jackpot_at_settle: 190,
            jackpot_after: 190,
            rtp: payout as f64 / bet as f64,
        }
    }

    #[test]
    fn test_history_point_absorb() {
        let mut point = HistoryPoint::from_round(&round(1, 600, 0));
        point.absorb(&HistoryPoint::from_round(&round(2, 600, 1_200)));

        assert_eq!(point.first_round, 1);
        assert_eq!(point.last_round, 2);
        assert_eq!(point.rounds, 2);
        assert_eq!(point.players, 4);
        assert_eq!(point.tickets, 6);
        assert_eq!(point.bet, 1_200);
        assert_eq!(point.tier_winners, vec![0, 0, 2, 0, 4]);
        assert_eq!(point.avg_players(), 2.0);
        assert_eq!(point.rtp(), 1.0);
    }

    #[test]
    fn test_history_point_zero_bet_rtp() {
        let point = HistoryPoint::from_round(&round(1, 0, 0));
        assert_eq!(point.rtp(), 0.0);
    }

    #[test]
    fn test_trace_serialization() {
        let trace = Trace::bar(Series::Labels(vec!["Prize 1".to_string()]), vec![0.5])
            .named("Simulated");
        let value = serde_json::to_value(&trace).unwrap();
        assert_eq!(
            value,
            json!({"x": ["Prize 1"], "y": [0.5], "type": "bar", "name": "Simulated"})
        );

        let line = Trace::line(Series::Values(vec![1.0, 2.0]), vec![3.0, 4.0]);
        let value = serde_json::to_value(&line).unwrap();
        assert_eq!(value["type"], json!("scatter"));
        assert_eq!(value["mode"], json!("lines"));
        assert_eq!(value["x"], json!([1.0, 2.0]));
    }
}
