//! Final report assembly and CSV export.

use lotto_execution::{theoretical_probabilities, Simulation};
use lotto_types::{
    amount, Chart, ChartSet, HistoryPoint, Layout, PrizeStat, Series, SimulationReport,
    SummaryStats, Trace,
};
use std::fmt::{self, Write};

use crate::history::{HitLog, RoundHistory};

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

pub(crate) fn build_report(
    run_id: u64,
    simulation: &Simulation,
    history: RoundHistory,
    hits: HitLog,
) -> SimulationReport {
    let totals = simulation.totals();
    let rules = simulation.rules();
    let theoretical = theoretical_probabilities(rules);

    let prize_stats: Vec<PrizeStat> = rules
        .tiers
        .iter()
        .enumerate()
        .map(|(index, tier)| {
            let winners = totals.tier_winners.get(index).copied().unwrap_or(0);
            let paid = totals.tier_payouts.get(index).copied().unwrap_or(0);
            PrizeStat {
                prize_level: tier.level,
                match_count: tier.matches,
                total_winners: winners,
                total_amount: paid,
                avg_winners_per_round: ratio(winners, totals.rounds),
                probability: ratio(winners, totals.tickets),
                theoretical_probability: theoretical.get(index).copied().unwrap_or(0.0),
                rtp: ratio(paid, totals.total_bet) * 100.0,
            }
        })
        .collect();

    let jackpot = *simulation.jackpot();
    let summary = SummaryStats {
        total_rounds: totals.rounds,
        avg_players: totals.avg_players(),
        avg_cards: totals.avg_cards(),
        total_bet_amount: totals.total_bet,
        total_payout: totals.total_payout,
        jackpot_hits: totals.jackpot_hits(),
        average_rtp: totals.rtp_pct(),
        total_tickets: totals.tickets,
        final_jackpot: jackpot.pool,
        jackpot_rounds: totals.jackpot_rounds,
        seed: simulation.seed(),
    };

    let history_stride = history.stride();
    let history = history.into_points();
    let jackpot_hits_dropped = hits.dropped();

    SimulationReport {
        run_id,
        config: *simulation.config(),
        charts: build_charts(&prize_stats, &history),
        summary,
        prize_stats,
        history,
        history_stride,
        jackpot_hits: hits.into_vec(),
        jackpot_hits_dropped,
        final_jackpot: jackpot,
    }
}

fn build_charts(prize_stats: &[PrizeStat], history: &[HistoryPoint]) -> ChartSet {
    let levels = Series::Labels(
        prize_stats
            .iter()
            .map(|stat| format!("Prize {}", stat.prize_level))
            .collect(),
    );
    let rounds = Series::Values(history.iter().map(|point| point.last_round as f64).collect());

    let mut probability_layout =
        Layout::new("Prize Probability Distribution", "Prize Level", "Probability");
    probability_layout.barmode = Some("group".to_string());

    ChartSet {
        probability_dist: Chart {
            data: vec![
                Trace::bar(
                    levels.clone(),
                    prize_stats.iter().map(|stat| stat.probability).collect(),
                )
                .named("Simulated"),
                Trace::bar(
                    levels.clone(),
                    prize_stats
                        .iter()
                        .map(|stat| stat.theoretical_probability)
                        .collect(),
                )
                .named("Theoretical"),
            ],
            layout: probability_layout,
        },
        rtp_dist: Chart {
            data: vec![Trace::bar(
                levels,
                prize_stats.iter().map(|stat| stat.rtp).collect(),
            )],
            layout: Layout::new("RTP by Prize Level", "Prize Level", "RTP (%)"),
        },
        jackpot_trend: Chart {
            data: vec![Trace::line(
                rounds.clone(),
                history
                    .iter()
                    .map(|point| amount::to_units(point.jackpot_after))
                    .collect(),
            )
            .named("Jackpot")],
            layout: Layout::new("Jackpot Pool Trend", "Round", "Jackpot"),
        },
        money_comparison: Chart {
            data: vec![
                Trace::line(
                    rounds.clone(),
                    history.iter().map(HistoryPoint::avg_bet).collect(),
                )
                .named("Bets"),
                Trace::line(
                    rounds.clone(),
                    history.iter().map(HistoryPoint::avg_payout).collect(),
                )
                .named("Payouts"),
            ],
            layout: Layout::new("Bets vs Payouts per Round", "Round", "Amount"),
        },
        players_trend: Chart {
            data: vec![Trace::line(
                rounds,
                history.iter().map(HistoryPoint::avg_players).collect(),
            )
            .named("Players")],
            layout: Layout::new("Players per Round", "Round", "Players"),
        },
    }
}

/// Render history points as CSV, one row per point.
pub(crate) fn history_csv(points: &[HistoryPoint], tiers: usize) -> Result<String, fmt::Error> {
    let mut out = String::from("first_round,last_round,rounds,players,tickets,bet,payout,rtp");
    for level in 1..=tiers {
        write!(out, ",tier_{level}_winners")?;
    }
    out.push_str(",jackpot_after\n");

    for point in points {
        write!(
            out,
            "{},{},{},{},{},{:.2},{:.2},{:.6}",
            point.first_round,
            point.last_round,
            point.rounds,
            point.players,
            point.tickets,
            amount::to_units(point.bet),
            amount::to_units(point.payout),
            point.rtp(),
        )?;
        for level in 0..tiers {
            write!(out, ",{}", point.tier_winners.get(level).copied().unwrap_or(0))?;
        }
        writeln!(out, ",{:.2}", amount::to_units(point.jackpot_after))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lotto_types::{GameRules, SimulationConfig};

    fn simulate(rounds: u64, history_points: Option<usize>) -> SimulationReport {
        let config = SimulationConfig {
            total_rounds: rounds,
            players_min: 10,
            players_max: 30,
            cards_min: 1,
            cards_max: 5,
            ticket_price: 200,
            seed: Some(17),
        };
        simulate_with(config, history_points)
    }

    fn simulate_with(config: SimulationConfig, history_points: Option<usize>) -> SimulationReport {
        let mut simulation = Simulation::new(config, GameRules::default());
        let mut history = RoundHistory::new(history_points);
        while let Some(settled) = simulation.step().unwrap() {
            history.push(&settled.result);
        }
        build_report(1, &simulation, history, HitLog::new(Some(10)))
    }

    #[test]
    fn test_report_totals_agree() {
        let report = simulate(200, None);
        let summary = &report.summary;

        assert_eq!(summary.total_rounds, 200);
        assert_eq!(summary.seed, 17);
        assert_eq!(report.history.len(), 200);
        assert_eq!(
            report.history.iter().map(|p| p.bet).sum::<u64>(),
            summary.total_bet_amount
        );
        assert_eq!(summary.total_bet_amount, summary.total_tickets * 200);
        assert_eq!(
            report.prize_stats.iter().map(|s| s.total_amount).sum::<u64>(),
            summary.total_payout
        );
        assert!((10.0..=30.0).contains(&summary.avg_players));
        assert!((1.0..=5.0).contains(&summary.avg_cards));
        assert_eq!(report.final_jackpot.pool, summary.final_jackpot);
    }

    #[test]
    fn test_prize_stats_shape() {
        let report = simulate(50, None);
        let levels: Vec<u8> = report.prize_stats.iter().map(|s| s.prize_level).collect();
        assert_eq!(levels, vec![1, 2, 3, 4, 5]);
        let matches: Vec<u8> = report.prize_stats.iter().map(|s| s.match_count).collect();
        assert_eq!(matches, vec![6, 5, 4, 3, 2]);
        assert!(report.prize_stats.iter().all(|s| s.theoretical_probability > 0.0));
    }

    #[test]
    fn test_charts_align_with_history() {
        let report = simulate(300, Some(64));
        assert!(report.history.len() <= 64);
        assert_eq!(report.history_stride, 8);

        let comparison = &report.charts.money_comparison;
        assert_eq!(comparison.data.len(), 2);
        assert_eq!(comparison.data[0].y.len(), report.history.len());
        assert_eq!(comparison.data[1].y.len(), report.history.len());
        assert_eq!(report.charts.probability_dist.data.len(), 2);
        assert_eq!(report.charts.rtp_dist.data[0].y.len(), 5);
        assert_eq!(
            report.charts.jackpot_trend.data[0].y.len(),
            report.history.len()
        );
    }

    #[test]
    fn test_money_chart_is_per_round_after_compaction() {
        let config = SimulationConfig {
            total_rounds: 5,
            players_min: 1,
            players_max: 1,
            cards_min: 1,
            cards_max: 1,
            ticket_price: 200,
            seed: Some(3),
        };
        let report = simulate_with(config, Some(4));
        assert_eq!(report.history_stride, 2);
        let rounds: Vec<u64> = report.history.iter().map(|p| p.rounds).collect();
        assert_eq!(rounds, vec![2, 2, 1]);

        let bets = &report.charts.money_comparison.data[0].y;
        assert_eq!(bets, &vec![2.0, 2.0, 2.0]);
        let players = &report.charts.players_trend.data[0].y;
        assert_eq!(players, &vec![1.0, 1.0, 1.0]);

        let payouts = &report.charts.money_comparison.data[1].y;
        for (point, payout) in report.history.iter().zip(payouts) {
            let expected = amount::to_units(point.payout) / point.rounds as f64;
            assert!((payout - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_history_csv() {
        let report = simulate(3, None);
        let csv = history_csv(&report.history, 5).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "first_round,last_round,rounds,players,tickets,bet,payout,rtp,\
             tier_1_winners,tier_2_winners,tier_3_winners,tier_4_winners,tier_5_winners,\
             jackpot_after"
        );
        assert!(lines[1].starts_with("1,1,1,"));
        assert_eq!(lines[3].split(',').count(), 14);
    }
}
