use serde::Serialize;

use crate::amount;

/// Lifecycle of a simulation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

/// Running cumulative statistics over the rounds completed so far.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CurrentStats {
    pub avg_players: f64,
    #[serde(serialize_with = "amount::serialize_units")]
    pub total_bet_amount: u64,
    #[serde(serialize_with = "amount::serialize_units")]
    pub total_payout: u64,
    /// Tier-1 winning tickets.
    pub jackpot_hits: u64,
    /// Cumulative payout over bet, as a percentage.
    pub current_rtp: f64,
    pub total_tickets: u64,
    #[serde(serialize_with = "amount::serialize_units")]
    pub jackpot_pool: u64,
    pub progress_pct: f64,
    pub elapsed_ms: u64,
}

/// Immutable snapshot published after every round.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunProgress {
    pub run_id: u64,
    pub completed_rounds: u64,
    pub total_rounds: u64,
    pub current_stats: CurrentStats,
}

impl RunProgress {
    pub fn new(run_id: u64, total_rounds: u64, jackpot_pool: u64) -> Self {
        Self {
            run_id,
            completed_rounds: 0,
            total_rounds,
            current_stats: CurrentStats {
                jackpot_pool,
                ..CurrentStats::default()
            },
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed_rounds >= self.total_rounds
    }
}
