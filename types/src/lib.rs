//! Common types shared by the lotto execution engine and the simulator service.
//!
//! Money is always carried as integer cents (`u64`). Values leaving the process
//! are converted to decimal currency units at serialization time (see [`amount`]).

pub mod amount;
pub mod api;
pub mod game;
pub mod progress;
pub mod report;

pub use game::{
    ConfigError, Draw, GameRules, JackpotConfig, JackpotState, NumberSet, Payout, RoundResult,
    RulesError, SimulationConfig, Ticket, TierRule,
};
pub use progress::{CurrentStats, RunPhase, RunProgress};
pub use report::{
    Axis, Chart, ChartSet, HistoryPoint, JackpotHit, Layout, PrizeStat, Series, SimulationReport,
    SummaryStats, Trace,
};
