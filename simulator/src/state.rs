use lotto_types::GameRules;
use serde::Serialize;

pub const DEFAULT_HISTORY_MAX_POINTS: usize = 10_000;
pub const DEFAULT_JACKPOT_HITS_MAX: usize = 10_000;
const DEFAULT_HTTP_RATE_LIMIT_PER_SECOND: u64 = 1_000;
const DEFAULT_HTTP_RATE_LIMIT_BURST: u32 = 5_000;
const DEFAULT_SIMULATE_RATE_LIMIT_PER_MINUTE: u64 = 60;
const DEFAULT_SIMULATE_RATE_LIMIT_BURST: u32 = 10;
const DEFAULT_HTTP_BODY_LIMIT_BYTES: usize = 64 * 1024;

#[derive(Clone, Debug, Serialize)]
pub struct SimulatorConfig {
    /// Maximum history points retained per run (`None` keeps every round).
    pub history_max_points: Option<usize>,
    /// Maximum jackpot hit records retained per run (`None` keeps all).
    pub jackpot_hits_max: Option<usize>,
    /// Seed used when a request does not carry one.
    pub deterministic_seed: Option<u64>,
    pub http_rate_limit_per_second: Option<u64>,
    pub http_rate_limit_burst: Option<u32>,
    pub simulate_rate_limit_per_minute: Option<u64>,
    pub simulate_rate_limit_burst: Option<u32>,
    pub http_body_limit_bytes: Option<usize>,
    pub rules: GameRules,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            history_max_points: Some(DEFAULT_HISTORY_MAX_POINTS),
            jackpot_hits_max: Some(DEFAULT_JACKPOT_HITS_MAX),
            deterministic_seed: None,
            http_rate_limit_per_second: Some(DEFAULT_HTTP_RATE_LIMIT_PER_SECOND),
            http_rate_limit_burst: Some(DEFAULT_HTTP_RATE_LIMIT_BURST),
            simulate_rate_limit_per_minute: Some(DEFAULT_SIMULATE_RATE_LIMIT_PER_MINUTE),
            simulate_rate_limit_burst: Some(DEFAULT_SIMULATE_RATE_LIMIT_BURST),
            http_body_limit_bytes: Some(DEFAULT_HTTP_BODY_LIMIT_BYTES),
            rules: GameRules::default(),
        }
    }
}

impl SimulatorConfig {
    /// Config without rate limiting, for tests driving the router directly.
    #[cfg(test)]
    pub(crate) fn unlimited() -> Self {
        Self {
            http_rate_limit_per_second: None,
            http_rate_limit_burst: None,
            simulate_rate_limit_per_minute: None,
            simulate_rate_limit_burst: None,
            ..Self::default()
        }
    }
}
