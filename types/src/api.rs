//! Request and response bodies of the simulator HTTP API.

use serde::{Deserialize, Serialize};

use crate::amount;
use crate::game::{ConfigError, SimulationConfig};
use crate::progress::RunProgress;
use crate::report::{ChartSet, JackpotHit, PrizeStat, SimulationReport, SummaryStats};

pub const DEFAULT_TOTAL_ROUNDS: i64 = 1_000;
pub const DEFAULT_MIN_PLAYERS: i64 = 1_000;
pub const DEFAULT_MAX_PLAYERS: i64 = 5_000;
pub const DEFAULT_CARDS_MIN: i64 = 1;
pub const DEFAULT_CARDS_MAX: i64 = 5;
pub const DEFAULT_TICKET_PRICE: f64 = 2.0;

/// Body of `POST /simulate`. Missing fields take the defaults above.
///
/// Counts are signed so that negative input reaches validation instead of
/// failing deserialization with an opaque message.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SimulateRequest {
    #[serde(default = "default_total_rounds")]
    pub total_rounds: i64,
    #[serde(default = "default_min_players")]
    pub min_players: i64,
    #[serde(default = "default_max_players")]
    pub max_players: i64,
    #[serde(default = "default_cards_min")]
    pub cards_min: i64,
    #[serde(default = "default_cards_max")]
    pub cards_max: i64,
    #[serde(default = "default_ticket_price")]
    pub ticket_price: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_total_rounds() -> i64 {
    DEFAULT_TOTAL_ROUNDS
}

fn default_min_players() -> i64 {
    DEFAULT_MIN_PLAYERS
}

fn default_max_players() -> i64 {
    DEFAULT_MAX_PLAYERS
}

fn default_cards_min() -> i64 {
    DEFAULT_CARDS_MIN
}

fn default_cards_max() -> i64 {
    DEFAULT_CARDS_MAX
}

fn default_ticket_price() -> f64 {
    DEFAULT_TICKET_PRICE
}

impl Default for SimulateRequest {
    fn default() -> Self {
        Self {
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            min_players: DEFAULT_MIN_PLAYERS,
            max_players: DEFAULT_MAX_PLAYERS,
            cards_min: DEFAULT_CARDS_MIN,
            cards_max: DEFAULT_CARDS_MAX,
            ticket_price: DEFAULT_TICKET_PRICE,
            seed: None,
        }
    }
}

fn positive(field: &'static str, value: i64) -> Result<u64, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::NotPositive { field });
    }
    Ok(value as u64)
}

impl SimulateRequest {
    pub fn into_config(self) -> Result<SimulationConfig, ConfigError> {
        let config = SimulationConfig {
            total_rounds: positive("total_rounds", self.total_rounds)?,
            players_min: positive("min_players", self.min_players)?,
            players_max: positive("max_players", self.max_players)?,
            cards_min: positive("cards_min", self.cards_min)?,
            cards_max: positive("cards_max", self.cards_max)?,
            ticket_price: amount::from_units(self.ticket_price)
                .ok_or(ConfigError::InvalidTicketPrice)?,
            seed: self.seed,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Serialize)]
pub struct ReportTables<'a> {
    pub prize_stats: &'a [PrizeStat],
    pub jackpot_hits: &'a [JackpotHit],
}

/// Envelope returned by a blocking `POST /simulate` and by `GET /report`.
#[derive(Debug, Serialize)]
pub struct SuccessResponse<'a> {
    pub status: &'static str,
    pub summary_stats: &'a SummaryStats,
    pub charts: &'a ChartSet,
    pub tables: ReportTables<'a>,
}

impl<'a> SuccessResponse<'a> {
    pub fn from_report(report: &'a SimulationReport) -> Self {
        Self {
            status: "success",
            summary_stats: &report.summary,
            charts: &report.charts,
            tables: ReportTables {
                prize_stats: &report.prize_stats,
                jackpot_hits: &report.jackpot_hits,
            },
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    /// Last good snapshot, present for internal failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<RunProgress>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: RunProgress) -> Self {
        self.progress = Some(progress);
        self
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProgressResponse {
    Running { data: RunProgress },
    Failed { message: String, data: RunProgress },
    NotRunning,
}

/// Returned by `POST /simulate?wait=false`.
#[derive(Clone, Debug, Serialize)]
pub struct StartedResponse {
    pub status: &'static str,
    pub run_id: u64,
    pub total_rounds: u64,
    pub seed: u64,
}

impl StartedResponse {
    pub fn new(run_id: u64, total_rounds: u64, seed: u64) -> Self {
        Self {
            status: "started",
            run_id,
            total_rounds,
            seed,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CancelResponse {
    pub status: &'static str,
    pub run_id: u64,
}

impl CancelResponse {
    pub fn new(run_id: u64) -> Self {
        Self {
            status: "cancelled",
            run_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let request: SimulateRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, SimulateRequest::default());

        let config = request.into_config().unwrap();
        assert_eq!(config.total_rounds, 1_000);
        assert_eq!(config.players_min, 1_000);
        assert_eq!(config.players_max, 5_000);
        assert_eq!(config.cards_min, 1);
        assert_eq!(config.cards_max, 5);
        assert_eq!(config.ticket_price, 200);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_request_accepts_integer_price() {
        let request: SimulateRequest =
            serde_json::from_str(r#"{"ticket_price": 3, "seed": 7}"#).unwrap();
        let config = request.into_config().unwrap();
        assert_eq!(config.ticket_price, 300);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_request_validation() {
        let negative = SimulateRequest {
            total_rounds: -5,
            ..SimulateRequest::default()
        };
        assert_eq!(
            negative.into_config(),
            Err(ConfigError::NotPositive { field: "total_rounds" })
        );

        let zero_cards = SimulateRequest {
            cards_max: 0,
            ..SimulateRequest::default()
        };
        assert_eq!(
            zero_cards.into_config(),
            Err(ConfigError::NotPositive { field: "cards_max" })
        );

        let inverted = SimulateRequest {
            min_players: 10,
            max_players: 5,
            ..SimulateRequest::default()
        };
        assert_eq!(
            inverted.into_config(),
            Err(ConfigError::InvertedRange { field: "players", min: 10, max: 5 })
        );

        for price in [0.0, -2.0, 0.001, f64::NAN] {
            let request = SimulateRequest {
                ticket_price: price,
                ..SimulateRequest::default()
            };
            assert_eq!(request.into_config(), Err(ConfigError::InvalidTicketPrice));
        }
    }

    #[test]
    fn test_progress_response_tags() {
        let progress = RunProgress::new(1, 10, 100);

        let running = serde_json::to_value(ProgressResponse::Running {
            data: progress.clone(),
        })
        .unwrap();
        assert_eq!(running["status"], json!("running"));
        assert_eq!(running["data"]["total_rounds"], json!(10));

        let failed = serde_json::to_value(ProgressResponse::Failed {
            message: "overflow".to_string(),
            data: progress,
        })
        .unwrap();
        assert_eq!(failed["status"], json!("failed"));
        assert_eq!(failed["message"], json!("overflow"));

        let idle = serde_json::to_value(ProgressResponse::NotRunning).unwrap();
        assert_eq!(idle, json!({"status": "not_running"}));
    }

    #[test]
    fn test_error_response_omits_missing_progress() {
        let value = serde_json::to_value(ErrorResponse::new("bad input")).unwrap();
        assert_eq!(value, json!({"status": "error", "message": "bad input"}));
    }
}
