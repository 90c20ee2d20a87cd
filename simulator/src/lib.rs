use lotto_types::{api::SimulateRequest, RulesError, SimulationConfig};
use std::sync::Arc;

mod api;
pub use api::Api;

mod error;
pub use error::SimulationError;
mod history;
pub use history::{HitLog, RoundHistory};
mod metrics;
pub use metrics::{
    HttpMetricsSnapshot, LatencySnapshot, RunMetricsSnapshot, SystemMetricsSnapshot,
};
mod orchestrator;
pub use orchestrator::{CancelFlag, Orchestrator, RunFailure, RunHandle, RunLimits, RunStatus};
mod report;

mod state;
pub use state::{SimulatorConfig, DEFAULT_HISTORY_MAX_POINTS, DEFAULT_JACKPOT_HITS_MAX};

use metrics::{HttpMetrics, SystemMetrics};

/// Lotto simulation service: one orchestrator plus the metrics served next to it.
pub struct Simulator {
    config: SimulatorConfig,
    orchestrator: Arc<Orchestrator>,
    http_metrics: HttpMetrics,
    system_metrics: SystemMetrics,
}

impl Simulator {
    /// Fails when `config.rules` does not describe a playable game.
    pub fn new_with_config(config: SimulatorConfig) -> Result<Self, RulesError> {
        let orchestrator = Arc::new(Orchestrator::new(
            config.rules.clone(),
            RunLimits {
                history_max_points: config.history_max_points,
                jackpot_hits_max: config.jackpot_hits_max,
            },
        )?);
        Ok(Self {
            config,
            orchestrator,
            http_metrics: HttpMetrics::default(),
            system_metrics: SystemMetrics::new(),
        })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Turn a request body into a run config, applying the server's default seed.
    pub fn prepare(&self, request: SimulateRequest) -> Result<SimulationConfig, SimulationError> {
        let mut config = request.into_config()?;
        config.seed = config.seed.or(self.config.deterministic_seed);
        Ok(config)
    }

    /// Claim the run slot for `request` and start it on a blocking worker.
    pub fn launch(&self, request: SimulateRequest) -> Result<LaunchedRun, SimulationError> {
        let config = self.prepare(request)?;
        let handle = self.orchestrator.start(config)?;
        let info = LaunchedRun {
            run_id: handle.run_id(),
            total_rounds: handle.total_rounds(),
            seed: handle.seed(),
        };
        self.orchestrator.spawn(handle);
        Ok(info)
    }

    pub(crate) fn http_metrics(&self) -> &HttpMetrics {
        &self.http_metrics
    }

    pub(crate) fn http_metrics_snapshot(&self) -> HttpMetricsSnapshot {
        self.http_metrics.snapshot()
    }

    pub(crate) fn run_metrics_snapshot(&self) -> RunMetricsSnapshot {
        self.orchestrator.metrics().snapshot()
    }

    pub(crate) fn system_metrics_snapshot(&self) -> SystemMetricsSnapshot {
        self.system_metrics.snapshot()
    }
}

/// Identifiers of a launched run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaunchedRun {
    pub run_id: u64,
    pub total_rounds: u64,
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_applies_default_seed() {
        let simulator = Simulator::new_with_config(SimulatorConfig {
            deterministic_seed: Some(42),
            ..SimulatorConfig::default()
        })
        .unwrap();
        let config = simulator.prepare(SimulateRequest::default()).unwrap();
        assert_eq!(config.seed, Some(42));

        let explicit = simulator
            .prepare(SimulateRequest {
                seed: Some(7),
                ..SimulateRequest::default()
            })
            .unwrap();
        assert_eq!(explicit.seed, Some(7));
    }

    #[test]
    fn test_prepare_rejects_invalid() {
        let simulator = Simulator::new_with_config(SimulatorConfig::default()).unwrap();
        let err = simulator
            .prepare(SimulateRequest {
                ticket_price: 0.0,
                ..SimulateRequest::default()
            })
            .unwrap_err();
        assert!(matches!(err, SimulationError::Validation(_)));
    }

    #[test]
    fn test_rejects_unplayable_rules() {
        let mut config = SimulatorConfig::default();
        config.rules.pick_count = config.rules.pool_size + 1;
        let err = Simulator::new_with_config(config).err().unwrap();
        assert_eq!(err, RulesError::PickCount { got: 43, pool: 42 });
    }

    #[tokio::test]
    async fn test_launch_reports_seed() {
        let simulator = Simulator::new_with_config(SimulatorConfig::default()).unwrap();
        let info = simulator
            .launch(SimulateRequest {
                total_rounds: 5,
                min_players: 1,
                max_players: 2,
                seed: Some(11),
                ..SimulateRequest::default()
            })
            .unwrap();
        assert_eq!(info.seed, 11);
        assert_eq!(info.total_rounds, 5);

        let status = simulator.orchestrator().wait(info.run_id).await;
        let report = simulator.orchestrator().outcome(info.run_id, &status).unwrap();
        assert_eq!(report.summary.seed, 11);
    }
}
