//! Simulation run lifecycle.
//!
//! At most one run is active per process. A run moves through
//! `Idle -> Running -> {Completed, Cancelled, Failed}` and its terminal state is
//! kept until the next run replaces it.
//!
//! The round loop runs on a blocking worker. After every round the worker
//! publishes an immutable [`RunProgress`] snapshot; readers clone the `Arc` under
//! a short lock, so they never observe a half-updated round and two reads with
//! no round in between return the same snapshot. Cancellation is cooperative
//! and checked at round boundaries only.

use lotto_execution::Simulation;
use lotto_types::{
    GameRules, JackpotHit, RulesError, RunPhase, RunProgress, SimulationConfig,
    SimulationReport,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::SimulationError;
use crate::history::{HitLog, RoundHistory};
use crate::metrics::RunMetrics;
use crate::report::build_report;

/// Shared flag a run checks before each round.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Retention limits applied to every run.
#[derive(Clone, Copy, Debug)]
pub struct RunLimits {
    pub history_max_points: Option<usize>,
    pub jackpot_hits_max: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunFailure {
    pub round: u64,
    pub message: String,
}

/// Point-in-time view of the most recent run.
#[derive(Clone, Debug)]
pub struct RunStatus {
    /// Zero before the first run.
    pub run_id: u64,
    pub phase: RunPhase,
    pub progress: Option<Arc<RunProgress>>,
    pub failure: Option<RunFailure>,
}

/// A validated run, ready to be executed.
///
/// Dropping a handle before its run settles releases the slot as cancelled,
/// or as failed when the drop happens while unwinding.
pub struct RunHandle {
    run_id: u64,
    cancel: CancelFlag,
    simulation: Simulation,
    started: Instant,
    orchestrator: Arc<Orchestrator>,
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.orchestrator
                .abort(self.run_id, self.started, "worker panicked".to_string());
        } else {
            self.orchestrator.release(self.run_id, self.started);
        }
    }
}

impl RunHandle {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn seed(&self) -> u64 {
        self.simulation.seed()
    }

    pub fn total_rounds(&self) -> u64 {
        self.simulation.config().total_rounds
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PhaseMarker {
    run_id: u64,
    phase: RunPhase,
}

struct RunSlot {
    run_id: u64,
    phase: RunPhase,
    progress: Option<Arc<RunProgress>>,
    report: Option<Arc<SimulationReport>>,
    failure: Option<RunFailure>,
    cancel: Option<CancelFlag>,
}

enum Outcome {
    Completed(Arc<SimulationReport>),
    Cancelled,
    Failed(RunFailure),
}

pub struct Orchestrator {
    rules: GameRules,
    limits: RunLimits,
    slot: Mutex<RunSlot>,
    next_run_id: AtomicU64,
    phase_tx: watch::Sender<PhaseMarker>,
    metrics: RunMetrics,
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

impl Orchestrator {
    /// Rules are validated once here; every run reuses them unchanged.
    pub fn new(rules: GameRules, limits: RunLimits) -> Result<Self, RulesError> {
        rules.validate()?;
        let (phase_tx, _) = watch::channel(PhaseMarker {
            run_id: 0,
            phase: RunPhase::Idle,
        });
        Ok(Self {
            rules,
            limits,
            slot: Mutex::new(RunSlot {
                run_id: 0,
                phase: RunPhase::Idle,
                progress: None,
                report: None,
                failure: None,
                cancel: None,
            }),
            next_run_id: AtomicU64::new(1),
            phase_tx,
            metrics: RunMetrics::default(),
        })
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    fn slot(&self) -> MutexGuard<'_, RunSlot> {
        match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => {
                warn!("run slot lock poisoned; recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn start(self: &Arc<Self>, config: SimulationConfig) -> Result<RunHandle, SimulationError> {
        self.start_with_cancel(config, CancelFlag::new())
    }

    /// Validate `config` and claim the run slot.
    ///
    /// Fails with `Conflict` while another run is active; requests are never queued.
    pub fn start_with_cancel(
        self: &Arc<Self>,
        config: SimulationConfig,
        cancel: CancelFlag,
    ) -> Result<RunHandle, SimulationError> {
        config.validate()?;

        let mut slot = self.slot();
        if slot.phase == RunPhase::Running {
            self.metrics.inc_conflict();
            return Err(SimulationError::Conflict {
                run_id: slot.run_id,
            });
        }

        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let simulation = Simulation::new(config, self.rules.clone());
        let progress = RunProgress::new(run_id, config.total_rounds, simulation.jackpot().pool);
        *slot = RunSlot {
            run_id,
            phase: RunPhase::Running,
            progress: Some(Arc::new(progress)),
            report: None,
            failure: None,
            cancel: Some(cancel.clone()),
        };
        self.phase_tx.send_replace(PhaseMarker {
            run_id,
            phase: RunPhase::Running,
        });
        drop(slot);

        self.metrics.inc_started();
        info!(
            run_id,
            total_rounds = config.total_rounds,
            seed = simulation.seed(),
            "simulation started"
        );
        Ok(RunHandle {
            run_id,
            cancel,
            simulation,
            started: Instant::now(),
            orchestrator: Arc::clone(self),
        })
    }

    /// Execute every round of `handle` on the current thread.
    ///
    /// `observer` sees each snapshot right after it is published.
    pub fn run_blocking<F>(&self, mut handle: RunHandle, mut observer: F) -> RunPhase
    where
        F: FnMut(&RunProgress),
    {
        let run_id = handle.run_id;
        let started = handle.started;
        let cancel = &handle.cancel;
        let simulation = &mut handle.simulation;
        let total = simulation.config().total_rounds;
        let log_every = (total / 10).max(1);
        let mut history = RoundHistory::new(self.limits.history_max_points);
        let mut hits = HitLog::new(self.limits.jackpot_hits_max);

        loop {
            if !simulation.is_finished() && cancel.is_cancelled() {
                let completed = simulation.completed_rounds();
                return self.finish(run_id, started, completed, Outcome::Cancelled);
            }
            match simulation.step() {
                Ok(Some(settled)) => {
                    history.push(&settled.result);
                    if settled.jackpot.is_hit() {
                        hits.push(JackpotHit {
                            round: settled.result.round,
                            winners: settled.jackpot.winners,
                            prize_per_winner: settled.jackpot.per_winner,
                            total_prize: settled.jackpot.total,
                            pool_before: settled.jackpot.pool_before,
                            pool_after: settled.jackpot.pool_after,
                        });
                    }
                    let completed = simulation.completed_rounds();
                    let progress = Arc::new(RunProgress {
                        run_id,
                        completed_rounds: completed,
                        total_rounds: total,
                        current_stats: simulation.totals().current_stats(
                            total,
                            simulation.jackpot().pool,
                            elapsed_ms(started),
                        ),
                    });
                    self.publish(run_id, Arc::clone(&progress));
                    if completed % log_every == 0 {
                        info!(run_id, completed, total, "simulation progress");
                    }
                    observer(&progress);
                }
                Ok(None) => {
                    let report = build_report(run_id, simulation, history, hits);
                    return self.finish(
                        run_id,
                        started,
                        total,
                        Outcome::Completed(Arc::new(report)),
                    );
                }
                Err(err) => {
                    error!(run_id, round = err.round(), error = %err, "simulation failed");
                    let failure = RunFailure {
                        round: err.round(),
                        message: err.to_string(),
                    };
                    return self.finish(
                        run_id,
                        started,
                        simulation.completed_rounds(),
                        Outcome::Failed(failure),
                    );
                }
            }
        }
    }

    /// Run `handle` on a blocking worker.
    ///
    /// A panicking worker marks the run as failed.
    pub fn spawn(self: &Arc<Self>, handle: RunHandle) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        let run_id = handle.run_id;
        let started = handle.started;
        tokio::spawn(async move {
            let worker = Arc::clone(&orchestrator);
            let result =
                tokio::task::spawn_blocking(move || worker.run_blocking(handle, |_| {})).await;
            if let Err(err) = result {
                error!(run_id, error = %err, "simulation worker aborted");
                orchestrator.abort(run_id, started, format!("worker aborted: {err}"));
            }
        })
    }

    fn publish(&self, run_id: u64, progress: Arc<RunProgress>) {
        let mut slot = self.slot();
        if slot.run_id == run_id {
            slot.progress = Some(progress);
        }
    }

    /// Rounds completed by `run_id`, if it is still the running run.
    fn running_rounds(&self, run_id: u64) -> Option<u64> {
        let slot = self.slot();
        if slot.run_id != run_id || slot.phase != RunPhase::Running {
            return None;
        }
        Some(
            slot.progress
                .as_ref()
                .map(|progress| progress.completed_rounds)
                .unwrap_or(0),
        )
    }

    fn abort(&self, run_id: u64, started: Instant, message: String) {
        if let Some(completed) = self.running_rounds(run_id) {
            let failure = RunFailure {
                round: completed + 1,
                message,
            };
            self.finish(run_id, started, completed, Outcome::Failed(failure));
        }
    }

    fn release(&self, run_id: u64, started: Instant) {
        if let Some(completed) = self.running_rounds(run_id) {
            warn!(run_id, completed, "run handle dropped before the run settled");
            self.finish(run_id, started, completed, Outcome::Cancelled);
        }
    }

    fn finish(
        &self,
        run_id: u64,
        started: Instant,
        completed: u64,
        outcome: Outcome,
    ) -> RunPhase {
        let duration: Duration = started.elapsed();
        let mut slot = self.slot();
        if slot.run_id != run_id {
            return slot.phase;
        }
        let phase = match outcome {
            Outcome::Completed(report) => {
                slot.report = Some(report);
                self.metrics.record_completed(completed, duration);
                RunPhase::Completed
            }
            Outcome::Cancelled => {
                self.metrics.record_cancelled(completed, duration);
                RunPhase::Cancelled
            }
            Outcome::Failed(failure) => {
                slot.failure = Some(failure);
                self.metrics.record_failed(completed, duration);
                RunPhase::Failed
            }
        };
        slot.phase = phase;
        slot.cancel = None;
        self.phase_tx.send_replace(PhaseMarker { run_id, phase });
        drop(slot);

        info!(
            run_id,
            phase = phase.as_str(),
            completed,
            elapsed_ms = duration.as_millis() as u64,
            "simulation finished"
        );
        phase
    }

    pub fn status(&self) -> RunStatus {
        let slot = self.slot();
        RunStatus {
            run_id: slot.run_id,
            phase: slot.phase,
            progress: slot.progress.clone(),
            failure: slot.failure.clone(),
        }
    }

    /// Latest snapshot of the active run.
    pub fn progress(&self) -> Result<Arc<RunProgress>, SimulationError> {
        let slot = self.slot();
        match (&slot.phase, &slot.progress) {
            (RunPhase::Running, Some(progress)) => Ok(Arc::clone(progress)),
            _ => Err(SimulationError::NotRunning),
        }
    }

    /// Report of the most recent run, available once it completed.
    pub fn report(&self) -> Result<Arc<SimulationReport>, SimulationError> {
        let slot = self.slot();
        match (&slot.phase, &slot.report) {
            (RunPhase::Completed, Some(report)) => Ok(Arc::clone(report)),
            (phase, _) => Err(SimulationError::NotReady {
                phase: phase.as_str(),
            }),
        }
    }

    /// Request cancellation of the active run, returning its id.
    pub fn cancel(&self) -> Result<u64, SimulationError> {
        let slot = self.slot();
        match (&slot.phase, &slot.cancel) {
            (RunPhase::Running, Some(cancel)) => {
                cancel.cancel();
                info!(run_id = slot.run_id, "simulation cancel requested");
                Ok(slot.run_id)
            }
            _ => Err(SimulationError::NotRunning),
        }
    }

    /// Wait until `run_id` reaches a terminal phase (or is replaced).
    pub async fn wait(&self, run_id: u64) -> RunStatus {
        let mut rx = self.phase_tx.subscribe();
        let _ = rx
            .wait_for(|marker| marker.run_id != run_id || marker.phase.is_terminal())
            .await;
        self.status()
    }

    /// Map the final status of `run_id` to its report or error.
    pub fn outcome(
        &self,
        run_id: u64,
        status: &RunStatus,
    ) -> Result<Arc<SimulationReport>, SimulationError> {
        if status.run_id != run_id {
            return Err(SimulationError::NotReady {
                phase: RunPhase::Idle.as_str(),
            });
        }
        match status.phase {
            RunPhase::Completed => self.report(),
            RunPhase::Cancelled => Err(SimulationError::Cancelled { run_id }),
            RunPhase::Failed => {
                let failure = status.failure.clone().unwrap_or(RunFailure {
                    round: 0,
                    message: "unknown failure".to_string(),
                });
                Err(SimulationError::Internal {
                    round: failure.round,
                    message: failure.message,
                    progress: status.progress.clone(),
                })
            }
            phase => Err(SimulationError::NotReady {
                phase: phase.as_str(),
            }),
        }
    }
}
