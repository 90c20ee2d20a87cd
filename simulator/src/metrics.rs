use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use sysinfo::{Pid, ProcessesToUpdate, System};

const LATENCY_BUCKET_COUNT: usize = 12;
const LATENCY_BUCKETS_MS: [u64; LATENCY_BUCKET_COUNT] =
    [1, 2, 5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000];

#[derive(Clone, Debug, Serialize)]
pub struct LatencySnapshot {
    pub buckets_ms: Vec<u64>,
    pub counts: Vec<u64>,
    pub overflow: u64,
    pub count: u64,
    pub avg_ms: f64,
    pub max_ms: u64,
}

#[derive(Default)]
struct LatencyMetrics {
    buckets: [AtomicU64; LATENCY_BUCKET_COUNT],
    overflow: AtomicU64,
    count: AtomicU64,
    total_ms: AtomicU64,
    max_ms: AtomicU64,
}

impl LatencyMetrics {
    fn record(&self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ms.fetch_add(ms, Ordering::Relaxed);
        self.update_max(ms);

        if let Some(idx) = LATENCY_BUCKETS_MS.iter().position(|bucket| ms <= *bucket) {
            self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        } else {
            self.overflow.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> LatencySnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let total_ms = self.total_ms.load(Ordering::Relaxed);
        let avg_ms = if count > 0 {
            total_ms as f64 / count as f64
        } else {
            0.0
        };
        let counts = self
            .buckets
            .iter()
            .map(|bucket| bucket.load(Ordering::Relaxed))
            .collect::<Vec<_>>();

        LatencySnapshot {
            buckets_ms: LATENCY_BUCKETS_MS.to_vec(),
            counts,
            overflow: self.overflow.load(Ordering::Relaxed),
            count,
            avg_ms,
            max_ms: self.max_ms.load(Ordering::Relaxed),
        }
    }

    fn update_max(&self, value: u64) {
        let mut current = self.max_ms.load(Ordering::Relaxed);
        while value > current {
            match self.max_ms.compare_exchange_weak(
                current,
                value,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(next) => current = next,
            }
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HttpMetricsSnapshot {
    pub simulate: LatencySnapshot,
    pub progress: LatencySnapshot,
    pub report: LatencySnapshot,
    pub reject_rate_limit: u64,
    pub reject_body_limit: u64,
}

#[derive(Default)]
pub struct HttpMetrics {
    simulate: LatencyMetrics,
    progress: LatencyMetrics,
    report: LatencyMetrics,
    reject_rate_limit: AtomicU64,
    reject_body_limit: AtomicU64,
}

impl HttpMetrics {
    pub fn record_simulate(&self, duration: Duration) {
        self.simulate.record(duration);
    }

    pub fn record_progress(&self, duration: Duration) {
        self.progress.record(duration);
    }

    pub fn record_report(&self, duration: Duration) {
        self.report.record(duration);
    }

    pub fn inc_reject_rate_limit(&self) {
        self.reject_rate_limit.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reject_body_limit(&self) {
        self.reject_body_limit.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HttpMetricsSnapshot {
        HttpMetricsSnapshot {
            simulate: self.simulate.snapshot(),
            progress: self.progress.snapshot(),
            report: self.report.snapshot(),
            reject_rate_limit: self.reject_rate_limit.load(Ordering::Relaxed),
            reject_body_limit: self.reject_body_limit.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RunMetricsSnapshot {
    pub started: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub failed: u64,
    pub conflicts: u64,
    pub rounds: u64,
    pub duration: LatencySnapshot,
}

/// Counters for simulation runs, updated by the orchestrator.
#[derive(Default)]
pub struct RunMetrics {
    started: AtomicU64,
    completed: AtomicU64,
    cancelled: AtomicU64,
    failed: AtomicU64,
    conflicts: AtomicU64,
    rounds: AtomicU64,
    duration: LatencyMetrics,
}

impl RunMetrics {
    pub fn inc_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self, rounds: u64, duration: Duration) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.record_finished(rounds, duration);
    }

    pub fn record_cancelled(&self, rounds: u64, duration: Duration) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
        self.record_finished(rounds, duration);
    }

    pub fn record_failed(&self, rounds: u64, duration: Duration) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.record_finished(rounds, duration);
    }

    fn record_finished(&self, rounds: u64, duration: Duration) {
        self.rounds.fetch_add(rounds, Ordering::Relaxed);
        self.duration.record(duration);
    }

    pub fn snapshot(&self) -> RunMetricsSnapshot {
        RunMetricsSnapshot {
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            rounds: self.rounds.load(Ordering::Relaxed),
            duration: self.duration.snapshot(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct SystemMetricsSnapshot {
    pub rss_bytes: u64,
    pub virtual_bytes: u64,
    pub cpu_usage_percent: f64,
}

/// Process memory and CPU, sampled on demand.
pub struct SystemMetrics {
    system: Mutex<System>,
    pid: Pid,
}

impl SystemMetrics {
    pub fn new() -> Self {
        let system = System::new();
        let pid = Pid::from_u32(std::process::id());
        Self {
            system: Mutex::new(system),
            pid,
        }
    }

    pub fn snapshot(&self) -> SystemMetricsSnapshot {
        let mut system = match self.system.lock() {
            Ok(system) => system,
            Err(poisoned) => {
                tracing::warn!("system metrics lock poisoned; recovering");
                poisoned.into_inner()
            }
        };
        system.refresh_cpu_usage();
        system.refresh_processes(ProcessesToUpdate::Some(&[self.pid]), false);

        match system.process(self.pid) {
            Some(process) => SystemMetricsSnapshot {
                rss_bytes: process.memory(),
                virtual_bytes: process.virtual_memory(),
                cpu_usage_percent: process.cpu_usage() as f64,
            },
            None => SystemMetricsSnapshot {
                rss_bytes: 0,
                virtual_bytes: 0,
                cpu_usage_percent: 0.0,
            },
        }
    }
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self::new()
    }
}
