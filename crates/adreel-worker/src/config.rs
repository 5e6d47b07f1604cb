//! Worker/Scheduler tuning knobs.

use std::time::Duration;

/// Per-job wall-clock budget (spec.md §4.2 step 5).
pub const JOB_TIMEOUT_SECS: u64 = 55;
/// Budget for a single external provider call inside a stage handler.
pub const PROVIDER_CALL_TIMEOUT_SECS: u64 = 30;
/// A job stuck `running` longer than this is presumed abandoned by a dead worker.
pub const STUCK_RUNNING_THRESHOLD_SECS: u64 = 20 * 60;
/// A batch stuck `running` longer than this is timed out by the janitor.
pub const INCOMPLETE_BATCH_HOURS: u64 = 2;
/// A `failed` batch older than this is purged (cascade delete + storage cleanup).
pub const FAILED_BATCH_HOURS: u64 = 24;
/// `done` jobs older than this are purged by the janitor.
pub const DONE_JOB_RETENTION_HOURS: u64 = 1;
/// Non-winner, non-killed clips are soft-deleted after this long.
pub const CLIP_RETENTION_DAYS: u64 = 30;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Wall-clock budget for a single dispatched job.
    pub job_timeout: Duration,
    /// Budget for a single external provider call inside a handler.
    pub provider_call_timeout: Duration,
    /// Number of `run_once` calls the fast tick issues concurrently.
    pub fast_tick_concurrency: usize,
    /// Interval between fast ticks.
    pub fast_tick_interval: Duration,
    /// Interval between janitor passes.
    pub janitor_interval: Duration,
    pub stuck_running_threshold: Duration,
    pub incomplete_batch_timeout: Duration,
    pub failed_batch_retention: Duration,
    pub done_job_retention: Duration,
    pub clip_retention: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            job_timeout: Duration::from_secs(JOB_TIMEOUT_SECS),
            provider_call_timeout: Duration::from_secs(PROVIDER_CALL_TIMEOUT_SECS),
            fast_tick_concurrency: 3,
            fast_tick_interval: Duration::from_millis(1500),
            janitor_interval: Duration::from_secs(600),
            stuck_running_threshold: Duration::from_secs(STUCK_RUNNING_THRESHOLD_SECS),
            incomplete_batch_timeout: Duration::from_secs(INCOMPLETE_BATCH_HOURS * 3600),
            failed_batch_retention: Duration::from_secs(FAILED_BATCH_HOURS * 3600),
            done_job_retention: Duration::from_secs(DONE_JOB_RETENTION_HOURS * 3600),
            clip_retention: Duration::from_secs(CLIP_RETENTION_DAYS * 86400),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            job_timeout: env_secs("WORKER_JOB_TIMEOUT_SECS", default.job_timeout),
            provider_call_timeout: env_secs("WORKER_PROVIDER_CALL_TIMEOUT_SECS", default.provider_call_timeout),
            fast_tick_concurrency: std::env::var("WORKER_FAST_TICK_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.fast_tick_concurrency),
            fast_tick_interval: env_millis("WORKER_FAST_TICK_INTERVAL_MS", default.fast_tick_interval),
            janitor_interval: env_secs("WORKER_JANITOR_INTERVAL_SECS", default.janitor_interval),
            stuck_running_threshold: env_secs(
                "WORKER_STUCK_RUNNING_THRESHOLD_SECS",
                default.stuck_running_threshold,
            ),
            incomplete_batch_timeout: env_secs(
                "WORKER_INCOMPLETE_BATCH_TIMEOUT_SECS",
                default.incomplete_batch_timeout,
            ),
            failed_batch_retention: env_secs("WORKER_FAILED_BATCH_RETENTION_SECS", default.failed_batch_retention),
            done_job_retention: env_secs("WORKER_DONE_JOB_RETENTION_SECS", default.done_job_retention),
            clip_retention: env_secs("WORKER_CLIP_RETENTION_SECS", default.clip_retention),
        }
    }
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).map(Duration::from_secs).unwrap_or(default)
}

fn env_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).map(Duration::from_millis).unwrap_or(default)
}
