//! Worker error types.
//!
//! `WorkerError` is the single error surface stage handlers and
//! `Worker::run_once` return. It wraps every lower-layer error
//! (`ProviderError`, `StoreError`, `QueueError`, `StorageError`) and adds
//! the retry/permanent-failure classification `run_once` needs to decide
//! between re-queueing, advancing the clip to `failed`, and refunding.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("job failed: {0}")]
    JobFailed(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("reschedule: {0}")]
    Reschedule(String),

    #[error("provider error: {0}")]
    Provider(#[from] adreel_providers::ProviderError),

    #[error("store error: {0}")]
    Store(#[from] adreel_store::StoreError),

    #[error("storage error: {0}")]
    Storage(#[from] adreel_storage::StorageError),

    #[error("queue error: {0}")]
    Queue(#[from] adreel_queue::QueueError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    /// A wall-clock budget (the 55s per-job timeout or an inner
    /// per-call provider timeout) was exceeded. Treated as transient
    /// per spec.md §7 — retryable up to `MAX_ATTEMPTS`, not an
    /// immediate clip failure.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Used by handlers implementing the analysis-first pattern: the job
    /// cannot proceed yet but isn't broken, so `run_once` should re-ring
    /// the doorbell and leave the clip state untouched.
    pub fn reschedule(msg: impl Into<String>) -> Self {
        Self::Reschedule(msg.into())
    }

    pub fn is_reschedule(&self) -> bool {
        matches!(self, WorkerError::Reschedule(_))
    }

    /// Whether `run_once` should leave the clip `queued`/`running` for a
    /// future attempt (true) or advance it straight to `failed` (false).
    ///
    /// Mirrors `ProviderError::is_retryable` for the provider-call case,
    /// and treats store/queue/storage/io failures as transient
    /// infrastructure hiccups worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Provider(e) => e.is_retryable(),
            WorkerError::Store(_) | WorkerError::Storage(_) | WorkerError::Queue(_) | WorkerError::Io(_) => true,
            WorkerError::Reschedule(_) => true,
            WorkerError::Timeout(_) => true,
            WorkerError::JobFailed(_) | WorkerError::ConfigError(_) => false,
        }
    }
}
