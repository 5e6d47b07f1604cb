//! Shared dependencies every stage handler and janitor pass closes over.

use std::sync::Arc;

use adreel_providers::Providers;
use adreel_queue::JobQueue;
use adreel_storage::R2Client;
use adreel_store::Store;

use crate::config::WorkerConfig;

/// Bundles the Store, provider adapters, object storage client, and the
/// optional doorbell queue into one value handlers and the scheduler
/// thread through. The queue is optional: `claim_next_job` works
/// directly against Store regardless of whether a doorbell fired, so a
/// deployment without Redis loses only the wakeup latency, not
/// correctness.
#[derive(Clone)]
pub struct WorkerContext {
    pub store: Store,
    pub providers: Providers,
    pub storage: R2Client,
    pub queue: Option<Arc<JobQueue>>,
    pub config: WorkerConfig,
}

impl WorkerContext {
    pub fn new(store: Store, providers: Providers, storage: R2Client, queue: Option<Arc<JobQueue>>, config: WorkerConfig) -> Self {
        Self { store, providers, storage, queue, config }
    }

    /// Best-effort doorbell ring after enqueueing a next-stage job. A
    /// missing or unreachable queue must never fail the handler — the
    /// Scheduler's fast tick will pick the job up on its own cadence
    /// regardless.
    pub async fn ring(&self, doorbell: adreel_models::job::JobDoorbell) {
        if let Some(queue) = &self.queue {
            if let Err(e) = queue.ring(adreel_queue::QueueJob::Doorbell(doorbell)).await {
                tracing::debug!(error = %e, "doorbell ring failed, falling back to poll cadence");
            }
        }
    }
}
