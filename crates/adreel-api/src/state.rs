//! Application state.

use std::sync::Arc;

use adreel_providers::Providers;
use adreel_queue::JobQueue;
use adreel_storage::R2Client;
use adreel_store::Store;
use adreel_worker::{WorkerConfig, WorkerContext};

use crate::config::ApiConfig;

/// Shared application state. Holds a `WorkerContext` so the `/worker`
/// and `/cancel` handlers can drive `Worker::run_once` and
/// `cancel_batch` in-process rather than re-deriving their own client
/// set.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Store,
    pub ctx: Arc<WorkerContext>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = Store::from_env().await?;
        let storage = R2Client::from_env().await?;
        let providers = Providers::from_env()?;

        // The doorbell queue only shortens poll latency between fast
        // ticks; a missing Redis is not a startup failure.
        let queue = match JobQueue::from_env() {
            Ok(q) => Some(Arc::new(q)),
            Err(e) => {
                tracing::warn!("Doorbell queue unavailable, falling back to poll cadence only: {}", e);
                None
            }
        };

        let worker_config = WorkerConfig::from_env();
        let ctx = Arc::new(WorkerContext::new(store.clone(), providers, storage, queue, worker_config));

        Ok(Self { config, store, ctx })
    }
}
