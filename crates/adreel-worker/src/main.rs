//! Batch/clip job worker binary: spawns the Scheduler's fast tick and
//! janitor loops against a shared `WorkerContext` and blocks forever.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use adreel_providers::Providers;
use adreel_queue::JobQueue;
use adreel_storage::R2Client;
use adreel_store::Store;
use adreel_worker::{Scheduler, WorkerConfig, WorkerContext};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("adreel=info".parse().unwrap()))
        .init();

    info!("Starting adreel-worker");

    // Load configuration
    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let store = match Store::from_env().await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create store client: {}", e);
            std::process::exit(1);
        }
    };

    let storage = match R2Client::from_env().await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create storage client: {}", e);
            std::process::exit(1);
        }
    };

    let providers = match Providers::from_env() {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to create provider adapters: {}", e);
            std::process::exit(1);
        }
    };

    // The doorbell queue is an optimization, not a correctness
    // dependency (see WorkerContext::ring) — a missing Redis costs
    // wakeup latency, not lost jobs.
    let queue = match JobQueue::from_env() {
        Ok(q) => Some(Arc::new(q)),
        Err(e) => {
            tracing::warn!("Doorbell queue unavailable, falling back to poll cadence only: {}", e);
            None
        }
    };

    let ctx = Arc::new(WorkerContext::new(store, providers, storage, queue, config));
    let scheduler = Scheduler::spawn(ctx);

    // Setup signal handlers
    let shutdown_handle = tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
    });

    tokio::select! {
        _ = scheduler.fast_tick => error!("fast tick loop exited unexpectedly"),
        _ = scheduler.janitor => error!("janitor loop exited unexpectedly"),
        _ = shutdown_handle => {}
    }

    info!("Worker shutdown complete");
}
