//! Service-log emission glue between `Worker::run_once` and
//! `adreel_store::ServiceLogRepository`.

use adreel_models::job::Job;
use adreel_models::service_log::{ServiceLogEntry, ServiceLogOutcome};

use crate::context::WorkerContext;

pub async fn log_success(ctx: &WorkerContext, job: &Job, duration_ms: u64, provider: Option<&str>) {
    let mut entry = ServiceLogEntry::new(&job.batch_id, &job.id, job.job_type, ServiceLogOutcome::Success, duration_ms);
    if let Some(p) = provider {
        entry = entry.with_provider(p);
    }
    ctx.store.service_log.append(entry).await;
}

pub async fn log_retried(ctx: &WorkerContext, job: &Job, duration_ms: u64, error: &str) {
    let entry = ServiceLogEntry::new(&job.batch_id, &job.id, job.job_type, ServiceLogOutcome::Retried, duration_ms)
        .with_error(error);
    ctx.store.service_log.append(entry).await;
}

pub async fn log_failed(ctx: &WorkerContext, job: &Job, duration_ms: u64, error: &str) {
    let entry = ServiceLogEntry::new(&job.batch_id, &job.id, job.job_type, ServiceLogOutcome::Failed, duration_ms)
        .with_error(error);
    ctx.store.service_log.append(entry).await;
}
