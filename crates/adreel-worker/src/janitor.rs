//! The Scheduler's low-frequency janitor pass (spec.md §4.3): unstick
//! abandoned jobs, harvest terminal failures, time out stale batches,
//! purge ancient failed batches, apply clip retention, and purge old
//! `done` jobs. Every step is safe to run concurrently with the fast
//! tick — each mutation below goes through the same guarded Store
//! primitives a Worker invocation uses, so a janitor pass racing a live
//! handler can only ever lose the race, never corrupt state.

use adreel_models::batch::BatchStatus;
use adreel_models::clip::ClipStatus;

use crate::context::WorkerContext;
use crate::error::WorkerResult;

/// Tally of what one janitor pass did, logged by the caller.
#[derive(Debug, Clone, Default)]
pub struct JanitorReport {
    pub unstuck_jobs: u32,
    pub harvested_failed_jobs: u32,
    pub timed_out_batches: u32,
    pub purged_failed_batches: u32,
    pub retained_clips: u32,
    pub purged_done_jobs: u32,
}

pub async fn run_janitor_pass(ctx: &WorkerContext) -> WorkerResult<JanitorReport> {
    let mut report = JanitorReport::default();

    report.unstuck_jobs = unstick_running_jobs(ctx).await?;
    report.harvested_failed_jobs = harvest_terminal_failed_jobs(ctx).await?;
    report.timed_out_batches = timeout_stale_batches(ctx).await?;
    report.purged_failed_batches = purge_ancient_failed_batches(ctx).await?;
    report.retained_clips = apply_retention(ctx).await?;
    report.purged_done_jobs = purge_old_done_jobs(ctx).await?;

    Ok(report)
}

/// Step 1: jobs `running` past `stuck_running_threshold` are presumed
/// abandoned by a dead worker and re-queued. The threshold is tuned
/// well above any legitimate handler's wall time (spec.md §4.3), so a
/// job genuinely still in flight is never double-picked.
async fn unstick_running_jobs(ctx: &WorkerContext) -> WorkerResult<u32> {
    let threshold = chrono::Duration::from_std(ctx.config.stuck_running_threshold)
        .unwrap_or_else(|_| chrono::Duration::seconds(20 * 60));
    let stuck = ctx.store.jobs.list_stuck_running(threshold).await?;
    let mut n = 0;
    for job in &stuck {
        if ctx.store.jobs.retry_or_fail(job, "reset: stuck job").await.is_ok() {
            n += 1;
        }
    }
    Ok(n)
}

/// Step 2: jobs that a Worker already marked `failed` are deleted, and
/// any clip they were scoped to is force-failed if it hasn't already
/// reached `ready` by some other path.
async fn harvest_terminal_failed_jobs(ctx: &WorkerContext) -> WorkerResult<u32> {
    let failed = ctx.store.jobs.list_terminal_failed().await?;
    let mut n = 0;
    for job in &failed {
        if let Some(clip_id) = &job.clip_id {
            let error = job.error.clone().unwrap_or_else(|| "job failed".to_string());
            let _ = ctx.store.clips.fail(&job.batch_id, clip_id, error).await;
        }
        if ctx.store.jobs.delete(job).await.is_ok() {
            n += 1;
        }
    }
    Ok(n)
}

/// Step 3: a batch stuck `running`/`researching` past
/// `incomplete_batch_timeout` is failed outright, its non-ready clips
/// failed, its open jobs dropped, and its charge refunded down to
/// whatever (if anything) actually reached `ready`.
async fn timeout_stale_batches(ctx: &WorkerContext) -> WorkerResult<u32> {
    let cutoff = chrono::Utc::now() - ctx.config.incomplete_batch_timeout;
    let mut n = 0;
    for status in [BatchStatus::Running, BatchStatus::Researching] {
        let batches = ctx.store.batches.list_by_status(status).await?;
        for batch in &batches {
            if batch.updated_at > cutoff {
                continue;
            }

            let clips = ctx.store.clips.list_by_batch(&batch.id).await?;
            let mut non_ready = 0u32;
            for clip in &clips {
                if clip.status == ClipStatus::Ready {
                    continue;
                }
                if clip.status.is_terminal() {
                    non_ready += 1;
                    continue;
                }
                if ctx.store.clips.fail(&batch.id, &clip.id, "timed out").await? {
                    non_ready += 1;
                }
            }

            let open_jobs = ctx.store.jobs.list_open_by_batch(&batch.id).await?;
            for job in &open_jobs {
                let _ = ctx.store.jobs.delete(job).await;
            }

            if ctx.store.batches.transition(&batch.id, status, BatchStatus::Failed, Some("timed out".into())).await? {
                n += 1;
                if non_ready > 0 {
                    let _ = ctx.store.batches.refund_batch(&batch.id, non_ready).await;
                }
            }
        }
    }
    Ok(n)
}

/// Step 4: `failed` batches older than `failed_batch_retention` are
/// deleted outright (cascading clips and jobs); their storage blobs are
/// removed best-effort, since losing one costs nothing but a little R2
/// clutter.
async fn purge_ancient_failed_batches(ctx: &WorkerContext) -> WorkerResult<u32> {
    let cutoff = chrono::Utc::now() - ctx.config.failed_batch_retention;
    let batches = ctx.store.batches.list_by_status(BatchStatus::Failed).await?;
    let mut n = 0;
    for batch in &batches {
        if batch.updated_at > cutoff {
            continue;
        }
        let clips = ctx.store.clips.list_by_batch(&batch.id).await?;
        for clip in &clips {
            let keys = adreel_storage::all_keys_for_clip(&clip.id);
            let _ = ctx.storage.delete_objects(&keys).await;
        }
        let jobs = ctx.store.jobs.list_open_by_batch(&batch.id).await?;
        for job in &jobs {
            let _ = ctx.store.jobs.delete(job).await;
        }
        if ctx.store.batches.delete(&batch.id).await.is_ok() {
            n += 1;
        }
    }
    Ok(n)
}

/// Step 5: killed clips, or non-winner clips older than
/// `clip_retention`, are soft-deleted and their storage blobs removed.
async fn apply_retention(ctx: &WorkerContext) -> WorkerResult<u32> {
    let candidates = ctx.store.clips.list_retention_candidates(
        chrono::Duration::from_std(ctx.config.clip_retention).unwrap_or_else(|_| chrono::Duration::days(30)),
    ).await?;
    let mut n = 0;
    for clip in &candidates {
        let keys = adreel_storage::all_keys_for_clip(&clip.id);
        let _ = ctx.storage.delete_objects(&keys).await;
        if ctx.store.clips.soft_delete(&clip.batch_id, &clip.id).await.is_ok() {
            n += 1;
        }
    }
    Ok(n)
}

/// Step 6: `done` jobs carry no state anything else depends on; purge
/// them past 1h so collections stay bounded.
async fn purge_old_done_jobs(ctx: &WorkerContext) -> WorkerResult<u32> {
    let threshold = chrono::Duration::from_std(ctx.config.done_job_retention)
        .unwrap_or_else(|_| chrono::Duration::hours(1));
    let old = ctx.store.jobs.list_old_done(threshold).await?;
    let mut n = 0;
    for job in &old {
        if ctx.store.jobs.delete(job).await.is_ok() {
            n += 1;
        }
    }
    Ok(n)
}
