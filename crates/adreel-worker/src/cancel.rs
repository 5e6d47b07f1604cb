//! Two-phase batch cancellation (spec.md §5 "Cancellation").
//!
//! Order matters: clips are failed and jobs deleted *before* the batch
//! status flips, so a Worker racing against the cancellation sees its
//! clip already terminal (and its job already gone) by the time it
//! tries its next Store write, and aborts without a further provider
//! call or charge.

use adreel_models::clip::ClipStatus;

use crate::context::WorkerContext;
use crate::error::WorkerResult;

const CANCEL_REASON: &str = "cancelled by user";

/// Cancel a batch: fail its non-ready clips, delete its open jobs,
/// transition the batch to `cancelled`, then refund the clips that
/// were not `ready`. Idempotent — calling this on an already-cancelled
/// batch is a no-op past the first phase.
pub async fn cancel_batch(ctx: &WorkerContext, batch_id: &str) -> WorkerResult<bool> {
    let clips = ctx.store.clips.list_by_batch(batch_id).await?;
    let mut non_ready = 0u32;
    for clip in &clips {
        if clip.status == ClipStatus::Ready {
            continue;
        }
        if clip.status.is_terminal() {
            // Already failed by some other path; still counts toward refund.
            non_ready += 1;
            continue;
        }
        if ctx.store.clips.fail(batch_id, &clip.id, CANCEL_REASON).await? {
            non_ready += 1;
        }
    }

    let open_jobs = ctx.store.jobs.list_open_by_batch(batch_id).await?;
    for job in &open_jobs {
        ctx.store.jobs.delete(job).await?;
    }

    let transitioned = ctx.store.batches.cancel(batch_id).await?;

    if non_ready > 0 {
        ctx.store.batches.refund_batch(batch_id, non_ready).await?;
    }

    Ok(transitioned)
}

#[cfg(test)]
mod tests {
    // `cancel_batch` is exercised end-to-end in
    // `adreel-api`'s cancel-endpoint tests against a fake Store; the
    // ordering invariant above (fail clips + delete jobs before the
    // batch-status flip) has no pure-function surface to unit test here.
}
