//! `Worker::run_once`: claim one job, dispatch it to its stage handler
//! under a wall-clock budget, and resolve the outcome against the job,
//! clip, and batch.

use std::time::Instant;

use adreel_models::clip::Clip;
use adreel_models::job::{Job, JobType, MAX_ATTEMPTS};

use crate::context::WorkerContext;
use crate::error::WorkerError;
use crate::service_log;
use crate::stages;

#[derive(Debug, Clone)]
pub enum RunOnceResult {
    /// No queued job was available to claim.
    Idle,
    Processed { job_id: String, job_type: JobType, duration_ms: u64 },
    Error { error: String },
}

pub struct Worker {
    ctx: WorkerContext,
}

impl Worker {
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx }
    }

    /// Claim the oldest queued job and drive it to completion. Never
    /// panics on a handler error — every failure path is folded into
    /// `RunOnceResult::Error` or a terminal job/clip state, so the
    /// Scheduler's fast tick can call this in a tight loop indefinitely.
    pub async fn run_once(&self) -> RunOnceResult {
        let job = match self.ctx.store.jobs.claim_next_job().await {
            Ok(Some(job)) => job,
            Ok(None) => return RunOnceResult::Idle,
            Err(e) => return RunOnceResult::Error { error: e.to_string() },
        };

        let start = Instant::now();

        if job.attempts > MAX_ATTEMPTS {
            let msg = format!("exceeded {MAX_ATTEMPTS} attempts");
            if let Err(e) = self.ctx.store.jobs.fail_terminal(&job, &msg).await {
                return RunOnceResult::Error { error: e.to_string() };
            }
            self.fail_clip_if_scoped(&job, &msg).await;
            service_log::log_failed(&self.ctx, &job, elapsed_ms(start), &msg).await;
            self.finish_batch(&job).await;
            return RunOnceResult::Processed { job_id: job.id, job_type: job.job_type, duration_ms: elapsed_ms(start) };
        }

        let dispatch = tokio::time::timeout(self.ctx.config.job_timeout, stages::dispatch(&self.ctx, &job));
        let outcome = match dispatch.await {
            Ok(result) => result,
            Err(_) => Err(WorkerError::timeout(format!("job timed out after {:?}", self.ctx.config.job_timeout))),
        };

        let duration_ms = elapsed_ms(start);

        match outcome {
            Ok(_) => {
                if let Err(e) = self.ctx.store.jobs.mark_done(&job).await {
                    return RunOnceResult::Error { error: e.to_string() };
                }
                service_log::log_success(&self.ctx, &job, duration_ms, None).await;
                self.finish_batch(&job).await;
            }
            Err(e) if e.is_reschedule() => {
                // The handler already persisted whatever state it needs
                // (e.g. `provider_task_id`) via `update_payload`; the job
                // itself stays `running` until the janitor's unstick pass
                // re-queues it for the next poll.
                service_log::log_retried(&self.ctx, &job, duration_ms, &e.to_string()).await;
            }
            Err(e) => {
                let msg = e.to_string();
                if e.is_retryable() {
                    match self.ctx.store.jobs.retry_or_fail(&job, &msg).await {
                        Ok(true) => {
                            self.fail_clip_if_scoped(&job, &msg).await;
                            service_log::log_failed(&self.ctx, &job, duration_ms, &msg).await;
                            self.finish_batch(&job).await;
                        }
                        Ok(false) => {
                            service_log::log_retried(&self.ctx, &job, duration_ms, &msg).await;
                        }
                        Err(store_err) => return RunOnceResult::Error { error: store_err.to_string() },
                    }
                } else {
                    if let Err(store_err) = self.ctx.store.jobs.fail_terminal(&job, &msg).await {
                        return RunOnceResult::Error { error: store_err.to_string() };
                    }
                    self.fail_clip_if_scoped(&job, &msg).await;
                    service_log::log_failed(&self.ctx, &job, duration_ms, &msg).await;
                    self.finish_batch(&job).await;
                }
            }
        }

        RunOnceResult::Processed { job_id: job.id, job_type: job.job_type, duration_ms }
    }

    async fn fail_clip_if_scoped(&self, job: &Job, error: &str) {
        if let Some(clip_id) = &job.clip_id {
            if let Err(e) = self.ctx.store.clips.fail(&job.batch_id, clip_id, error).await {
                tracing::warn!(batch_id = %job.batch_id, clip_id, error = %e, "failed to mark clip failed");
            }
        }
    }

    /// `check_batch_complete` + `refund_batch` for any clip-terminal
    /// effect this job may have produced. Safe to call unconditionally:
    /// it only does anything once every clip in the batch is terminal,
    /// and the guarded `transition` underneath converges concurrent
    /// callers on exactly one winner (spec.md §4.2.3).
    async fn finish_batch(&self, job: &Job) {
        let clips = match self.ctx.store.clips.list_by_batch(&job.batch_id).await {
            Ok(clips) => clips,
            Err(e) => {
                tracing::warn!(batch_id = %job.batch_id, error = %e, "failed to list clips for batch completion check");
                return;
            }
        };
        if clips.is_empty() {
            return;
        }

        match self.ctx.store.batches.check_batch_complete(&job.batch_id, &clips).await {
            Ok(Some(_)) => {
                let non_ready = non_ready_count(&clips);
                if non_ready > 0 {
                    if let Err(e) = self.ctx.store.batches.refund_batch(&job.batch_id, non_ready).await {
                        tracing::warn!(batch_id = %job.batch_id, error = %e, "refund_batch failed after batch completion");
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(batch_id = %job.batch_id, error = %e, "check_batch_complete failed");
            }
        }
    }
}

fn non_ready_count(clips: &[Clip]) -> u32 {
    clips.iter().filter(|c| c.status != adreel_models::clip::ClipStatus::Ready).count() as u32
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use adreel_models::clip::ClipStatus;

    fn clip_with_status(id: &str, status: ClipStatus) -> Clip {
        let mut c = Clip::new(id, "b1", "V01", "default");
        c.status = status;
        c
    }

    #[test]
    fn non_ready_count_only_counts_non_ready() {
        let clips = vec![
            clip_with_status("c1", ClipStatus::Ready),
            clip_with_status("c2", ClipStatus::Failed),
            clip_with_status("c3", ClipStatus::Failed),
        ];
        assert_eq!(non_ready_count(&clips), 2);
    }

    #[test]
    fn non_ready_count_zero_when_all_ready() {
        let clips = vec![clip_with_status("c1", ClipStatus::Ready), clip_with_status("c2", ClipStatus::Ready)];
        assert_eq!(non_ready_count(&clips), 0);
    }
}
