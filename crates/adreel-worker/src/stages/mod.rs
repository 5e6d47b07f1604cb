//! One handler per `JobType`, dispatched from `executor::Worker::run_once`.
//!
//! Every handler follows the same idempotent re-entry shape (spec.md
//! §4.2): check whether the artifact this stage produces is already on
//! the clip, call the provider if not, write the artifact, advance the
//! clip's status, enqueue the next stage's job, and return. A handler
//! never marks its own job done or failed — `run_once` does that based
//! on the `Result` it gets back.

mod assemble;
mod compile;
mod image;
mod image_compile;
mod research;
mod tts;
mod video;

use adreel_models::job::{Job, JobType};

use crate::context::WorkerContext;
use crate::error::WorkerResult;

/// Marker returned by a handler that ran to completion. There is
/// deliberately only one variant: a handler that isn't done yet signals
/// that by returning `Err(WorkerError::reschedule(..))` instead, so
/// `run_once` never has to guess which branch means what.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageOutcome;

pub async fn dispatch(ctx: &WorkerContext, job: &Job) -> WorkerResult<StageOutcome> {
    match job.job_type {
        JobType::Compile => compile::handle(ctx, job).await,
        JobType::Tts => tts::handle(ctx, job).await,
        JobType::Video => video::handle(ctx, job).await,
        JobType::Assemble => assemble::handle(ctx, job).await,
        JobType::ImageCompile => image_compile::handle(ctx, job).await,
        JobType::Image => image::handle(ctx, job).await,
        JobType::Research => research::handle(ctx, job).await,
    }
}

/// Clip a batch/clip-scoped job must carry; batch-scoped job types never
/// reach this since they loop over `list_by_batch` themselves.
pub(crate) fn require_clip_id(job: &Job) -> WorkerResult<&str> {
    job.clip_id
        .as_deref()
        .ok_or_else(|| crate::error::WorkerError::job_failed(format!("{} job missing clip_id", job.job_type)))
}
