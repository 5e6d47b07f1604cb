//! Per-clip: renders the still image from its prompt. Terminal stage
//! for image clips — `final_url` is set equal to `image_url` so
//! downstream readers don't need to branch on output type to find the
//! delivered asset.

use adreel_models::clip::ClipStatus;
use adreel_models::job::Job;
use adreel_models::provider::ImageGenerationRequest;
use adreel_store::ClipPatch;

use super::{require_clip_id, StageOutcome};
use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};

pub async fn handle(ctx: &WorkerContext, job: &Job) -> WorkerResult<StageOutcome> {
    let clip_id = require_clip_id(job)?;
    let batch_id = &job.batch_id;

    let mut clip = ctx
        .store
        .clips
        .get(batch_id, clip_id)
        .await?
        .ok_or_else(|| WorkerError::job_failed(format!("clip {clip_id} not found")))?;

    if clip.status.is_terminal() {
        return Ok(StageOutcome);
    }

    if clip.status == ClipStatus::Scripting {
        ctx.store
            .clips
            .advance_clip(batch_id, clip_id, ClipStatus::Scripting, ClipStatus::Generating, ClipPatch::default())
            .await?;
        clip.status = ClipStatus::Generating;
    }

    if clip.image_url.is_none() {
        let batch = ctx
            .store
            .batches
            .get(batch_id)
            .await?
            .ok_or_else(|| WorkerError::job_failed(format!("batch {batch_id} not found")))?;
        let image_prompt = clip
            .image_prompt
            .clone()
            .ok_or_else(|| WorkerError::job_failed("clip missing image_prompt at image stage"))?;

        let req = ImageGenerationRequest {
            image_prompt,
            image_pack: batch.image_pack.clone(),
            quality_mode: batch.quality_mode,
        };

        let resp = match tokio::time::timeout(ctx.config.provider_call_timeout, ctx.providers.image.generate(req)).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) if e.is_retryable() => return Err(e.into()),
            Ok(Err(e)) => {
                ctx.store.clips.fail(batch_id, clip_id, e.to_string()).await?;
                return Ok(StageOutcome);
            }
            Err(_) => return Err(WorkerError::timeout("image provider call timed out")),
        };

        let key = ctx.storage.upload_image(clip_id, resp.image, &resp.content_type).await?;
        let patch = ClipPatch { image_url: Some(key.clone()), final_url: Some(key), ..Default::default() };
        ctx.store.clips.advance_clip(batch_id, clip_id, ClipStatus::Generating, ClipStatus::Ready, patch).await?;
    } else {
        ctx.store
            .clips
            .advance_clip(batch_id, clip_id, ClipStatus::Generating, ClipStatus::Ready, ClipPatch::default())
            .await?;
    }

    Ok(StageOutcome)
}
