//! Per-clip: composites captions + voice onto the raw render and
//! uploads the delivered final video. Terminal stage for video clips —
//! once it lands the clip on `ready` there is no further job to chain;
//! `check_batch_complete_and_refund` takes over from there.

use std::time::Duration;

use adreel_models::clip::ClipStatus;
use adreel_models::job::Job;
use adreel_models::provider::ComposeRequest;
use adreel_store::ClipPatch;

use super::{require_clip_id, StageOutcome};
use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};

const PRESIGN_TTL: Duration = Duration::from_secs(3600);

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

    if clip.status == ClipStatus::Rendering {
        ctx.store
            .clips
            .advance_clip(batch_id, clip_id, ClipStatus::Rendering, ClipStatus::Assembling, ClipPatch::default())
            .await?;
        clip.status = ClipStatus::Assembling;
    }

    if clip.final_url.is_none() {
        let raw_key = clip
            .raw_video_url
            .clone()
            .ok_or_else(|| WorkerError::job_failed("clip missing raw_video_url at assemble stage"))?;
        let voice_key = clip
            .voice_url
            .clone()
            .ok_or_else(|| WorkerError::job_failed("clip missing voice_url at assemble stage"))?;

        let raw_video_url = ctx.storage.presign_get(&raw_key, PRESIGN_TTL).await?;
        let voice_url = ctx.storage.presign_get(&voice_key, PRESIGN_TTL).await?;

        let req = ComposeRequest {
            raw_video_url,
            voice_url,
            on_screen_text: clip.on_screen_text.clone(),
            preset_key: clip.preset_key.clone(),
        };

        let final_video = match tokio::time::timeout(ctx.config.provider_call_timeout, ctx.providers.compose.compose(req)).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) if e.is_retryable() => return Err(e.into()),
            Ok(Err(e)) => {
                ctx.store.clips.fail(batch_id, clip_id, e.to_string()).await?;
                return Ok(StageOutcome);
            }
            Err(_) => return Err(WorkerError::timeout("assemble provider call timed out")),
        };

        let key = ctx.storage.upload_final_video(clip_id, final_video).await?;
        let patch = ClipPatch { final_url: Some(key), ..Default::default() };
        ctx.store.clips.advance_clip(batch_id, clip_id, ClipStatus::Assembling, ClipStatus::Ready, patch).await?;
    } else {
        ctx.store
            .clips
            .advance_clip(batch_id, clip_id, ClipStatus::Assembling, ClipStatus::Ready, ClipPatch::default())
            .await?;
    }

    Ok(StageOutcome)
}
