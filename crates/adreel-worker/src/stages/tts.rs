//! Per-clip: synthesizes the spoken script into a voice track, uploads
//! it, and chains into a `video` job.

use adreel_models::clip::ClipStatus;
use adreel_models::job::{Job, JobDoorbell, JobType};
use adreel_models::provider::VoiceRequest;
use adreel_store::{ClipPatch, StoreError};
use serde_json::json;

use super::{require_clip_id, StageOutcome};
use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};

pub async fn handle(ctx: &WorkerContext, job: &Job) -> WorkerResult<StageOutcome> {
    let clip_id = require_clip_id(job)?;
    let batch_id = &job.batch_id;

    let clip = ctx
        .store
        .clips
        .get(batch_id, clip_id)
        .await?
        .ok_or_else(|| WorkerError::job_failed(format!("clip {clip_id} not found")))?;

    if clip.status.is_terminal() {
        return Ok(StageOutcome);
    }

    if clip.voice_url.is_none() {
        let batch = ctx
            .store
            .batches
            .get(batch_id)
            .await?
            .ok_or_else(|| WorkerError::job_failed(format!("batch {batch_id} not found")))?;
        let script_spoken = clip
            .script_spoken
            .clone()
            .ok_or_else(|| WorkerError::job_failed("clip missing script_spoken at tts stage"))?;

        let req = VoiceRequest { script_spoken, quality_mode: batch.quality_mode };
        let resp = match tokio::time::timeout(ctx.config.provider_call_timeout, ctx.providers.voice.synthesize(req)).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) if e.is_retryable() => return Err(e.into()),
            Ok(Err(e)) => {
                ctx.store.clips.fail(batch_id, clip_id, e.to_string()).await?;
                return Ok(StageOutcome);
            }
            Err(_) => return Err(WorkerError::timeout("voice provider call timed out")),
        };

        let key = ctx.storage.upload_voice(clip_id, resp.audio, &resp.content_type).await?;
        let patch = ClipPatch { voice_url: Some(key), ..Default::default() };
        ctx.store.clips.advance_clip(batch_id, clip_id, ClipStatus::Scripting, ClipStatus::Vo, patch).await?;
    }

    let target_duration_secs = job.payload.get("target_duration_secs").and_then(|v| v.as_f64()).unwrap_or(15.0);
    let video_job = Job::new(
        batch_id.clone(),
        Some(clip_id.to_string()),
        JobType::Video,
        json!({ "target_duration_secs": target_duration_secs }),
    );
    match ctx.store.jobs.enqueue(video_job).await {
        Ok(enqueued) => {
            ctx.ring(JobDoorbell {
                job_id: enqueued.id,
                batch_id: enqueued.batch_id,
                clip_id: enqueued.clip_id,
                job_type: enqueued.job_type,
            })
            .await;
        }
        Err(StoreError::DuplicateJob(_)) => {}
        Err(e) => return Err(e.into()),
    }

    Ok(StageOutcome)
}
