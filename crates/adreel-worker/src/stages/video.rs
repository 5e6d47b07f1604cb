//! Per-clip: async submit/poll against the text-to-video provider.
//!
//! `submit` and `poll` are two separate Worker invocations of the same
//! job. The provider task ID returned by `submit` is persisted onto the
//! job's payload (status stays `running`) rather than carried in
//! memory, so a retry recovers it instead of resubmitting and
//! double-billing the user — see spec.md §9. The job is left `running`
//! between submit and the eventual poll that resolves it; only the
//! Scheduler's stuck-running unstick pass brings it back to `queued` for
//! the next poll attempt (spec.md §4.2.1 / §4.3).

use adreel_models::batch::VideoService;
use adreel_models::clip::ClipStatus;
use adreel_models::job::{Job, JobDoorbell, JobType};
use adreel_models::provider::{VideoPollStatus, VideoSubmitRequest, WatermarkRemovalRequest};
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

    if clip.raw_video_url.is_some() {
        return enqueue_assemble(ctx, batch_id, clip_id).await;
    }

    let batch = ctx
        .store
        .batches
        .get(batch_id)
        .await?
        .ok_or_else(|| WorkerError::job_failed(format!("batch {batch_id} not found")))?;
    let service = batch.video_service.unwrap_or(VideoService::Sora);
    let target_duration_secs = job.payload.get("target_duration_secs").and_then(|v| v.as_f64()).unwrap_or(15.0);

    let provider_task_id = match job.payload.get("provider_task_id").and_then(|v| v.as_str()) {
        Some(id) => id.to_string(),
        None => {
            let sora_prompt = clip
                .sora_prompt
                .clone()
                .ok_or_else(|| WorkerError::job_failed("clip missing sora_prompt at video stage"))?;
            let req = VideoSubmitRequest { sora_prompt, service, target_duration_secs };
            let resp = match tokio::time::timeout(ctx.config.provider_call_timeout, ctx.providers.video.submit(req)).await {
                Ok(Ok(r)) => r,
                Ok(Err(e)) if e.is_retryable() => return Err(e.into()),
                Ok(Err(e)) => {
                    ctx.store.clips.fail(batch_id, clip_id, e.to_string()).await?;
                    return Ok(StageOutcome);
                }
                Err(_) => return Err(WorkerError::timeout("video submit timed out")),
            };

            let mut payload = job.payload.clone();
            payload["provider_task_id"] = json!(resp.provider_task_id);
            ctx.store.jobs.update_payload(job, payload).await?;
            return Err(WorkerError::reschedule("video submitted, awaiting poll"));
        }
    };

    let poll = match tokio::time::timeout(ctx.config.provider_call_timeout, ctx.providers.video.poll(&provider_task_id)).await {
        Ok(Ok(p)) => p,
        Ok(Err(e)) if e.is_retryable() => return Err(e.into()),
        Ok(Err(e)) => {
            ctx.store.clips.fail(batch_id, clip_id, e.to_string()).await?;
            return Ok(StageOutcome);
        }
        Err(_) => return Err(WorkerError::timeout("video poll timed out")),
    };

    match poll.status {
        VideoPollStatus::Pending => Err(WorkerError::reschedule("video still pending")),
        VideoPollStatus::Failed => {
            ctx.store
                .clips
                .fail(batch_id, clip_id, poll.error.unwrap_or_else(|| "video generation failed".into()))
                .await?;
            Ok(StageOutcome)
        }
        VideoPollStatus::Completed => {
            let asset_url = poll
                .asset_url
                .ok_or_else(|| WorkerError::job_failed("completed poll missing asset_url"))?;

            // Sora assets carry a provider watermark; Kling's don't.
            let video_bytes = if service == VideoService::Sora {
                let req = WatermarkRemovalRequest { source_url: asset_url };
                match tokio::time::timeout(ctx.config.provider_call_timeout, ctx.providers.watermark.remove(req)).await {
                    Ok(Ok(r)) => r.video,
                    Ok(Err(e)) if e.is_retryable() => return Err(e.into()),
                    Ok(Err(e)) => {
                        ctx.store.clips.fail(batch_id, clip_id, e.to_string()).await?;
                        return Ok(StageOutcome);
                    }
                    Err(_) => return Err(WorkerError::timeout("watermark removal timed out")),
                }
            } else {
                fetch_asset(&asset_url).await?
            };

            let key = ctx.storage.upload_raw_video(clip_id, video_bytes).await?;
            let patch = ClipPatch { raw_video_url: Some(key), ..Default::default() };
            ctx.store
                .clips
                .advance_clip(batch_id, clip_id, ClipStatus::Vo, ClipStatus::Rendering, patch)
                .await?;

            enqueue_assemble(ctx, batch_id, clip_id).await
        }
    }
}

async fn fetch_asset(url: &str) -> WorkerResult<Vec<u8>> {
    let resp = reqwest::get(url)
        .await
        .map_err(|e| adreel_providers::ProviderError::Transient(format!("failed to fetch video asset: {e}")))?;
    if !resp.status().is_success() {
        return Err(adreel_providers::ProviderError::Transient(format!("video asset fetch returned {}", resp.status())).into());
    }
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| adreel_providers::ProviderError::Transient(format!("failed reading video asset body: {e}")))?;
    Ok(bytes.to_vec())
}

async fn enqueue_assemble(ctx: &WorkerContext, batch_id: &str, clip_id: &str) -> WorkerResult<StageOutcome> {
    let assemble_job = Job::new(batch_id.to_string(), Some(clip_id.to_string()), JobType::Assemble, json!({}));
    match ctx.store.jobs.enqueue(assemble_job).await {
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
