//! Batch-scoped: generates the script, overlays, and `sora_prompt` for
//! every clip still `planned` in one pass, then chains each clip into
//! its own `tts` job.

use adreel_models::clip::ClipStatus;
use adreel_models::job::{Job, JobDoorbell, JobType};
use adreel_models::provider::ScriptRequest;
use adreel_store::{ClipPatch, StoreError};
use serde_json::json;

use super::StageOutcome;
use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};

pub async fn handle(ctx: &WorkerContext, job: &Job) -> WorkerResult<StageOutcome> {
    let batch_id = &job.batch_id;
    let batch = ctx
        .store
        .batches
        .get(batch_id)
        .await?
        .ok_or_else(|| WorkerError::job_failed(format!("batch {batch_id} not found")))?;

    let target_duration_secs = job.payload.get("target_duration_secs").and_then(|v| v.as_f64()).unwrap_or(15.0);
    let research_ctx = job.payload.get("research_ctx").and_then(|v| v.as_str()).map(str::to_string);

    let clips = ctx.store.clips.list_by_batch(batch_id).await?;

    for clip in clips.iter().filter(|c| c.status == ClipStatus::Planned) {
        let req = ScriptRequest {
            intent_text: batch.intent_text.clone(),
            preset_key: batch.preset_key.clone(),
            mode: batch.mode,
            variant_index: clip.variant_index().unwrap_or(0),
            variant_count: batch.batch_size,
            quality_mode: batch.quality_mode,
            target_duration_secs,
            research_ctx: research_ctx.clone(),
        };

        let resp = match tokio::time::timeout(ctx.config.provider_call_timeout, ctx.providers.script.generate(req)).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) if e.is_retryable() => return Err(e.into()),
            Ok(Err(e)) => {
                ctx.store.clips.fail(batch_id, &clip.id, e.to_string()).await?;
                continue;
            }
            Err(_) => return Err(WorkerError::timeout("script provider call timed out")),
        };

        let patch = ClipPatch {
            script_spoken: Some(resp.script_spoken),
            on_screen_text: Some(resp.on_screen_text),
            sora_prompt: Some(resp.sora_prompt),
            ..Default::default()
        };

        let advanced = ctx
            .store
            .clips
            .advance_clip(batch_id, &clip.id, ClipStatus::Planned, ClipStatus::Scripting, patch)
            .await?;
        if !advanced {
            continue;
        }

        let tts_job = Job::new(
            batch_id.clone(),
            Some(clip.id.clone()),
            JobType::Tts,
            json!({ "target_duration_secs": target_duration_secs }),
        );
        match ctx.store.jobs.enqueue(tts_job).await {
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
    }

    Ok(StageOutcome)
}
