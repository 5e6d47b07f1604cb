//! Batch-scoped: the researching phase that precedes `compile`/
//! `image_compile` for `angle_test`/`format_test` batches. `hook_test`
//! batches skip this stage entirely — their root job is `compile` or
//! `image_compile` directly.

use adreel_models::batch::{BatchStatus, OutputType};
use adreel_models::job::{Job, JobDoorbell, JobType};
use adreel_models::provider::ResearchRequest;
use adreel_store::StoreError;
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

    let research_ctx = match job.payload.get("research_ctx").and_then(|v| v.as_str()) {
        Some(s) => s.to_string(),
        None => {
            let req = ResearchRequest { intent_text: batch.intent_text.clone(), mode: batch.mode };
            let resp = match tokio::time::timeout(ctx.config.provider_call_timeout, ctx.providers.research.research(req)).await {
                Ok(Ok(resp)) => resp,
                Ok(Err(e)) if e.is_retryable() => return Err(e.into()),
                Ok(Err(e)) => {
                    ctx.store
                        .batches
                        .transition(batch_id, BatchStatus::Researching, BatchStatus::Failed, Some(e.to_string()))
                        .await?;
                    return Ok(StageOutcome);
                }
                Err(_) => return Err(WorkerError::timeout("research provider call timed out")),
            };

            let findings = resp.findings.join(" ");
            let mut payload = job.payload.clone();
            payload["research_ctx"] = json!(findings);
            ctx.store.jobs.update_payload(job, payload).await?;
            findings
        }
    };

    ctx.store.batches.transition(batch_id, BatchStatus::Researching, BatchStatus::Running, None).await?;

    let target_duration_secs = job.payload.get("target_duration_secs").and_then(|v| v.as_f64()).unwrap_or(15.0);
    let next_payload = json!({ "target_duration_secs": target_duration_secs, "research_ctx": research_ctx });
    let next_type = match batch.output_type {
        OutputType::Video => JobType::Compile,
        OutputType::Image => JobType::ImageCompile,
    };
    let next_job = Job::new(batch_id.clone(), None, next_type, next_payload);
    match ctx.store.jobs.enqueue(next_job).await {
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
