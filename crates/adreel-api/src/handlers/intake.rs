//! `POST /generate-batch` — batch intake (spec.md §6).

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use adreel_models::batch::{
    is_valid_batch_size, Batch, BatchMode, BatchStatus, OutputType, QualityMode, VideoService,
};
use adreel_models::clip::Clip;
use adreel_models::job::{Job, JobType};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateBatchRequest {
    #[validate(length(min = 1))]
    pub user_id: String,
    #[validate(length(min = 1))]
    pub intent_text: String,
    #[validate(length(min = 1))]
    pub preset_key: String,
    pub mode: BatchMode,
    pub batch_size: u32,
    pub output_type: OutputType,
    pub quality_mode: QualityMode,
    #[validate(range(min = 1))]
    pub estimated_cost_cents: i64,
    pub video_service: Option<VideoService>,
    pub image_pack: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateBatchResponse {
    pub batch_id: String,
}

/// `angle_test`/`format_test` batches run the researching phase before
/// `compile`/`image_compile`; `hook_test` batches skip straight to
/// compile (spec.md §4.2.1, `stages::research`).
fn needs_research(mode: BatchMode) -> bool {
    matches!(mode, BatchMode::AngleTest | BatchMode::FormatTest)
}

pub async fn generate_batch(
    State(state): State<AppState>,
    Json(req): Json<GenerateBatchRequest>,
) -> ApiResult<Json<GenerateBatchResponse>> {
    req.validate().map_err(|e| ApiError::Validation(e.to_string()))?;
    if !is_valid_batch_size(req.batch_size) {
        return Err(ApiError::Validation(format!(
            "batch_size must be one of 2, 4, 6, 8 (got {})",
            req.batch_size
        )));
    }
    if req.estimated_cost_cents <= 0 {
        return Err(ApiError::Validation("estimated_cost_cents must be positive".into()));
    }
    if req.output_type == OutputType::Video && req.video_service.is_none() {
        return Err(ApiError::Validation("video_service is required for video batches".into()));
    }

    let batch_id = Uuid::new_v4().to_string();

    let mut batch = Batch::new(
        batch_id.clone(),
        req.user_id.clone(),
        req.intent_text,
        req.preset_key,
        req.mode,
        req.batch_size,
        req.output_type,
        req.quality_mode,
        req.estimated_cost_cents,
    );
    if let Some(service) = req.video_service {
        batch = batch.with_video_service(service);
    }
    if let Some(pack) = req.image_pack {
        batch = batch.with_image_pack(pack);
    }

    let clips: Vec<Clip> = (0..req.batch_size)
        .map(|i| {
            Clip::new(
                Uuid::new_v4().to_string(),
                batch_id.clone(),
                Clip::format_variant_id(i),
                batch.preset_key.clone(),
            )
        })
        .collect();

    let root_payload = json!({ "target_duration_secs": 15.0 });
    let root_job = if needs_research(batch.mode) {
        batch.status = BatchStatus::Researching;
        Job::new(batch_id.clone(), None, JobType::Research, root_payload)
    } else {
        batch.status = BatchStatus::Running;
        let job_type = match batch.output_type {
            OutputType::Video => JobType::Compile,
            OutputType::Image => JobType::ImageCompile,
        };
        Job::new(batch_id.clone(), None, job_type, root_payload)
    };

    let output_type_label = match batch.output_type {
        OutputType::Video => "video",
        OutputType::Image => "image",
    };

    state.store.batches.create_batch_with_clips(batch, clips, root_job).await?;
    crate::metrics::record_batch_created(output_type_label);

    Ok(Json(GenerateBatchResponse { batch_id }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_and_format_tests_need_research() {
        assert!(needs_research(BatchMode::AngleTest));
        assert!(needs_research(BatchMode::FormatTest));
        assert!(!needs_research(BatchMode::HookTest));
    }
}
