//! `GET /batches/:batch_id` — read-back of a batch and its clips.
//!
//! Not one of spec.md §6's three mutating endpoints, but the control
//! plane has to expose *some* way to observe the outcome of an intake —
//! without it the API is write-only. Grounded in the teacher's
//! `GET /videos/:video_id` read handler.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use adreel_models::batch::Batch;
use adreel_models::clip::Clip;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub batch: Batch,
    pub clips: Vec<Clip>,
}

pub async fn get_batch(State(state): State<AppState>, Path(batch_id): Path<String>) -> ApiResult<Json<BatchResponse>> {
    let batch = state
        .store
        .batches
        .get(&batch_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("batch {batch_id} not found")))?;
    let clips = state.store.clips.list_by_batch(&batch_id).await?;
    Ok(Json(BatchResponse { batch, clips }))
}
