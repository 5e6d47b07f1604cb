//! `POST /cancel` — user-initiated batch cancellation (spec.md §5, §6).

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use adreel_worker::cancel_batch;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub batch_id: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

pub async fn cancel(State(state): State<AppState>, Json(req): Json<CancelRequest>) -> ApiResult<Json<CancelResponse>> {
    let cancelled = cancel_batch(&state.ctx, &req.batch_id).await?;
    if cancelled {
        crate::metrics::record_batch_cancelled();
    }
    Ok(Json(CancelResponse { cancelled }))
}
