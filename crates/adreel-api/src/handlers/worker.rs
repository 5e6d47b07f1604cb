//! `POST /worker` — single dispatch tick, invoked by the Scheduler
//! (spec.md §4.2, §6). The handler itself does not loop; one call is
//! one `Worker::run_once`.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use adreel_worker::{RunOnceResult, Worker};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WorkerRequest {
    pub action: WorkerAction,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkerAction {
    RunOnce,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WorkerResponse {
    Idle { processed: bool },
    Processed { processed: bool, job_id: String, job_type: String, duration_ms: u64 },
    Errored { processed: bool, error: String },
}

impl From<RunOnceResult> for WorkerResponse {
    fn from(result: RunOnceResult) -> Self {
        match result {
            RunOnceResult::Idle => WorkerResponse::Idle { processed: false },
            RunOnceResult::Processed { job_id, job_type, duration_ms } => {
                WorkerResponse::Processed { processed: true, job_id, job_type: job_type.to_string(), duration_ms }
            }
            RunOnceResult::Error { error } => WorkerResponse::Errored { processed: false, error },
        }
    }
}

/// Checks `X-Service-Role-Token` against `config.service_role_token`.
/// No-op when the token isn't configured (development only).
fn check_service_role(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let Some(expected) = &state.config.service_role_token else {
        return Ok(());
    };
    let provided = headers
        .get("X-Service-Role-Token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if provided != expected {
        return Err(ApiError::unauthorized("missing or invalid service-role credential"));
    }
    Ok(())
}

pub async fn worker(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<WorkerRequest>,
) -> ApiResult<Json<WorkerResponse>> {
    check_service_role(&state, &headers)?;

    let WorkerAction::RunOnce = req.action;

    let w = Worker::new((*state.ctx).clone());
    let result = w.run_once().await;
    crate::metrics::record_worker_tick(matches!(result, RunOnceResult::Processed { .. }));
    Ok(Json(result.into()))
}
