//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe). Never touches the
/// Store/Storage/Queue — a slow dependency should show up in
/// readiness, not liveness.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub store: CheckStatus,
    pub storage: CheckStatus,
    pub queue: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(latency_ms: u64) -> Self {
        Self { status: "ok".to_string(), error: None, latency_ms: Some(latency_ms) }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self { status: "error".to_string(), error: Some(msg.into()), latency_ms: None }
    }

    /// The doorbell queue only shortens poll latency (see
    /// `WorkerContext::ring`); its absence is reported but never fails
    /// readiness.
    fn skipped() -> Self {
        Self { status: "skipped".to_string(), error: None, latency_ms: None }
    }
}

/// Readiness check endpoint. Checks Store (Firestore), Storage (R2),
/// and the doorbell Queue (Redis, best-effort only).
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let store_check = {
        let start = Instant::now();
        // "_health_check" is never a real batch id; an `Ok(None)` still
        // proves Firestore answered the request.
        match state.store.batches.get("_health_check").await {
            Ok(_) => CheckStatus::ok(start.elapsed().as_millis() as u64),
            Err(e) => CheckStatus::error(e.to_string()),
        }
    };

    let storage_check = {
        let start = Instant::now();
        match state.ctx.storage.check_connectivity().await {
            Ok(_) => CheckStatus::ok(start.elapsed().as_millis() as u64),
            Err(e) => CheckStatus::error(e.to_string()),
        }
    };

    let queue_check = match &state.ctx.queue {
        Some(queue) => {
            let start = Instant::now();
            match queue.len().await {
                Ok(_) => CheckStatus::ok(start.elapsed().as_millis() as u64),
                Err(e) => CheckStatus::error(e.to_string()),
            }
        }
        None => CheckStatus::skipped(),
    };

    let all_ok = store_check.status == "ok" && storage_check.status == "ok" && queue_check.status != "error";

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks { store: store_check, storage: storage_check, queue: queue_check },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
