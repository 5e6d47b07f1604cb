//! Append-only, non-authoritative telemetry for job dispatch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::job::JobType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceLogEntry {
    pub id: String,
    pub batch_id: String,
    pub job_id: String,
    pub job_type: JobType,
    pub outcome: ServiceLogOutcome,
    pub duration_ms: u64,
    pub provider: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceLogOutcome {
    Success,
    Retried,
    Failed,
}

impl ServiceLogEntry {
    pub fn new(
        batch_id: impl Into<String>,
        job_id: impl Into<String>,
        job_type: JobType,
        outcome: ServiceLogOutcome,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            batch_id: batch_id.into(),
            job_id: job_id.into(),
            job_type,
            outcome,
            duration_ms,
            provider: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}
