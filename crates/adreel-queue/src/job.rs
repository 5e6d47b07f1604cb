//! The one message type pushed onto the dispatch stream.
//!
//! Firestore (`adreel-store`) is the authority on job state; a doorbell
//! is only a wakeup hint so the fast tick doesn't have to poll Firestore
//! continuously. Losing a doorbell is harmless — `claim_next_job`'s
//! collection-group query is the fallback path the Scheduler always has
//! available, which is also how a job reset by the janitor gets noticed
//! again without a fresh doorbell.

use adreel_models::job::JobDoorbell;

/// Wrapper so the stream payload carries a type tag, matching the shape
/// `QueueJob` had in the source project (kept for future job kinds).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueJob {
    Doorbell(JobDoorbell),
}

impl QueueJob {
    pub fn idempotency_key(&self) -> String {
        match self {
            QueueJob::Doorbell(d) => format!(
                "{}:{}:{}",
                d.batch_id,
                d.clip_id.as_deref().unwrap_or("-"),
                d.job_type
            ),
        }
    }

    pub fn job_id(&self) -> &str {
        match self {
            QueueJob::Doorbell(d) => &d.job_id,
        }
    }
}
