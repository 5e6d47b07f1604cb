//! Job: one unit of work claimed and driven by the Worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum claim/dispatch attempts before a job is failed outright.
pub const MAX_ATTEMPTS: u32 = 3;

/// Stage a job dispatches to. `research` is reserved for the
/// researching phase of `angle_test`/`format_test` batches; the core
/// stage machine below (compile through image) drives every clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Compile,
    Tts,
    Video,
    Assemble,
    ImageCompile,
    Image,
    Research,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Tts => "tts",
            Self::Video => "video",
            Self::Assemble => "assemble",
            Self::ImageCompile => "image_compile",
            Self::Image => "image",
            Self::Research => "research",
        }
    }

    /// Jobs that are one-per-batch rather than one-per-clip.
    pub fn is_batch_scoped(&self) -> bool {
        matches!(self, Self::Compile | Self::ImageCompile | Self::Research)
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job lifecycle status. `queued`/`running` are the only non-terminal
/// states; at most one such job may exist per (batch_id, clip_id, type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }
}

/// One unit of dispatchable work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub batch_id: String,
    /// Absent for batch-scoped jobs (compile, image_compile, research).
    pub clip_id: Option<String>,
    pub job_type: JobType,
    pub status: JobStatus,
    pub attempts: u32,
    /// Opaque per-type payload; handlers read only the fields their
    /// stage needs and must tolerate unknown extra fields.
    pub payload: serde_json::Value,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(
        batch_id: impl Into<String>,
        clip_id: Option<String>,
        job_type: JobType,
        payload: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            batch_id: batch_id.into(),
            clip_id,
            job_type,
            status: JobStatus::Queued,
            attempts: 0,
            payload,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Dedup/claim key: at most one open job may exist per this tuple.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.batch_id,
            self.clip_id.as_deref().unwrap_or("-"),
            self.job_type
        )
    }
}

/// Dispatch doorbell pushed onto the queue stream. Carries only enough
/// to look the job up — the Firestore document is the authority on its
/// own state, the stream entry is just a wakeup signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDoorbell {
    pub job_id: String,
    pub batch_id: String,
    pub clip_id: Option<String>,
    pub job_type: JobType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dedup_key_distinguishes_clip_and_type() {
        let a = Job::new("b1", Some("c1".into()), JobType::Tts, json!({}));
        let b = Job::new("b1", Some("c2".into()), JobType::Tts, json!({}));
        let c = Job::new("b1", Some("c1".into()), JobType::Video, json!({}));
        assert_ne!(a.dedup_key(), b.dedup_key());
        assert_ne!(a.dedup_key(), c.dedup_key());
    }

    #[test]
    fn batch_scoped_jobs_have_no_clip() {
        assert!(JobType::Compile.is_batch_scoped());
        assert!(!JobType::Tts.is_batch_scoped());
    }

    #[test]
    fn new_job_starts_queued_zero_attempts() {
        let j = Job::new("b1", None, JobType::Compile, json!({"n": 4}));
        assert_eq!(j.status, JobStatus::Queued);
        assert_eq!(j.attempts, 0);
    }
}
