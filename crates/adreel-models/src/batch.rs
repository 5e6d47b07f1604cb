//! Batch: one user request, fanning out into N clips.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Requested output medium for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    Video,
    Image,
}

/// What the batch is testing. Named after the creative-testing axis, not
/// a generic "mode" string, so handlers can match on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    HookTest,
    AngleTest,
    FormatTest,
}

/// Generation quality tier. Only {fast, good, better} are modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityMode {
    Fast,
    Good,
    Better,
}

/// Text-to-video provider choice (video batches only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoService {
    Sora,
    Kling,
}

/// Batch lifecycle status. No state may regress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Queued,
    Researching,
    Running,
    Done,
    Failed,
    Cancelled,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Researching => "researching",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// No further Worker or Scheduler activity is expected once terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One user request, fanning out into `batch_size` independent clips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub intent_text: String,
    pub preset_key: String,
    pub mode: BatchMode,
    pub batch_size: u32,
    pub output_type: OutputType,
    pub quality_mode: QualityMode,
    /// Video batches only.
    pub video_service: Option<VideoService>,
    pub image_pack: Option<String>,
    pub status: BatchStatus,
    pub estimated_cost_cents: i64,
    /// What was actually debited at intake.
    pub user_charge_cents: i64,
    /// Set once by `refund_batch`; a second call is a no-op.
    pub refunded: bool,
    pub error: Option<String>,
}

impl Batch {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        intent_text: impl Into<String>,
        preset_key: impl Into<String>,
        mode: BatchMode,
        batch_size: u32,
        output_type: OutputType,
        quality_mode: QualityMode,
        estimated_cost_cents: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            user_id: user_id.into(),
            created_at: now,
            updated_at: now,
            intent_text: intent_text.into(),
            preset_key: preset_key.into(),
            mode,
            batch_size,
            output_type,
            quality_mode,
            video_service: None,
            image_pack: None,
            status: BatchStatus::Queued,
            estimated_cost_cents,
            user_charge_cents: estimated_cost_cents,
            refunded: false,
            error: None,
        }
    }

    pub fn with_video_service(mut self, service: VideoService) -> Self {
        self.video_service = Some(service);
        self
    }

    pub fn with_image_pack(mut self, pack: impl Into<String>) -> Self {
        self.image_pack = Some(pack.into());
        self
    }
}

/// Allowed batch sizes per spec.
pub const VALID_BATCH_SIZES: [u32; 4] = [2, 4, 6, 8];

pub fn is_valid_batch_size(size: u32) -> bool {
    VALID_BATCH_SIZES.contains(&size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_batch_starts_queued_unrefunded() {
        let b = Batch::new(
            "b1", "u1", "make an ad", "default", BatchMode::HookTest, 4,
            OutputType::Video, QualityMode::Good, 400,
        );
        assert_eq!(b.status, BatchStatus::Queued);
        assert!(!b.refunded);
        assert_eq!(b.user_charge_cents, 400);
    }

    #[test]
    fn batch_size_validation() {
        assert!(is_valid_batch_size(2));
        assert!(is_valid_batch_size(8));
        assert!(!is_valid_batch_size(3));
        assert!(!is_valid_batch_size(10));
    }

    #[test]
    fn terminal_statuses() {
        assert!(BatchStatus::Done.is_terminal());
        assert!(BatchStatus::Failed.is_terminal());
        assert!(BatchStatus::Cancelled.is_terminal());
        assert!(!BatchStatus::Running.is_terminal());
    }
}
