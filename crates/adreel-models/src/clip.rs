//! Clip: one variant within a batch, driven through its stage machine by
//! the Worker one handler at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::batch::VideoService;

/// On-screen text overlay, timed relative to clip start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnScreenText {
    pub t_seconds: f64,
    pub text: String,
}

/// Per-clip status machine. Video clips pass through `vo`/`rendering`;
/// image clips pass through `generating` instead. Terminal: `ready` or
/// `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipStatus {
    Planned,
    Scripting,
    Vo,
    Rendering,
    Assembling,
    Generating,
    Ready,
    Failed,
}

impl ClipStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }

    /// Whether `next` is a legal forward transition from `self`. Used by
    /// `advance_clip` to refuse regressions; terminal states accept no
    /// further transition at all.
    pub fn can_advance_to(&self, next: ClipStatus) -> bool {
        use ClipStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Planned, Scripting)
                | (Scripting, Vo)
                | (Vo, Rendering)
                | (Rendering, Assembling)
                | (Assembling, Ready)
                | (Scripting, Generating)
                | (Generating, Ready)
                | (_, Failed)
        )
    }
}

/// One variant ("V01".."VN") of a batch's creative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    pub id: String,
    pub batch_id: String,
    pub variant_id: String,
    pub preset_key: String,
    pub status: ClipStatus,
    pub script_spoken: Option<String>,
    pub on_screen_text: Vec<OnScreenText>,
    pub sora_prompt: Option<String>,
    pub voice_url: Option<String>,
    pub raw_video_url: Option<String>,
    pub final_url: Option<String>,
    pub image_url: Option<String>,
    pub image_prompt: Option<String>,
    pub winner: bool,
    pub killed: bool,
    pub provider: Option<String>,
    pub video_service: Option<VideoService>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Clip {
    pub fn new(
        id: impl Into<String>,
        batch_id: impl Into<String>,
        variant_id: impl Into<String>,
        preset_key: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            batch_id: batch_id.into(),
            variant_id: variant_id.into(),
            preset_key: preset_key.into(),
            status: ClipStatus::Planned,
            script_spoken: None,
            on_screen_text: Vec::new(),
            sora_prompt: None,
            voice_url: None,
            raw_video_url: None,
            final_url: None,
            image_url: None,
            image_prompt: None,
            winner: false,
            killed: false,
            provider: None,
            video_service: None,
            error: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Variant index derived from `variant_id` ("V01" -> 0), used when
    /// calling the script provider with (i, N).
    pub fn variant_index(&self) -> Option<u32> {
        self.variant_id
            .strip_prefix('V')
            .and_then(|s| s.parse::<u32>().ok())
            .map(|n| n.saturating_sub(1))
    }

    /// A ready video clip must have voice, raw, and final URLs; a ready
    /// image clip must have an image URL.
    pub fn has_required_ready_urls(&self, output_type: crate::batch::OutputType) -> bool {
        match output_type {
            crate::batch::OutputType::Video => {
                self.voice_url.is_some() && self.raw_video_url.is_some() && self.final_url.is_some()
            }
            crate::batch::OutputType::Image => self.image_url.is_some(),
        }
    }

    pub fn format_variant_id(index: u32) -> String {
        format!("V{:02}", index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_index_parses() {
        let c = Clip::new("c1", "b1", "V03", "preset");
        assert_eq!(c.variant_index(), Some(2));
    }

    #[test]
    fn video_status_machine_forward_only() {
        assert!(ClipStatus::Planned.can_advance_to(ClipStatus::Scripting));
        assert!(ClipStatus::Vo.can_advance_to(ClipStatus::Rendering));
        assert!(!ClipStatus::Rendering.can_advance_to(ClipStatus::Vo));
        assert!(!ClipStatus::Ready.can_advance_to(ClipStatus::Scripting));
    }

    #[test]
    fn image_status_machine_skips_video_stages() {
        assert!(ClipStatus::Scripting.can_advance_to(ClipStatus::Generating));
        assert!(ClipStatus::Generating.can_advance_to(ClipStatus::Ready));
        assert!(!ClipStatus::Generating.can_advance_to(ClipStatus::Vo));
    }

    #[test]
    fn any_status_can_fail() {
        assert!(ClipStatus::Scripting.can_advance_to(ClipStatus::Failed));
        assert!(ClipStatus::Rendering.can_advance_to(ClipStatus::Failed));
    }

    #[test]
    fn format_variant_id_pads() {
        assert_eq!(Clip::format_variant_id(0), "V01");
        assert_eq!(Clip::format_variant_id(9), "V10");
    }
}
