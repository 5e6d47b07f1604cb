//! Request/response DTOs shared between the Worker and the provider
//! adapter implementations. These are the data shapes that cross the
//! trait boundary in `adreel-providers`; the traits themselves live
//! there since only that crate depends on `reqwest`.

use serde::{Deserialize, Serialize};

use crate::batch::{BatchMode, QualityMode, VideoService};
use crate::clip::OnScreenText;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptRequest {
    pub intent_text: String,
    pub preset_key: String,
    pub mode: BatchMode,
    pub variant_index: u32,
    pub variant_count: u32,
    pub quality_mode: QualityMode,
    pub target_duration_secs: f64,
    /// Findings from the research stage, joined into prose. `None` for
    /// `hook_test` batches, which skip research entirely.
    pub research_ctx: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptResponse {
    pub script_spoken: String,
    pub on_screen_text: Vec<OnScreenText>,
    pub sora_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePromptRequest {
    pub intent_text: String,
    pub preset_key: String,
    pub variant_index: u32,
    pub variant_count: u32,
    pub research_ctx: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePromptResponse {
    pub image_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceRequest {
    pub script_spoken: String,
    pub quality_mode: QualityMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceResponse {
    /// Raw audio bytes, uploaded by the caller to `voice/{clip_id}.mp3`.
    pub audio: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSubmitRequest {
    pub sora_prompt: String,
    pub service: VideoService,
    pub target_duration_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSubmitResponse {
    pub provider_task_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoPollStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoPollResponse {
    pub status: VideoPollStatus,
    /// Present when `status == completed`.
    pub asset_url: Option<String>,
    /// Present when `status == failed`.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkRemovalRequest {
    pub source_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkRemovalResponse {
    pub video: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeRequest {
    pub raw_video_url: String,
    pub voice_url: String,
    pub on_screen_text: Vec<OnScreenText>,
    pub preset_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComposeStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeResponse {
    pub status: ComposeStatus,
    pub final_video: Option<Vec<u8>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerationRequest {
    pub image_prompt: String,
    pub image_pack: Option<String>,
    pub quality_mode: QualityMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerationResponse {
    pub image: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub intent_text: String,
    pub mode: BatchMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResponse {
    pub findings: Vec<String>,
}
