//! In-process scripted fakes for the adapter traits, used by
//! `adreel-worker`'s and `adreel-api`'s test suites so stage-handler
//! behavior can be exercised without live providers or `wiremock`.
//! Each fake returns a fixed, caller-configured value or error on every
//! call — sufficient for the deterministic scenarios in spec.md §8.

use async_trait::async_trait;
use std::sync::Mutex;

use adreel_models::provider::{
    ComposeRequest, ImageGenerationRequest, ImageGenerationResponse, ImagePromptRequest, ImagePromptResponse,
    ResearchRequest, ResearchResponse, ScriptRequest, ScriptResponse, VideoPollResponse, VideoPollStatus,
    VideoSubmitRequest, VideoSubmitResponse, VoiceRequest, VoiceResponse, WatermarkRemovalRequest,
    WatermarkRemovalResponse,
};

use crate::compose::ComposeAdapter;
use crate::error::{ProviderError, ProviderResult};
use crate::image::ImageAdapter;
use crate::research::ResearchAdapter;
use crate::script::ScriptAdapter;
use crate::video::VideoAdapter;
use crate::voice::VoiceAdapter;
use crate::watermark::WatermarkRemover;

/// Scripted outcome for a single fake adapter call.
pub enum Canned<T> {
    Ok(T),
    Err(ProviderError),
}

pub struct FixedScriptAdapter {
    pub script: Canned<ScriptResponse>,
    pub image_prompt: Canned<ImagePromptResponse>,
}

#[async_trait]
impl ScriptAdapter for FixedScriptAdapter {
    async fn generate(&self, _req: ScriptRequest) -> ProviderResult<ScriptResponse> {
        match &self.script {
            Canned::Ok(r) => Ok(r.clone()),
            Canned::Err(e) => Err(clone_err(e)),
        }
    }

    async fn generate_image_prompt(&self, _req: ImagePromptRequest) -> ProviderResult<ImagePromptResponse> {
        match &self.image_prompt {
            Canned::Ok(r) => Ok(r.clone()),
            Canned::Err(e) => Err(clone_err(e)),
        }
    }
}

pub struct FixedVoiceAdapter {
    pub result: Canned<VoiceResponse>,
}

#[async_trait]
impl VoiceAdapter for FixedVoiceAdapter {
    async fn synthesize(&self, _req: VoiceRequest) -> ProviderResult<VoiceResponse> {
        match &self.result {
            Canned::Ok(r) => Ok(r.clone()),
            Canned::Err(e) => Err(clone_err(e)),
        }
    }
}

/// Scripted video adapter: `submit` always returns `task_id`; each call
/// to `poll` returns the next entry in `poll_sequence` (sticking on the
/// last entry once exhausted) so tests can model a provider that takes
/// several polls to complete.
pub struct FixedVideoAdapter {
    pub task_id: String,
    pub poll_sequence: Vec<VideoPollResponse>,
    next_poll: Mutex<usize>,
}

impl FixedVideoAdapter {
    pub fn new(task_id: impl Into<String>, poll_sequence: Vec<VideoPollResponse>) -> Self {
        Self { task_id: task_id.into(), poll_sequence, next_poll: Mutex::new(0) }
    }

    pub fn immediately_completed(task_id: impl Into<String>, asset_url: impl Into<String>) -> Self {
        Self::new(
            task_id,
            vec![VideoPollResponse { status: VideoPollStatus::Completed, asset_url: Some(asset_url.into()), error: None }],
        )
    }
}

#[async_trait]
impl VideoAdapter for FixedVideoAdapter {
    async fn submit(&self, _req: VideoSubmitRequest) -> ProviderResult<VideoSubmitResponse> {
        Ok(VideoSubmitResponse { provider_task_id: self.task_id.clone() })
    }

    async fn poll(&self, _provider_task_id: &str) -> ProviderResult<VideoPollResponse> {
        let mut idx = self.next_poll.lock().unwrap();
        let i = (*idx).min(self.poll_sequence.len().saturating_sub(1));
        *idx += 1;
        self.poll_sequence
            .get(i)
            .cloned()
            .ok_or_else(|| ProviderError::Unknown("no scripted poll response".into()))
    }
}

pub struct FixedWatermarkRemover {
    pub result: Canned<WatermarkRemovalResponse>,
}

#[async_trait]
impl WatermarkRemover for FixedWatermarkRemover {
    async fn remove(&self, _req: WatermarkRemovalRequest) -> ProviderResult<WatermarkRemovalResponse> {
        match &self.result {
            Canned::Ok(r) => Ok(WatermarkRemovalResponse { video: r.video.clone() }),
            Canned::Err(e) => Err(clone_err(e)),
        }
    }
}

pub struct FixedComposeAdapter {
    pub result: Canned<Vec<u8>>,
}

#[async_trait]
impl ComposeAdapter for FixedComposeAdapter {
    async fn compose(&self, _req: ComposeRequest) -> ProviderResult<Vec<u8>> {
        match &self.result {
            Canned::Ok(r) => Ok(r.clone()),
            Canned::Err(e) => Err(clone_err(e)),
        }
    }
}

pub struct FixedImageAdapter {
    pub result: Canned<ImageGenerationResponse>,
}

#[async_trait]
impl ImageAdapter for FixedImageAdapter {
    async fn generate(&self, _req: ImageGenerationRequest) -> ProviderResult<ImageGenerationResponse> {
        match &self.result {
            Canned::Ok(r) => Ok(r.clone()),
            Canned::Err(e) => Err(clone_err(e)),
        }
    }
}

pub struct FixedResearchAdapter {
    pub result: Canned<ResearchResponse>,
}

#[async_trait]
impl ResearchAdapter for FixedResearchAdapter {
    async fn research(&self, _req: ResearchRequest) -> ProviderResult<ResearchResponse> {
        match &self.result {
            Canned::Ok(r) => Ok(r.clone()),
            Canned::Err(e) => Err(clone_err(e)),
        }
    }
}

fn clone_err(e: &ProviderError) -> ProviderError {
    match e {
        ProviderError::Auth(s) => ProviderError::Auth(s.clone()),
        ProviderError::Validation(s) => ProviderError::Validation(s.clone()),
        ProviderError::Transient(s) => ProviderError::Transient(s.clone()),
        ProviderError::ContentPolicy(s) => ProviderError::ContentPolicy(s.clone()),
        ProviderError::ProviderPermanent(s) => ProviderError::ProviderPermanent(s.clone()),
        ProviderError::Unknown(s) => ProviderError::Unknown(s.clone()),
    }
}
