//! Provider adapter contracts for every external capability the batch
//! pipeline depends on (script, voice, text-to-video, watermark
//! removal, compose, image, research), plus thin `reqwest`-based HTTP
//! implementations and an in-process fixed-response set for tests.
//!
//! The core (`adreel-worker`) only ever depends on the trait objects in
//! [`Providers`]; concrete wiring (HTTP base URLs, API keys) lives here
//! so the worker crate stays free of provider-specific detail.

pub mod compose;
pub mod config;
pub mod error;
pub mod fixed;
pub mod image;
pub mod research;
pub mod retry;
pub mod script;
pub mod video;
pub mod voice;
pub mod watermark;

pub use compose::{ComposeAdapter, HttpComposeAdapter};
pub use error::{ProviderError, ProviderResult};
pub use image::{HttpImageAdapter, ImageAdapter};
pub use research::{HttpResearchAdapter, ResearchAdapter};
pub use script::{HttpScriptAdapter, ScriptAdapter};
pub use video::{HttpVideoAdapter, VideoAdapter};
pub use voice::{HttpVoiceAdapter, VoiceAdapter};
pub use watermark::{HttpWatermarkRemover, WatermarkRemover};

use std::sync::Arc;

/// Bundles one trait object per adapter, the shape `adreel-worker`'s
/// stage handlers are built against.
#[derive(Clone)]
pub struct Providers {
    pub script: Arc<dyn ScriptAdapter>,
    pub voice: Arc<dyn VoiceAdapter>,
    pub video: Arc<dyn VideoAdapter>,
    pub watermark: Arc<dyn WatermarkRemover>,
    pub compose: Arc<dyn ComposeAdapter>,
    pub image: Arc<dyn ImageAdapter>,
    pub research: Arc<dyn ResearchAdapter>,
}

impl Providers {
    pub fn from_env() -> ProviderResult<Self> {
        Ok(Self {
            script: Arc::new(HttpScriptAdapter::from_env()?),
            voice: Arc::new(HttpVoiceAdapter::from_env()?),
            video: Arc::new(HttpVideoAdapter::from_env()?),
            watermark: Arc::new(HttpWatermarkRemover::from_env()?),
            compose: Arc::new(HttpComposeAdapter::from_env()?),
            image: Arc::new(HttpImageAdapter::from_env()?),
            research: Arc::new(HttpResearchAdapter::from_env()?),
        })
    }
}
