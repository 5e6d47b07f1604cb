//! Text-to-speech provider.

use async_trait::async_trait;

use adreel_models::provider::{VoiceRequest, VoiceResponse};

use crate::config::HttpAdapterConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::retry::{with_retry, RetryConfig};

#[async_trait]
pub trait VoiceAdapter: Send + Sync {
    async fn synthesize(&self, req: VoiceRequest) -> ProviderResult<VoiceResponse>;
}

pub struct HttpVoiceAdapter {
    config: HttpAdapterConfig,
    client: reqwest::Client,
    retry: RetryConfig,
}

impl HttpVoiceAdapter {
    pub fn new(config: HttpAdapterConfig) -> ProviderResult<Self> {
        let client = config
            .client()
            .map_err(|e| ProviderError::Unknown(format!("failed to build http client: {e}")))?;
        Ok(Self { config, client, retry: RetryConfig::default() })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(HttpAdapterConfig::from_env("VOICE"))
    }
}

#[async_trait]
impl VoiceAdapter for HttpVoiceAdapter {
    async fn synthesize(&self, req: VoiceRequest) -> ProviderResult<VoiceResponse> {
        with_retry(&self.retry, "voice.synthesize", || async {
            let response = self
                .client
                .post(format!("{}/synthesize", self.config.base_url))
                .bearer_auth(&self.config.api_key)
                .json(&req)
                .send()
                .await
                .map_err(ProviderError::from_reqwest)?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::from_status(status, body));
            }

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("audio/mpeg")
                .to_string();

            let audio = response
                .bytes()
                .await
                .map_err(|e| ProviderError::ProviderPermanent(format!("failed reading audio body: {e}")))?
                .to_vec();

            if audio.is_empty() {
                return Err(ProviderError::ProviderPermanent("voice provider returned empty audio".into()));
            }

            Ok(VoiceResponse { audio, content_type })
        })
        .await
    }
}
