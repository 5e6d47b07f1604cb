//! Compositor: overlays captions/on-screen-text onto the raw clip and
//! muxes the voice track. Internally polls the compositor; this trait's
//! `compose` call honours the caller's overall timeout and returns only
//! the terminal outcome.

use async_trait::async_trait;

use adreel_models::provider::{ComposeRequest, ComposeResponse, ComposeStatus};

use crate::config::HttpAdapterConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::retry::{with_retry, RetryConfig};

#[async_trait]
pub trait ComposeAdapter: Send + Sync {
    async fn compose(&self, req: ComposeRequest) -> ProviderResult<Vec<u8>>;
}

pub struct HttpComposeAdapter {
    config: HttpAdapterConfig,
    client: reqwest::Client,
    retry: RetryConfig,
}

impl HttpComposeAdapter {
    pub fn new(config: HttpAdapterConfig) -> ProviderResult<Self> {
        let client = config
            .client()
            .map_err(|e| ProviderError::Unknown(format!("failed to build http client: {e}")))?;
        Ok(Self { config, client, retry: RetryConfig::default() })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(HttpAdapterConfig::from_env("COMPOSE"))
    }
}

#[async_trait]
impl ComposeAdapter for HttpComposeAdapter {
    async fn compose(&self, req: ComposeRequest) -> ProviderResult<Vec<u8>> {
        with_retry(&self.retry, "compose.compose", || async {
            let response = self
                .client
                .post(format!("{}/compose", self.config.base_url))
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

            let compose: ComposeResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::ProviderPermanent(format!("malformed compose response: {e}")))?;

            match compose.status {
                ComposeStatus::Completed => compose.final_video.ok_or_else(|| {
                    ProviderError::ProviderPermanent("compositor reported completed with no final_video".into())
                }),
                ComposeStatus::Failed => Err(ProviderError::Transient(
                    compose.error.unwrap_or_else(|| "compositor failed".into()),
                )),
                ComposeStatus::Pending => Err(ProviderError::Transient("compositor still pending".into())),
            }
        })
        .await
    }
}
