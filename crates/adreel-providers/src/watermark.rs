//! Watermark removal. Synchronous, single call, 30s cap enforced by the
//! caller (the Worker wraps this in its per-call timeout).

use async_trait::async_trait;

use adreel_models::provider::{WatermarkRemovalRequest, WatermarkRemovalResponse};

use crate::config::HttpAdapterConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::retry::{with_retry, RetryConfig};

#[async_trait]
pub trait WatermarkRemover: Send + Sync {
    async fn remove(&self, req: WatermarkRemovalRequest) -> ProviderResult<WatermarkRemovalResponse>;
}

pub struct HttpWatermarkRemover {
    config: HttpAdapterConfig,
    client: reqwest::Client,
    retry: RetryConfig,
}

impl HttpWatermarkRemover {
    pub fn new(config: HttpAdapterConfig) -> ProviderResult<Self> {
        let client = config
            .client()
            .map_err(|e| ProviderError::Unknown(format!("failed to build http client: {e}")))?;
        Ok(Self { config, client, retry: RetryConfig::default() })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(HttpAdapterConfig::from_env("WATERMARK"))
    }
}

#[async_trait]
impl WatermarkRemover for HttpWatermarkRemover {
    async fn remove(&self, req: WatermarkRemovalRequest) -> ProviderResult<WatermarkRemovalResponse> {
        with_retry(&self.retry, "watermark.remove", || async {
            let response = self
                .client
                .post(format!("{}/remove", self.config.base_url))
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

            let video = response
                .bytes()
                .await
                .map_err(|e| ProviderError::ProviderPermanent(format!("failed reading video body: {e}")))?
                .to_vec();

            if video.is_empty() {
                return Err(ProviderError::ProviderPermanent("watermark remover returned empty video".into()));
            }

            Ok(WatermarkRemovalResponse { video })
        })
        .await
    }
}
