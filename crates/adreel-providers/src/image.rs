//! Still-image generation provider.

use async_trait::async_trait;

use adreel_models::provider::{ImageGenerationRequest, ImageGenerationResponse};

use crate::config::HttpAdapterConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::retry::{with_retry, RetryConfig};

#[async_trait]
pub trait ImageAdapter: Send + Sync {
    async fn generate(&self, req: ImageGenerationRequest) -> ProviderResult<ImageGenerationResponse>;
}

pub struct HttpImageAdapter {
    config: HttpAdapterConfig,
    client: reqwest::Client,
    retry: RetryConfig,
}

impl HttpImageAdapter {
    pub fn new(config: HttpAdapterConfig) -> ProviderResult<Self> {
        let client = config
            .client()
            .map_err(|e| ProviderError::Unknown(format!("failed to build http client: {e}")))?;
        Ok(Self { config, client, retry: RetryConfig::default() })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(HttpAdapterConfig::from_env("IMAGE"))
    }
}

#[async_trait]
impl ImageAdapter for HttpImageAdapter {
    async fn generate(&self, req: ImageGenerationRequest) -> ProviderResult<ImageGenerationResponse> {
        with_retry(&self.retry, "image.generate", || async {
            let response = self
                .client
                .post(format!("{}/generate", self.config.base_url))
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
                .unwrap_or("image/png")
                .to_string();

            let image = response
                .bytes()
                .await
                .map_err(|e| ProviderError::ProviderPermanent(format!("failed reading image body: {e}")))?
                .to_vec();

            if image.is_empty() {
                return Err(ProviderError::ProviderPermanent("image provider returned empty image".into()));
            }

            Ok(ImageGenerationResponse { image, content_type })
        })
        .await
    }
}
