//! Trend research/scraper provider, used only when a batch's mode
//! requires research context before scripting.

use async_trait::async_trait;

use adreel_models::provider::{ResearchRequest, ResearchResponse};

use crate::config::HttpAdapterConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::retry::{with_retry, RetryConfig};

#[async_trait]
pub trait ResearchAdapter: Send + Sync {
    async fn research(&self, req: ResearchRequest) -> ProviderResult<ResearchResponse>;
}

pub struct HttpResearchAdapter {
    config: HttpAdapterConfig,
    client: reqwest::Client,
    retry: RetryConfig,
}

impl HttpResearchAdapter {
    pub fn new(config: HttpAdapterConfig) -> ProviderResult<Self> {
        let client = config
            .client()
            .map_err(|e| ProviderError::Unknown(format!("failed to build http client: {e}")))?;
        Ok(Self { config, client, retry: RetryConfig::default() })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(HttpAdapterConfig::from_env("RESEARCH"))
    }
}

#[async_trait]
impl ResearchAdapter for HttpResearchAdapter {
    async fn research(&self, req: ResearchRequest) -> ProviderResult<ResearchResponse> {
        with_retry(&self.retry, "research.research", || async {
            let response = self
                .client
                .post(format!("{}/research", self.config.base_url))
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

            response
                .json::<ResearchResponse>()
                .await
                .map_err(|e| ProviderError::ProviderPermanent(format!("malformed research response: {e}")))
        })
        .await
    }
}
