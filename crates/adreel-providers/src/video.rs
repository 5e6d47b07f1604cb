//! Text-to-video provider. Async by contract: `submit` returns a
//! provider task ID immediately, `poll` is called by a later Worker
//! invocation until the task resolves. Retry of the `video` handler
//! must recover the task ID from the job payload rather than
//! resubmitting, or it would double-bill the user — see spec.md §9.

use async_trait::async_trait;

use adreel_models::provider::{VideoPollResponse, VideoPollStatus, VideoSubmitRequest, VideoSubmitResponse};

use crate::config::HttpAdapterConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::retry::{with_retry, RetryConfig};

#[async_trait]
pub trait VideoAdapter: Send + Sync {
    async fn submit(&self, req: VideoSubmitRequest) -> ProviderResult<VideoSubmitResponse>;
    async fn poll(&self, provider_task_id: &str) -> ProviderResult<VideoPollResponse>;
}

pub struct HttpVideoAdapter {
    config: HttpAdapterConfig,
    client: reqwest::Client,
    retry: RetryConfig,
}

impl HttpVideoAdapter {
    pub fn new(config: HttpAdapterConfig) -> ProviderResult<Self> {
        let client = config
            .client()
            .map_err(|e| ProviderError::Unknown(format!("failed to build http client: {e}")))?;
        Ok(Self { config, client, retry: RetryConfig::default() })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(HttpAdapterConfig::from_env("VIDEO"))
    }
}

#[async_trait]
impl VideoAdapter for HttpVideoAdapter {
    async fn submit(&self, req: VideoSubmitRequest) -> ProviderResult<VideoSubmitResponse> {
        with_retry(&self.retry, "video.submit", || async {
            let response = self
                .client
                .post(format!("{}/submit", self.config.base_url))
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
                .json::<VideoSubmitResponse>()
                .await
                .map_err(|e| ProviderError::ProviderPermanent(format!("malformed submit response: {e}")))
        })
        .await
    }

    async fn poll(&self, provider_task_id: &str) -> ProviderResult<VideoPollResponse> {
        with_retry(&self.retry, "video.poll", || async {
            let response = self
                .client
                .get(format!("{}/status/{}", self.config.base_url, provider_task_id))
                .bearer_auth(&self.config.api_key)
                .send()
                .await
                .map_err(ProviderError::from_reqwest)?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::from_status(status, body));
            }

            let poll: VideoPollResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::ProviderPermanent(format!("malformed poll response: {e}")))?;

            if poll.status == VideoPollStatus::Completed && poll.asset_url.is_none() {
                return Err(ProviderError::ProviderPermanent(
                    "video provider reported completed with no asset_url".into(),
                ));
            }

            Ok(poll)
        })
        .await
    }
}
