//! Script/copywriting provider: turns a batch's intent into either a
//! spoken script + overlays (video) or a detailed visual prompt (image).

use async_trait::async_trait;
use tracing::{debug, warn};

use adreel_models::provider::{ImagePromptRequest, ImagePromptResponse, ScriptRequest, ScriptResponse};
use adreel_models::timing::{clamp_word_count, latest_overlay_start, TargetDuration};

use crate::config::HttpAdapterConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::retry::{with_retry, RetryConfig};

#[async_trait]
pub trait ScriptAdapter: Send + Sync {
    async fn generate(&self, req: ScriptRequest) -> ProviderResult<ScriptResponse>;
    async fn generate_image_prompt(&self, req: ImagePromptRequest) -> ProviderResult<ImagePromptResponse>;
}

/// Required elements an enhanced visual prompt should name. Used only to
/// score a generated prompt, never to reject one.
const REQUIRED_ELEMENTS: &[&str] = &["subject", "action", "camera", "lighting", "setting", "aspect ratio"];

/// Crude presence-based scorer: each named element contributes evenly to
/// a 0-100 score. Anything below 70 gets a generic enhancement appended.
fn score_visual_prompt(prompt: &str) -> u32 {
    let lower = prompt.to_lowercase();
    let hits = REQUIRED_ELEMENTS.iter().filter(|e| lower.contains(*e)).count();
    ((hits as f64 / REQUIRED_ELEMENTS.len() as f64) * 100.0).round() as u32
}

fn enhance_visual_prompt(prompt: &str) -> String {
    format!(
        "{prompt} — clearly framed subject performing the described action, \
         dynamic camera movement, cinematic lighting, detailed setting, vertical 9:16 aspect ratio"
    )
}

/// Enforce spec.md §6's word-budget and overlay-timing rules on a
/// generated script. Trims overlong scripts and drops/clamps overlays
/// that would run past the safety margin before clip end. Also lifts a
/// weak visual prompt's score by appending the missing required
/// elements, matching `4.4`'s "enhanced in-place if score < 70" rule.
pub fn validate(resp: &mut ScriptResponse, target_duration_secs: f64) {
    let target = if target_duration_secs <= 12.0 {
        TargetDuration::TenSeconds
    } else {
        TargetDuration::FifteenSeconds
    };

    let words: Vec<&str> = resp.script_spoken.split_whitespace().collect();
    let clamped = clamp_word_count(words.len() as u32, target) as usize;
    if clamped < words.len() {
        resp.script_spoken = words[..clamped].join(" ");
        debug!(original = words.len(), clamped, "trimmed script to target-duration word budget");
    }

    let latest_start = latest_overlay_start(target);
    let before = resp.on_screen_text.len();
    resp.on_screen_text.retain(|t| t.t_seconds <= latest_start);
    if resp.on_screen_text.len() < before {
        debug!(dropped = before - resp.on_screen_text.len(), "dropped overlays past safety margin");
    }
    resp.on_screen_text.truncate(adreel_models::timing::MAX_OVERLAYS);

    let score = score_visual_prompt(&resp.sora_prompt);
    if score < 70 {
        warn!(score, "visual prompt missing required elements, enhancing");
        resp.sora_prompt = enhance_visual_prompt(&resp.sora_prompt);
    }
}

pub struct HttpScriptAdapter {
    config: HttpAdapterConfig,
    client: reqwest::Client,
    retry: RetryConfig,
}

impl HttpScriptAdapter {
    pub fn new(config: HttpAdapterConfig) -> ProviderResult<Self> {
        let client = config
            .client()
            .map_err(|e| ProviderError::Unknown(format!("failed to build http client: {e}")))?;
        Ok(Self { config, client, retry: RetryConfig::default() })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(HttpAdapterConfig::from_env("SCRIPT"))
    }
}

#[async_trait]
impl ScriptAdapter for HttpScriptAdapter {
    async fn generate(&self, req: ScriptRequest) -> ProviderResult<ScriptResponse> {
        let target_duration_secs = req.target_duration_secs;
        let mut resp: ScriptResponse = with_retry(&self.retry, "script.generate", || async {
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

            response
                .json::<ScriptResponse>()
                .await
                .map_err(|e| ProviderError::ProviderPermanent(format!("malformed script response: {e}")))
        })
        .await?;

        validate(&mut resp, target_duration_secs);
        Ok(resp)
    }

    async fn generate_image_prompt(&self, req: ImagePromptRequest) -> ProviderResult<ImagePromptResponse> {
        with_retry(&self.retry, "script.generate_image_prompt", || async {
            let response = self
                .client
                .post(format!("{}/generate-image-prompt", self.config.base_url))
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
                .json::<ImagePromptResponse>()
                .await
                .map_err(|e| ProviderError::ProviderPermanent(format!("malformed image prompt response: {e}")))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adreel_models::clip::OnScreenText;

    #[test]
    fn scores_prompt_by_required_elements() {
        let full = "subject action camera lighting setting aspect ratio";
        assert_eq!(score_visual_prompt(full), 100);
        assert_eq!(score_visual_prompt("nothing useful here"), 0);
    }

    #[test]
    fn validate_trims_overlong_script_to_word_cap() {
        let words: Vec<String> = (0..40).map(|i| format!("w{i}")).collect();
        let mut resp = ScriptResponse {
            script_spoken: words.join(" "),
            on_screen_text: vec![],
            sora_prompt: "subject action camera lighting setting aspect ratio".to_string(),
        };
        validate(&mut resp, 10.0);
        assert!(resp.script_spoken.split_whitespace().count() <= 25);
    }

    #[test]
    fn validate_drops_overlays_past_safety_margin() {
        let mut resp = ScriptResponse {
            script_spoken: "a short script".to_string(),
            on_screen_text: vec![
                OnScreenText { t_seconds: 1.0, text: "early".to_string() },
                OnScreenText { t_seconds: 9.9, text: "too late".to_string() },
            ],
            sora_prompt: "subject action camera lighting setting aspect ratio".to_string(),
        };
        validate(&mut resp, 10.0);
        assert_eq!(resp.on_screen_text.len(), 1);
        assert_eq!(resp.on_screen_text[0].text, "early");
    }

    #[test]
    fn validate_enhances_weak_visual_prompt() {
        let mut resp = ScriptResponse {
            script_spoken: "a script".to_string(),
            on_screen_text: vec![],
            sora_prompt: "a coffee cup".to_string(),
        };
        validate(&mut resp, 10.0);
        assert!(resp.sora_prompt.len() > "a coffee cup".len());
    }

    #[tokio::test]
    async fn generate_calls_provider_and_validates_response() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let body = ScriptResponse {
            script_spoken: "a short spoken script".to_string(),
            on_screen_text: vec![OnScreenText { t_seconds: 1.0, text: "hook".to_string() }],
            sora_prompt: "subject action camera lighting setting aspect ratio".to_string(),
        };
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let config = HttpAdapterConfig {
            base_url: server.uri(),
            api_key: "test-key".to_string(),
            timeout: std::time::Duration::from_secs(5),
        };
        let adapter = HttpScriptAdapter::new(config).unwrap();
        let req = ScriptRequest {
            intent_text: "a coffee ad".to_string(),
            preset_key: "default".to_string(),
            mode: adreel_models::batch::BatchMode::HookTest,
            variant_index: 0,
            variant_count: 1,
            quality_mode: adreel_models::batch::QualityMode::Good,
            target_duration_secs: 10.0,
            research_ctx: None,
        };

        let resp = adapter.generate(req).await.unwrap();
        assert_eq!(resp.script_spoken, "a short spoken script");
    }

    #[tokio::test]
    async fn generate_surfaces_provider_error_status() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let config = HttpAdapterConfig {
            base_url: server.uri(),
            api_key: "test-key".to_string(),
            timeout: std::time::Duration::from_secs(5),
        };
        let adapter = HttpScriptAdapter::new(config).unwrap();
        let req = ScriptRequest {
            intent_text: "a coffee ad".to_string(),
            preset_key: "default".to_string(),
            mode: adreel_models::batch::BatchMode::HookTest,
            variant_index: 0,
            variant_count: 1,
            quality_mode: adreel_models::batch::QualityMode::Good,
            target_duration_secs: 10.0,
            research_ctx: None,
        };

        let err = adapter.generate(req).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transient(_)));
    }
}
