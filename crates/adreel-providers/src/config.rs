//! Per-adapter HTTP client configuration, grounded on the teacher's
//! `MlClientConfig` shape: a base URL, an API key, and a request timeout,
//! all overridable from the environment.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpAdapterConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl HttpAdapterConfig {
    /// Load a provider's base URL/API key/timeout from environment
    /// variables prefixed with `prefix` (e.g. `SCRIPT` ->
    /// `SCRIPT_PROVIDER_URL`, `SCRIPT_PROVIDER_API_KEY`,
    /// `SCRIPT_PROVIDER_TIMEOUT_SECS`).
    pub fn from_env(prefix: &str) -> Self {
        let base_url = std::env::var(format!("{prefix}_PROVIDER_URL"))
            .unwrap_or_else(|_| format!("http://localhost:9000/{}", prefix.to_lowercase()));
        let api_key = std::env::var(format!("{prefix}_PROVIDER_API_KEY")).unwrap_or_default();
        let timeout_secs: u64 = std::env::var(format!("{prefix}_PROVIDER_TIMEOUT_SECS"))
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Self {
            base_url,
            api_key,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder().timeout(self.timeout).build()
    }
}
