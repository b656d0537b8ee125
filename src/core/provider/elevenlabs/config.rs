use std::time::Duration;

use crate::config::{DEFAULT_ELEVENLABS_BASE_URL, ProviderConfig};

/// Connection settings for the ElevenLabs REST API
#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub api_key: Option<String>,
    /// Base URL without trailing slash
    pub base_url: String,
    pub timeout: Duration,
    pub synthesis_model: String,
    pub conversion_model: String,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self::from_provider_config(&ProviderConfig::default())
    }
}

impl ElevenLabsConfig {
    pub fn from_provider_config(config: &ProviderConfig) -> Self {
        Self {
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout(),
            synthesis_model: config.synthesis_model.clone(),
            conversion_model: config.conversion_model.clone(),
        }
    }

    /// Point the client at another host, e.g. a mock server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_default_host(&self) -> bool {
        self.base_url == DEFAULT_ELEVENLABS_BASE_URL
    }
}

impl Drop for ElevenLabsConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.api_key {
            key.zeroize();
        }
    }
}
