//! ElevenLabs REST client implementing [`VoiceProvider`].
//!
//! Every call is one HTTP request with the `xi-api-key` header. The shared
//! `reqwest::Client` carries the configured timeout, so a hung upstream
//! surfaces as [`ProviderError::Timeout`] instead of blocking the caller.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use super::config::ElevenLabsConfig;
use super::messages::{AddVoiceResponse, SubscriptionResponse, SynthesisRequest, VoicesResponse};
use super::{API_KEY_HEADER, PROVIDER_NAME};
use crate::core::provider::{
    AudioInput, ProviderError, ProviderResult, ProviderVoice, SubscriptionUsage, VoiceProvider,
    VoiceSettings,
};

pub struct ElevenLabsProvider {
    client: reqwest::Client,
    config: ElevenLabsConfig,
}

impl ElevenLabsProvider {
    pub fn new(config: ElevenLabsConfig) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ElevenLabsConfig {
        &self.config
    }

    fn api_key(&self) -> ProviderResult<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("ELEVENLABS_API_KEY is not set".to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ProviderResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
        warn!(status, body = %message, "ElevenLabs returned an error");
        Err(ProviderError::Upstream { status, message })
    }

    async fn send_for_audio(&self, request: reqwest::RequestBuilder) -> ProviderResult<Bytes> {
        let response = self.send(request).await?;
        let audio = response.bytes().await.map_err(|e| self.transport_error(e))?;
        if audio.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "provider returned empty audio".to_string(),
            ));
        }
        Ok(audio)
    }

    fn transport_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.config.timeout)
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

/// Voice ids are placed in URL paths; refuse anything that could change the path.
fn checked_voice_id(voice_id: &str) -> ProviderResult<&str> {
    let valid = !voice_id.is_empty()
        && voice_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(voice_id)
    } else {
        Err(ProviderError::InvalidRequest(format!(
            "invalid voice id: {voice_id:?}"
        )))
    }
}

fn audio_part(input: &AudioInput) -> ProviderResult<Part> {
    Part::bytes(input.bytes.to_vec())
        .file_name(input.file_name.clone())
        .mime_str(&input.content_type)
        .map_err(|e| ProviderError::InvalidRequest(format!("invalid audio content type: {e}")))
}

#[async_trait]
impl VoiceProvider for ElevenLabsProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        settings: &VoiceSettings,
    ) -> ProviderResult<Bytes> {
        let api_key = self.api_key()?;
        let voice_id = checked_voice_id(voice_id)?;
        debug!(voice_id, chars = text.chars().count(), "ElevenLabs synthesis");

        let body = SynthesisRequest {
            text,
            model_id: &self.config.synthesis_model,
            voice_settings: *settings,
        };
        let request = self
            .client
            .post(self.url(&format!("/v1/text-to-speech/{voice_id}")))
            .header(API_KEY_HEADER, api_key)
            .header("Accept", "audio/mpeg")
            .json(&body);

        self.send_for_audio(request).await
    }

    async fn convert(
        &self,
        audio: &AudioInput,
        target_voice_id: &str,
        settings: &VoiceSettings,
    ) -> ProviderResult<Bytes> {
        let api_key = self.api_key()?;
        let voice_id = checked_voice_id(target_voice_id)?;
        debug!(voice_id, bytes = audio.len(), "ElevenLabs speech-to-speech");

        let settings_json = serde_json::to_string(settings)
            .map_err(|e| ProviderError::InvalidRequest(e.to_string()))?;
        let form = Form::new()
            .part("audio", audio_part(audio)?)
            .text("model_id", self.config.conversion_model.clone())
            .text("voice_settings", settings_json);

        let request = self
            .client
            .post(self.url(&format!("/v1/speech-to-speech/{voice_id}/stream")))
            .header(API_KEY_HEADER, api_key)
            .header("Accept", "audio/mpeg")
            .multipart(form);

        self.send_for_audio(request).await
    }

    async fn clone_voice(
        &self,
        name: &str,
        description: &str,
        samples: &[AudioInput],
    ) -> ProviderResult<String> {
        let api_key = self.api_key()?;
        if samples.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "at least one audio sample is required".to_string(),
            ));
        }
        debug!(name, samples = samples.len(), "ElevenLabs voice clone");

        let mut form = Form::new()
            .text("name", name.to_string())
            .text("description", description.to_string());
        for sample in samples {
            form = form.part("files", audio_part(sample)?);
        }

        let request = self
            .client
            .post(self.url("/v1/voices/add"))
            .header(API_KEY_HEADER, api_key)
            .multipart(form);

        let response = self.send(request).await?;
        let created: AddVoiceResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(created.voice_id)
    }

    async fn list_voices(&self) -> ProviderResult<Vec<ProviderVoice>> {
        let api_key = self.api_key()?;
        let request = self
            .client
            .get(self.url("/v1/voices"))
            .header(API_KEY_HEADER, api_key);

        let response = self.send(request).await?;
        let listed: VoicesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(listed.voices.into_iter().map(ProviderVoice::from).collect())
    }

    async fn delete_voice(&self, voice_id: &str) -> ProviderResult<()> {
        let api_key = self.api_key()?;
        let voice_id = checked_voice_id(voice_id)?;
        let request = self
            .client
            .delete(self.url(&format!("/v1/voices/{voice_id}")))
            .header(API_KEY_HEADER, api_key);

        self.send(request).await?;
        Ok(())
    }

    async fn subscription(&self) -> ProviderResult<SubscriptionUsage> {
        let api_key = self.api_key()?;
        let request = self
            .client
            .get(self.url("/v1/user/subscription"))
            .header(API_KEY_HEADER, api_key);

        let response = self.send(request).await?;
        let sub: SubscriptionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(sub.into())
    }
}
