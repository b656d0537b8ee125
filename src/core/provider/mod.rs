//! Outbound voice provider gateway.
//!
//! Each operation is a single request/response against the provider with a
//! bounded timeout. Nothing here retries and nothing keeps local state.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod elevenlabs;

pub use elevenlabs::{ElevenLabsConfig, ElevenLabsProvider};

// =============================================================================
// Error Types
// =============================================================================

/// Provider failures. None of these are retried within a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Non-success HTTP status; `message` is the upstream body verbatim
    #[error("Provider API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Provider request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider request failed: {0}")]
    Transport(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid provider request: {0}")]
    InvalidRequest(String),

    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Upstream HTTP status, when the provider answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Audio supplied by a client
#[derive(Debug, Clone)]
pub struct AudioInput {
    pub bytes: Bytes,
    pub file_name: String,
    pub content_type: String,
}

impl AudioInput {
    pub fn new(bytes: impl Into<Bytes>, file_name: &str, content_type: &str) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Voice rendering parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_speaker_boost: Option<bool>,
}

impl VoiceSettings {
    /// Settings used for text synthesis
    pub const fn synthesis() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            style: None,
            use_speaker_boost: None,
        }
    }

    /// Settings used for speech-to-speech conversion
    pub const fn conversion() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.8,
            style: Some(0.0),
            use_speaker_boost: Some(true),
        }
    }
}

/// A voice as listed by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderVoice {
    pub voice_id: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub preview_url: Option<String>,
}

/// Provider-reported subscription usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionUsage {
    pub tier: String,
    pub character_count: u64,
    pub character_limit: u64,
    /// Unix seconds of the next quota reset
    pub next_reset_unix: Option<i64>,
    pub voice_count: Option<u64>,
    pub voice_limit: Option<u64>,
    pub status: Option<String>,
}

// =============================================================================
// Gateway Trait
// =============================================================================

#[async_trait]
pub trait VoiceProvider: Send + Sync {
    /// Provider key used for pricing lookups, e.g. `"elevenlabs"`
    fn name(&self) -> &'static str;

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        settings: &VoiceSettings,
    ) -> ProviderResult<Bytes>;

    async fn convert(
        &self,
        audio: &AudioInput,
        target_voice_id: &str,
        settings: &VoiceSettings,
    ) -> ProviderResult<Bytes>;

    /// Create a voice from samples; returns the new provider voice id.
    async fn clone_voice(
        &self,
        name: &str,
        description: &str,
        samples: &[AudioInput],
    ) -> ProviderResult<String>;

    async fn list_voices(&self) -> ProviderResult<Vec<ProviderVoice>>;

    async fn delete_voice(&self, voice_id: &str) -> ProviderResult<()>;

    async fn subscription(&self) -> ProviderResult<SubscriptionUsage>;
}

/// Detect the container of an audio sample from its magic bytes.
pub fn detect_audio_format(data: &[u8]) -> (&'static str, &'static str) {
    if data.starts_with(b"ID3") || (data.len() >= 2 && data[0] == 0xFF && (data[1] & 0xE0) == 0xE0)
    {
        return ("audio/mpeg", "mp3");
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WAVE" {
        return ("audio/wav", "wav");
    }
    if data.len() >= 8 && &data[4..8] == b"ftyp" {
        return ("audio/mp4", "m4a");
    }
    if data.starts_with(b"OggS") {
        return ("audio/ogg", "ogg");
    }
    if data.starts_with(b"fLaC") {
        return ("audio/flac", "flac");
    }
    if data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return ("audio/webm", "webm");
    }
    ("application/octet-stream", "bin")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_is_exposed() {
        let err = ProviderError::Upstream {
            status: 401,
            message: "{\"detail\":\"invalid_api_key\"}".to_string(),
        };
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("invalid_api_key"));
        assert_eq!(ProviderError::Transport("reset".into()).status(), None);
    }

    #[test]
    fn detects_common_containers() {
        assert_eq!(detect_audio_format(b"ID3\x04\x00rest").1, "mp3");
        assert_eq!(detect_audio_format(b"RIFF\x24\x00\x00\x00WAVEfmt ").1, "wav");
        assert_eq!(detect_audio_format(b"OggS\x00\x02").1, "ogg");
        assert_eq!(detect_audio_format(b"\x1A\x45\xDF\xA3\x01").1, "webm");
        assert_eq!(detect_audio_format(b"??").0, "application/octet-stream");
    }

    #[test]
    fn conversion_settings_serialize_all_fields() {
        let json = serde_json::to_value(VoiceSettings::conversion()).unwrap();
        assert_eq!(json["use_speaker_boost"], true);
        let json = serde_json::to_value(VoiceSettings::synthesis()).unwrap();
        assert!(json.get("style").is_none());
    }
}
