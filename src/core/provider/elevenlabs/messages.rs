//! ElevenLabs API message types.
//!
//! Request bodies sent to, and response payloads read from, the ElevenLabs
//! REST API. Fields we never read are left out of the response structs.

use serde::{Deserialize, Serialize};

use crate::core::provider::{ProviderVoice, SubscriptionUsage, VoiceSettings};

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /v1/text-to-speech/{voice_id}`
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    pub model_id: &'a str,
    pub voice_settings: VoiceSettings,
}

// =============================================================================
// Responses
// =============================================================================

/// Response of `POST /v1/voices/add`
#[derive(Debug, Clone, Deserialize)]
pub struct AddVoiceResponse {
    pub voice_id: String,
}

/// Response of `GET /v1/voices`
#[derive(Debug, Clone, Deserialize)]
pub struct VoicesResponse {
    #[serde(default)]
    pub voices: Vec<ElevenLabsVoice>,
}

/// One voice entry in the voice list
#[derive(Debug, Clone, Deserialize)]
pub struct ElevenLabsVoice {
    pub voice_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
}

impl From<ElevenLabsVoice> for ProviderVoice {
    fn from(voice: ElevenLabsVoice) -> Self {
        ProviderVoice {
            voice_id: voice.voice_id,
            name: voice.name,
            category: voice.category.unwrap_or_else(|| "premade".to_string()),
            description: voice.description,
            preview_url: voice.preview_url,
        }
    }
}

/// Response of `GET /v1/user/subscription`
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionResponse {
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    pub character_count: u64,
    #[serde(default)]
    pub character_limit: u64,
    #[serde(default)]
    pub next_character_count_reset_unix: Option<i64>,
    #[serde(default)]
    pub voice_add_edit_counter: Option<u64>,
    #[serde(default)]
    pub voice_limit: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
}

impl From<SubscriptionResponse> for SubscriptionUsage {
    fn from(sub: SubscriptionResponse) -> Self {
        SubscriptionUsage {
            tier: sub.tier,
            character_count: sub.character_count,
            character_limit: sub.character_limit,
            next_reset_unix: sub.next_character_count_reset_unix,
            voice_count: sub.voice_add_edit_counter,
            voice_limit: sub.voice_limit,
            status: sub.status,
        }
    }
}
