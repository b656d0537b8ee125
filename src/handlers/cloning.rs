//! Premium cloned-voice synthesis under `/api/voice-cloning`.

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::Response};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use super::metered::metered_response;
use crate::auth::Auth;
use crate::core::BillableRequest;
use crate::errors::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CloneGenerateRequest {
    /// Preset key (`mareeb`, `aleeza`, `eiza`) or an owned cloned voice id
    pub voice_id: String,
    pub text: String,
}

/// `GET /api/voice-cloning/voices`
pub async fn voices(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
) -> AppResult<Json<Value>> {
    let presets: Vec<Value> = state
        .catalog
        .cloned_voices()
        .iter()
        .map(|voice| {
            json!({
                "id": voice.key,
                "name": voice.name,
                "description": voice.description,
                "owned": false,
            })
        })
        .collect();

    let owned: Vec<Value> = state
        .voices
        .list_for_account(&auth.account_id)?
        .into_iter()
        .map(|voice| {
            json!({
                "id": voice.voice_id,
                "name": voice.name,
                "description": voice.description.unwrap_or_default(),
                "owned": true,
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "voices": presets,
        "owned_voices": owned,
    })))
}

/// `POST /api/voice-cloning/generate`
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Json(request): Json<CloneGenerateRequest>,
) -> AppResult<Response> {
    // Preset keys are matched case-insensitively; provider ids are not.
    let lowered = request.voice_id.trim().to_lowercase();
    let voice = if state.catalog.cloned_voice(&lowered).is_some() {
        lowered
    } else {
        request.voice_id.trim().to_string()
    };

    debug!(account_id = %auth.account_id, voice = %voice, "Voice cloning generate request");

    let outcome = state
        .coordinator
        .clone()
        .execute_detached(
            auth.account_id,
            BillableRequest::VoiceCloning {
                text: request.text,
                voice: voice.clone(),
            },
        )
        .await?;

    metered_response(outcome, |receipt| {
        let mut extra = Map::new();
        extra.insert("voice_id".into(), json!(voice));
        if let Some(name) = &receipt.detail.voice_name {
            extra.insert("voice".into(), json!(name));
        }
        extra
    })
}
