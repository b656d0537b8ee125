use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::Auth;
use crate::core::{AudioInput, ProviderError, ProviderVoice, provider::detect_audio_format};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;
use crate::store::StoredVoice;

/// Upper bound on samples in one clone request
pub const MAX_CLONE_SAMPLES: usize = 25;

/// Category recorded for voices cloned through this service
const CLONED_CATEGORY: &str = "cloned";

#[derive(Debug, Serialize)]
pub struct ProviderVoicesResponse {
    pub success: bool,
    pub voices: Vec<ProviderVoice>,
}

#[derive(Debug, Serialize)]
pub struct CloneVoiceResponse {
    pub success: bool,
    pub message: String,
    pub voice: StoredVoice,
}

#[derive(Debug, Serialize)]
pub struct DeleteVoiceResponse {
    pub success: bool,
    pub message: String,
}

/// `GET /api/voices`
///
/// Lists voices straight from the provider.
pub async fn list_voices(State(state): State<Arc<AppState>>) -> AppResult<Json<ProviderVoicesResponse>> {
    let voices = state.provider.list_voices().await?;
    Ok(Json(ProviderVoicesResponse {
        success: true,
        voices,
    }))
}

fn malformed(e: impl std::fmt::Display) -> AppError {
    AppError::InvalidInput(format!("Malformed upload: {e}"))
}

/// `POST /api/voices/clone`
///
/// Multipart fields: `name`, optional `description`, and one or more
/// `files` audio samples.
pub async fn clone_voice(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<CloneVoiceResponse>)> {
    let mut name: Option<String> = None;
    let mut description: Option<String> = None;
    let mut samples: Vec<AudioInput> = Vec::new();
    let max_bytes = state.config.metering.max_audio_bytes;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        match field.name() {
            Some("name") => name = Some(field.text().await.map_err(malformed)?),
            Some("description") => description = Some(field.text().await.map_err(malformed)?),
            Some("files") | Some("file") => {
                let file_name = field.file_name().unwrap_or("sample.mp3").to_string();
                let declared = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(malformed)?;

                if bytes.is_empty() {
                    return Err(AppError::InvalidInput(format!("Sample '{file_name}' is empty")));
                }
                if bytes.len() > max_bytes {
                    return Err(AppError::InvalidInput(format!(
                        "Sample '{file_name}' is too large. Max {max_bytes} bytes allowed"
                    )));
                }
                let (detected, _) = detect_audio_format(&bytes);
                let content_type = match declared {
                    Some(ct) if ct.starts_with("audio/") => ct,
                    _ if detected != "application/octet-stream" => detected.to_string(),
                    _ => {
                        return Err(AppError::InvalidInput(
                            "Invalid file type. Please upload an audio file".to_string(),
                        ));
                    }
                };
                samples.push(AudioInput::new(bytes, &file_name, &content_type));
            }
            _ => {}
        }
    }

    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Voice name is required".to_string()))?;
    if samples.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one audio sample is required".to_string(),
        ));
    }
    if samples.len() > MAX_CLONE_SAMPLES {
        return Err(AppError::InvalidInput(format!(
            "At most {MAX_CLONE_SAMPLES} samples are allowed"
        )));
    }
    let description = description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let voice_id = state
        .provider
        .clone_voice(&name, description.as_deref().unwrap_or_default(), &samples)
        .await?;

    let voice = StoredVoice {
        voice_id,
        account_id: auth.account_id.clone(),
        name,
        category: CLONED_CATEGORY.to_string(),
        description,
        created_at: Utc::now(),
    };
    state.voices.save(&voice)?;

    info!(
        account_id = %auth.account_id,
        voice_id = %voice.voice_id,
        samples = samples.len(),
        "Voice cloned"
    );

    Ok((
        StatusCode::CREATED,
        Json(CloneVoiceResponse {
            success: true,
            message: "Voice cloned successfully".to_string(),
            voice,
        }),
    ))
}

/// `DELETE /api/voices/{voice_id}`
///
/// Only voices the caller cloned may be deleted. A voice the provider no
/// longer knows is still removed from the local cache.
pub async fn delete_voice(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Path(voice_id): Path<String>,
) -> AppResult<Json<DeleteVoiceResponse>> {
    if state.voices.find_owned(&auth.account_id, &voice_id)?.is_none() {
        return Err(AppError::NotFound("Voice not found".to_string()));
    }

    match state.provider.delete_voice(&voice_id).await {
        Ok(()) => {}
        Err(ProviderError::Upstream { status: 404, .. }) => {
            warn!(voice_id = %voice_id, "Voice already gone at provider");
        }
        Err(e) => return Err(e.into()),
    }

    state.voices.delete(&auth.account_id, &voice_id)?;
    info!(account_id = %auth.account_id, voice_id = %voice_id, "Voice deleted");

    Ok(Json(DeleteVoiceResponse {
        success: true,
        message: "Voice deleted".to_string(),
    }))
}
