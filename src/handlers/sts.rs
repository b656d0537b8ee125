//! Speech-to-speech endpoints under `/api/sts`.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Multipart, State},
    response::Response,
};
use serde_json::{Map, Value, json};
use tracing::debug;

use super::metered::metered_response;
use crate::auth::Auth;
use crate::core::{AudioInput, BillableRequest, ConversionTarget};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// `GET /api/sts/voices`
pub async fn voices(State(state): State<Arc<AppState>>) -> Json<Value> {
    let voices: Vec<Value> = state
        .catalog
        .conversion_voices()
        .iter()
        .map(|voice| {
            json!({
                "id": voice.key,
                "name": voice.name,
                "description": voice.description,
            })
        })
        .collect();

    Json(json!({
        "success": true,
        "voices": voices,
        "cost": state.coordinator.policy().conversion_cost,
    }))
}

fn malformed(e: impl std::fmt::Display) -> AppError {
    AppError::InvalidInput(format!("Malformed upload: {e}"))
}

/// `POST /api/sts/convert`
///
/// Multipart fields: `audio` (or `file`) and `voice_type` (`male` or `female`).
pub async fn convert(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut audio: Option<AudioInput> = None;
    let mut voice_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        match field.name() {
            Some("audio") | Some("file") => {
                let file_name = field.file_name().unwrap_or("input.mp3").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(malformed)?;
                audio = Some(AudioInput::new(bytes, &file_name, &content_type));
            }
            Some("voice_type") => {
                voice_type = Some(field.text().await.map_err(malformed)?);
            }
            _ => {}
        }
    }

    let target = voice_type
        .as_deref()
        .and_then(ConversionTarget::parse)
        .ok_or_else(|| {
            AppError::InvalidInput("Invalid voice type. Must be 'male' or 'female'".to_string())
        })?;
    let audio =
        audio.ok_or_else(|| AppError::InvalidInput("An audio file is required".to_string()))?;
    let input_size = audio.len();

    debug!(
        account_id = %auth.account_id,
        target = target.as_str(),
        input_size,
        "STS convert request"
    );

    let outcome = state
        .coordinator
        .clone()
        .execute_detached(
            auth.account_id,
            BillableRequest::VoiceConversion { audio, target },
        )
        .await?;

    metered_response(outcome, |receipt| {
        let mut extra = Map::new();
        extra.insert("voice_type".into(), json!(target.as_str()));
        extra.insert("input_size".into(), json!(input_size));
        extra.insert("output_size".into(), json!(receipt.artifact.size_bytes));
        extra
    })
}
