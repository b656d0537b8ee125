//! Text-to-speech endpoints under `/api/tts`.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Multipart, State},
    response::Response,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use super::metered::metered_response;
use crate::auth::Auth;
use crate::core::{BillableRequest, CatalogVoice, ScriptReport, SynthesisMode};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;
use crate::store::OperationKind;

/// Recent synthesis texts offered back to the user
const RECENT_SUGGESTIONS: u32 = 10;

/// Fixed Urdu phrases offered by the database mode
pub const SUGGESTED_TEXTS: [&str; 8] = [
    "السلام علیکم، میرا نام ورسونا ہے۔",
    "آج کا دن بہت خوبصورت ہے۔",
    "پاکستان زندہ باد!",
    "آپ کا شکریہ۔",
    "خوش آمدید!",
    "اللہ آپ کو خوش رکھے۔",
    "میں آپ کی مدد کیسے کر سکتا ہوں؟",
    "یہ ایک ٹیسٹ پیغام ہے۔",
];

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub text: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub voice_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub success: bool,
    pub is_urdu: bool,
    pub message: &'static str,
    #[serde(flatten)]
    pub report: ScriptReport,
}

#[derive(Debug, Serialize)]
pub struct Suggestion {
    pub id: String,
    pub text: String,
    pub is_recent: bool,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub success: bool,
    pub recent: Vec<Suggestion>,
    pub suggested: Vec<Suggestion>,
}

#[derive(Debug, Serialize)]
pub struct VoiceListResponse<'a> {
    pub success: bool,
    pub voices: Vec<&'a CatalogVoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'a str>,
}

/// Decode an uploaded text file: UTF-8 first, then UTF-16 (BOM-aware,
/// little-endian when unmarked).
pub fn decode_text(bytes: &[u8]) -> Option<String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(text.trim_start_matches('\u{feff}').to_string());
    }
    if bytes.len() % 2 != 0 {
        return None;
    }

    let (big_endian, body) = match bytes {
        [0xFE, 0xFF, rest @ ..] => (true, rest),
        [0xFF, 0xFE, rest @ ..] => (false, rest),
        _ => (false, bytes),
    };
    let units = body.chunks_exact(2).map(|pair| {
        if big_endian {
            u16::from_be_bytes([pair[0], pair[1]])
        } else {
            u16::from_le_bytes([pair[0], pair[1]])
        }
    });
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

fn synthesis_extras(state: &AppState, voice: Option<&str>, mode: SynthesisMode) -> Map<String, Value> {
    let mut extra = Map::new();
    if let Some(preset) = state.catalog.synthesis_voice(voice) {
        extra.insert("voice_id".into(), json!(preset.key));
        extra.insert("voice".into(), json!(preset.name));
    }
    extra.insert("mode".into(), json!(mode.as_str()));
    extra
}

async fn run_synthesis(
    state: Arc<AppState>,
    auth: Auth,
    text: String,
    voice: Option<String>,
    mode: SynthesisMode,
) -> AppResult<Response> {
    let request = BillableRequest::TextSynthesis {
        text,
        voice: voice.clone(),
        mode,
    };
    let outcome = state
        .coordinator
        .clone()
        .execute_detached(auth.account_id, request)
        .await?;

    metered_response(outcome, |_| {
        synthesis_extras(&state, voice.as_deref(), mode)
    })
}

/// `POST /api/tts/generate`
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Json(request): Json<GenerateRequest>,
) -> AppResult<Response> {
    let mode = match request.mode.as_deref() {
        None => SynthesisMode::Manual,
        Some(value) => SynthesisMode::parse(value)
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown mode '{value}'")))?,
    };
    debug!(account_id = %auth.account_id, mode = mode.as_str(), "TTS generate request");

    run_synthesis(state, auth, request.text, request.voice_id, mode).await
}

/// `POST /api/tts/upload`
///
/// Multipart fields: `file` (a `.txt` file) and optional `voice_id`.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut voice: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Malformed upload: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Malformed upload: {e}")))?;
                file = Some((name, bytes.to_vec()));
            }
            Some("voice_id") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Malformed upload: {e}")))?;
                if !value.trim().is_empty() {
                    voice = Some(value);
                }
            }
            _ => {}
        }
    }

    let (name, bytes) =
        file.ok_or_else(|| AppError::InvalidInput("A .txt file is required".to_string()))?;
    if !name.to_ascii_lowercase().ends_with(".txt") {
        return Err(AppError::InvalidInput("Only .txt files are allowed".to_string()));
    }
    let max_bytes = state.config.metering.max_text_upload_bytes;
    if bytes.len() > max_bytes {
        return Err(AppError::InvalidInput(format!(
            "File too large. Max {} bytes allowed",
            max_bytes
        )));
    }

    let text = decode_text(&bytes).ok_or_else(|| {
        AppError::InvalidInput("Could not decode file. Please use UTF-8 encoding".to_string())
    })?;
    if text.trim().is_empty() {
        return Err(AppError::InvalidInput("File is empty".to_string()));
    }

    info!(
        account_id = %auth.account_id,
        file = %name,
        bytes = bytes.len(),
        "TTS upload received"
    );
    run_synthesis(state, auth, text, voice, SynthesisMode::Upload).await
}

/// `POST /api/tts/validate`
///
/// Reports the script ratio of a text without charging anything.
pub async fn validate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ValidateRequest>,
) -> Json<ValidateResponse> {
    let report = state.coordinator.script_filter().report(&request.text);
    Json(ValidateResponse {
        success: true,
        is_urdu: report.accepted,
        message: if report.accepted {
            "متن درست ہے۔"
        } else {
            "متن صرف اردو میں ہونا چاہیے۔"
        },
        report,
    })
}

/// `GET /api/tts/suggestions`
pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
) -> AppResult<Json<SuggestionsResponse>> {
    let recent = state
        .history
        .recent(
            &auth.account_id,
            Some(OperationKind::TextSynthesis),
            RECENT_SUGGESTIONS,
        )?
        .into_iter()
        .filter_map(|record| {
            record.detail.text.map(|text| Suggestion {
                id: record.id,
                text,
                is_recent: true,
            })
        })
        .collect();

    let suggested = SUGGESTED_TEXTS
        .iter()
        .enumerate()
        .map(|(i, text)| Suggestion {
            id: format!("suggested_{i}"),
            text: (*text).to_string(),
            is_recent: false,
        })
        .collect();

    Ok(Json(SuggestionsResponse {
        success: true,
        recent,
        suggested,
    }))
}

/// `GET /api/tts/voices`
pub async fn voices(State(state): State<Arc<AppState>>) -> Json<Value> {
    let response = VoiceListResponse {
        success: true,
        voices: state.catalog.synthesis_voices().iter().collect(),
        default: Some(state.catalog.default_synthesis_key()),
    };
    Json(json!(response))
}
