use axum::{
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use crate::core::provider::detect_audio_format;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;
use crate::store::is_valid_artifact_id;

/// Serve a stored artifact by file name.
///
/// Names are validated before touching the filesystem, so traversal
/// attempts answer 400 instead of 404.
pub async fn serve_audio(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> AppResult<Response> {
    if !is_valid_artifact_id(&file) {
        return Err(AppError::InvalidInput("Invalid audio file name".to_string()));
    }

    let bytes = state
        .artifacts
        .load(&file)
        .await?
        .ok_or_else(|| AppError::NotFound("Audio file not found".to_string()))?;

    debug!(file = %file, size = bytes.len(), "Serving audio artifact");

    let (mime, _) = detect_audio_format(&bytes);
    let content_type = if mime == "application/octet-stream" {
        "audio/mpeg"
    } else {
        mime
    };

    let mut response = bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, max-age=3600"),
    );
    if let Ok(disposition) = HeaderValue::from_str(&format!("inline; filename=\"{file}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    Ok(response)
}
