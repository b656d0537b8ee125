//! Rendering of metered outcomes into HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::core::{MeteredOutcome, Receipt};
use crate::errors::{AppError, AppResult};

/// Public URL of a stored artifact
pub fn audio_url(artifact_id: &str) -> String {
    format!("/api/audio/{artifact_id}")
}

/// Turn a coordinator outcome into a response.
///
/// Success answers 200 with the receipt plus `extra` fields. A partial
/// failure answers 202 because audio exists but billing did not settle.
/// Everything else becomes an [`AppError`].
pub fn metered_response(
    outcome: MeteredOutcome,
    extra: impl FnOnce(&Receipt) -> Map<String, Value>,
) -> AppResult<Response> {
    match outcome {
        MeteredOutcome::Success(receipt) => {
            let mut body = Map::new();
            body.insert("success".into(), Value::Bool(true));
            body.insert("audio_id".into(), json!(receipt.artifact.id));
            body.insert("audio_url".into(), json!(audio_url(&receipt.artifact.id)));
            body.insert("record_id".into(), json!(receipt.record_id));
            body.insert("kind".into(), json!(receipt.kind));
            body.insert("cost_charged".into(), json!(receipt.cost_charged));
            body.insert("credits_used".into(), json!(receipt.cost_charged));
            body.insert("credits_remaining".into(), json!(receipt.credits_remaining));
            body.insert("output_size".into(), json!(receipt.artifact.size_bytes));
            if let Some(duration) = receipt.detail.duration_seconds {
                body.insert("duration".into(), json!(duration));
            }
            if let Some(length) = receipt.detail.text_length {
                body.insert("text_length".into(), json!(length));
            }
            body.extend(extra(&receipt));
            Ok(Json(Value::Object(body)).into_response())
        }
        MeteredOutcome::InvalidInput(message) => Err(AppError::InvalidInput(message)),
        MeteredOutcome::QuotaExceeded {
            required,
            remaining,
        } => Err(AppError::QuotaExceeded {
            required,
            remaining,
        }),
        MeteredOutcome::ProviderFailure(err) => Err(AppError::Provider(err)),
        MeteredOutcome::PartialFailure {
            kind,
            artifact,
            cost,
            charged,
            stage,
            reason,
        } => {
            warn!(
                kind = %kind,
                cost,
                charged,
                stage = stage.as_str(),
                "Returning partial failure to client"
            );
            let mut body = json!({
                "success": false,
                "generated": true,
                "reconciliation_pending": true,
                "error_kind": "partial_failure",
                "stage": stage,
                "credits_charged": charged,
                "message": format!("Audio was generated but could not be fully recorded: {reason}"),
            });
            if let Some(artifact) = artifact {
                body["audio_id"] = json!(artifact.id);
                body["audio_url"] = json!(audio_url(&artifact.id));
            }
            Ok((StatusCode::ACCEPTED, Json(body)).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CommitStage, ProviderError};
    use crate::store::{ArtifactRef, OperationDetail, OperationKind};
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn receipt() -> Receipt {
        Receipt {
            record_id: "rec-1".to_string(),
            kind: OperationKind::TextSynthesis,
            artifact: ArtifactRef {
                id: "tts_abc.mp3".to_string(),
                size_bytes: 512,
            },
            cost_charged: 12,
            credits_remaining: 88,
            detail: OperationDetail {
                text_length: Some(12),
                duration_seconds: Some(0.8),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn success_body_carries_receipt_and_extras() {
        let response = metered_response(MeteredOutcome::Success(receipt()), |_| {
            let mut extra = Map::new();
            extra.insert("voice".into(), json!("Female Voice 1"));
            extra
        })
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["audio_url"], "/api/audio/tts_abc.mp3");
        assert_eq!(body["cost_charged"], 12);
        assert_eq!(body["credits_remaining"], 88);
        assert_eq!(body["kind"], "tts");
        assert_eq!(body["voice"], "Female Voice 1");
    }

    #[tokio::test]
    async fn partial_failure_is_accepted_with_audio() {
        let outcome = MeteredOutcome::PartialFailure {
            kind: OperationKind::TextSynthesis,
            artifact: Some(ArtifactRef {
                id: "tts_abc.mp3".to_string(),
                size_bytes: 512,
            }),
            cost: 10,
            charged: 0,
            stage: CommitStage::Charge,
            reason: "quota exhausted by concurrent request".to_string(),
        };
        let response = metered_response(outcome, |_| Map::new()).unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["generated"], true);
        assert_eq!(body["reconciliation_pending"], true);
        assert_eq!(body["error_kind"], "partial_failure");
        assert_eq!(body["stage"], "charge");
        assert_eq!(body["audio_url"], "/api/audio/tts_abc.mp3");
    }

    #[test]
    fn failures_become_app_errors() {
        let err = metered_response(
            MeteredOutcome::QuotaExceeded {
                required: 50,
                remaining: 3,
            },
            |_| Map::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "quota_exceeded");

        let err = metered_response(
            MeteredOutcome::ProviderFailure(ProviderError::Transport("reset".into())),
            |_| Map::new(),
        )
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);

        let err = metered_response(MeteredOutcome::InvalidInput("Text is required".into()), |_| {
            Map::new()
        })
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
