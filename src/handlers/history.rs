//! Per-account operation history under `/api/history`.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::metered::audio_url;
use crate::auth::Auth;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;
use crate::store::{DailyCount, OperationKind, OperationRecord, PageRequest};

const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_RECENT: u32 = 5;
const MAX_RECENT: u32 = 20;
/// Characters of text shown in the recent-activity widget
const RECENT_TEXT_CHARS: usize = 50;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    /// `tts`, `sts`, `voice_cloning`; absent or `all` lists every kind
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HistoryItem {
    pub id: String,
    pub action: OperationKind,
    pub text: Option<String>,
    pub voice_name: Option<String>,
    pub voice_type: Option<String>,
    pub duration: Option<f64>,
    pub credits_used: u64,
    pub mode: Option<String>,
    pub audio_url: String,
    pub input_size: Option<usize>,
    pub output_size: Option<usize>,
    pub created_at: DateTime<Utc>,
}

impl From<OperationRecord> for HistoryItem {
    fn from(record: OperationRecord) -> Self {
        let detail = record.detail;
        Self {
            audio_url: audio_url(&record.artifact),
            id: record.id,
            action: record.kind,
            text: detail.text,
            voice_name: detail.voice_name,
            voice_type: detail.voice_key,
            duration: detail.duration_seconds,
            credits_used: record.cost,
            mode: detail.mode,
            input_size: detail.input_bytes,
            output_size: detail.output_bytes,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryListResponse {
    pub success: bool,
    pub items: Vec<HistoryItem>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsBody {
    pub tts_generations: u64,
    pub sts_conversions: u64,
    pub voice_cloning: u64,
    pub total_generations: u64,
    pub credits_used: u64,
    pub credits_limit: u64,
    pub credits_remaining: u64,
    pub credits_percentage: f64,
    /// Sum of ledger costs; equals `credits_used` unless an admin reset happened
    pub credits_charged: u64,
    pub recent_activity_7d: u64,
    pub most_used_feature: Option<OperationKind>,
    pub daily_activity: Vec<DailyCount>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: StatsBody,
}

#[derive(Debug, Serialize)]
pub struct RecentItem {
    pub id: String,
    pub action: OperationKind,
    pub text: Option<String>,
    pub voice_name: Option<String>,
    pub audio_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RecentResponse {
    pub success: bool,
    pub items: Vec<RecentItem>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<u64>,
}

fn parse_action(action: Option<&str>) -> AppResult<Option<OperationKind>> {
    match action.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => OperationKind::parse(value)
            .map(Some)
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown action '{value}'"))),
    }
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Percentage with one decimal; zero when there is no limit.
fn credits_percentage(used: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 0.0;
    }
    (used as f64 / limit as f64 * 1000.0).round() / 10.0
}

/// `GET /api/history`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<HistoryListResponse>> {
    let kind = parse_action(query.action.as_deref())?;
    let page = PageRequest::new(
        query.page.unwrap_or(1),
        query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    )
    .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let result = state.history.list(&auth.account_id, kind, page)?;

    Ok(Json(HistoryListResponse {
        success: true,
        items: result.items.into_iter().map(HistoryItem::from).collect(),
        total: result.total,
        page: result.page,
        limit: result.page_size,
        pages: result.pages,
    }))
}

/// `GET /api/history/stats`
pub async fn stats(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
) -> AppResult<Json<StatsResponse>> {
    let account = state
        .accounts
        .find_by_id(&auth.account_id)?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
    let stats = state.history.aggregate_stats(&auth.account_id, Utc::now())?;
    let count = |kind| stats.by_kind.get(&kind).copied().unwrap_or(0);

    Ok(Json(StatsResponse {
        success: true,
        stats: StatsBody {
            tts_generations: count(OperationKind::TextSynthesis),
            sts_conversions: count(OperationKind::VoiceConversion),
            voice_cloning: count(OperationKind::VoiceCloning),
            total_generations: stats.total_operations,
            credits_used: account.credits_used,
            credits_limit: account.credits_limit,
            credits_remaining: account.credits_remaining(),
            credits_percentage: credits_percentage(account.credits_used, account.credits_limit),
            credits_charged: stats.credits_charged,
            recent_activity_7d: stats.recent_7d,
            most_used_feature: stats.most_used,
            daily_activity: stats.daily,
        },
    }))
}

/// `GET /api/history/recent`
pub async fn recent(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Query(query): Query<RecentQuery>,
) -> AppResult<Json<RecentResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT).clamp(1, MAX_RECENT);
    let items = state
        .history
        .recent(&auth.account_id, None, limit)?
        .into_iter()
        .map(|record| RecentItem {
            audio_url: audio_url(&record.artifact),
            id: record.id,
            action: record.kind,
            text: record
                .detail
                .text
                .as_deref()
                .map(|t| shorten(t, RECENT_TEXT_CHARS)),
            voice_name: record.detail.voice_name,
            created_at: record.created_at,
        })
        .collect();

    Ok(Json(RecentResponse {
        success: true,
        items,
    }))
}

/// `DELETE /api/history/{id}`
pub async fn delete_one(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Path(record_id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    if !state.history.delete_one(&auth.account_id, &record_id)? {
        return Err(AppError::NotFound("History item not found".to_string()));
    }
    Ok(Json(DeleteResponse {
        success: true,
        message: "History item deleted".to_string(),
        deleted: None,
    }))
}

/// `DELETE /api/history`
pub async fn delete_all(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
) -> AppResult<Json<DeleteResponse>> {
    let deleted = state.history.delete_all(&auth.account_id)?;
    info!(account_id = %auth.account_id, deleted, "History cleared");

    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Deleted {deleted} history items"),
        deleted: Some(deleted),
    }))
}
