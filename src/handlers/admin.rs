//! Operator endpoints under `/api/admin`, guarded by the configured admin key.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::admin_key_matches;
use crate::core::UsageReport;
use crate::core::analytics::{LocalUsageSection, ProviderSection, Section};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    #[serde(default)]
    pub admin_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SectionResponse<T: Serialize> {
    pub success: bool,
    pub data: Section<T>,
}

fn require_admin(state: &AppState, query: &AdminQuery) -> AppResult<()> {
    let presented = query.admin_key.as_deref().unwrap_or_default();
    if admin_key_matches(state.config.auth.admin_key.as_deref(), presented) {
        return Ok(());
    }
    if !state.config.has_admin_key() {
        warn!("Admin endpoint called but no admin key is configured");
    }
    Err(AppError::Forbidden("Invalid admin key".to_string()))
}

/// `GET /api/admin/analytics`
pub async fn analytics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
) -> AppResult<Json<UsageReport>> {
    require_admin(&state, &query)?;
    info!("Admin usage report requested");
    Ok(Json(state.analytics.report(Utc::now()).await))
}

/// `GET /api/admin/provider`
pub async fn provider(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
) -> AppResult<Json<SectionResponse<ProviderSection>>> {
    require_admin(&state, &query)?;
    let data = state.analytics.provider_section(Utc::now()).await;
    Ok(Json(SectionResponse {
        success: data.ok().is_some(),
        data,
    }))
}

/// `GET /api/admin/usage`
pub async fn usage(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
) -> AppResult<Json<SectionResponse<LocalUsageSection>>> {
    require_admin(&state, &query)?;
    let data = state.analytics.local_usage(Utc::now());
    Ok(Json(SectionResponse {
        success: data.ok().is_some(),
        data,
    }))
}
