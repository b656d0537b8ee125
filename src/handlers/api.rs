use axum::{extract::State, response::Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    /// False when no provider API key is configured
    pub provider_configured: bool,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "running",
        service: "voxmeter-gateway",
        version: env!("CARGO_PKG_VERSION"),
        provider_configured: state.config.provider.api_key.is_some(),
    })
}
