use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, audio, auth, cloning, history, sts, tts, voices};
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router with protected routes
///
/// Note: the bearer authentication middleware is applied by the caller once
/// state is available
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Account
        .route("/api/auth/me", get(auth::me))
        .route(
            "/api/auth/profile",
            put(auth::update_profile).delete(auth::delete_account),
        )
        .route("/api/auth/change-password", post(auth::change_password))
        // Text to speech
        .route("/api/tts/generate", post(tts::generate))
        .route("/api/tts/upload", post(tts::upload))
        .route("/api/tts/validate", post(tts::validate))
        .route("/api/tts/suggestions", get(tts::suggestions))
        .route("/api/tts/voices", get(tts::voices))
        // Speech to speech
        .route("/api/sts/voices", get(sts::voices))
        .route("/api/sts/convert", post(sts::convert))
        // Premium cloned voices
        .route("/api/voice-cloning/voices", get(cloning::voices))
        .route("/api/voice-cloning/generate", post(cloning::generate))
        // Provider voice management
        .route("/api/voices", get(voices::list_voices))
        .route("/api/voices/clone", post(voices::clone_voice))
        .route("/api/voices/{voice_id}", delete(voices::delete_voice))
        // History
        .route(
            "/api/history",
            get(history::list).delete(history::delete_all),
        )
        .route("/api/history/stats", get(history::stats))
        .route("/api/history/recent", get(history::recent))
        .route("/api/history/{id}", delete(history::delete_one))
        .layer(TraceLayer::new_for_http())
}

/// Create the router for endpoints that carry no bearer token
///
/// Admin endpoints check the `admin_key` query parameter themselves.
pub fn create_public_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/audio/{file}", get(audio::serve_audio))
        .route("/api/admin/analytics", get(admin::analytics))
        .route("/api/admin/provider", get(admin::provider))
        .route("/api/admin/usage", get(admin::usage))
        .layer(TraceLayer::new_for_http())
}
