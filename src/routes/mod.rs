pub mod api;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderName, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
};
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
};
use tracing::info;

use crate::handlers;
use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Multipart framing on top of the largest accepted upload
const BODY_LIMIT_HEADROOM: usize = 64 * 1024;

const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Build the CORS layer from the configured origins.
///
/// `*` allows any origin without credentials, a comma-separated list allows
/// those origins with credentials, and `None` keeps the browser's same-origin
/// policy.
pub fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let allowed_headers = [
        AUTHORIZATION,
        CONTENT_TYPE,
        HeaderName::from_static("x-admin-key"),
    ];

    match origins {
        Some("*") => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(ALLOWED_METHODS)
            .allow_headers(allowed_headers)
            .allow_credentials(false),
        Some(origins) => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(ALLOWED_METHODS)
                .allow_headers(allowed_headers)
                .allow_credentials(true)
        }
        None => {
            info!(
                "CORS not configured, defaulting to same-origin only. \
                 Set CORS_ALLOWED_ORIGINS to enable cross-origin access."
            );
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(allowed_headers)
                .allow_credentials(false)
        }
    }
}

/// Assemble the full application: public routes, bearer-protected routes,
/// body limits, CORS and security headers.
///
/// Rate limiting needs the peer address and is layered on by the binary.
pub fn create_app(state: Arc<AppState>) -> Router {
    let body_limit = state
        .config
        .metering
        .max_audio_bytes
        .max(state.config.metering.max_text_upload_bytes)
        + BODY_LIMIT_HEADROOM;

    let protected_routes = api::create_api_router().layer(middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    let public_routes = Router::new()
        .route("/", axum::routing::get(handlers::api::health_check))
        .merge(api::create_public_api_router());

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            http::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            http::HeaderValue::from_static("DENY"),
        ));

    let cors = cors_layer(state.config.cors_allowed_origins.as_deref());

    public_routes
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(cors)
        .layer(security_headers)
}
