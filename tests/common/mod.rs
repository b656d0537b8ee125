//! Shared harness for router-level tests.
//!
//! Builds the full application against a temporary SQLite database, a
//! temporary artifact directory and a wiremock server standing in for
//! ElevenLabs.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::util::ServiceExt;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voxmeter_gateway::auth::{LogResetNotifier, ResetNotifier};
use voxmeter_gateway::core::{ElevenLabsConfig, ElevenLabsProvider};
use voxmeter_gateway::{AppState, ServerConfig, create_app};

pub const ADMIN_KEY: &str = "test-admin-key";
pub const MP3_BYTES: &[u8] = &[0xFF, 0xFB, 0x90, 0x64, 0x00, 0x00, 0x00, 0x00, 0x11, 0x22];
pub const URDU_TEXT: &str = "آج کا دن بہت خوبصورت ہے";

pub struct TestApp {
    pub app: Router,
    pub state: Arc<AppState>,
    pub provider: MockServer,
    _tmp: TempDir,
}

pub struct Reply {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or(Value::Null)
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(configure: impl FnOnce(&mut ServerConfig)) -> Self {
        Self::build(configure, Arc::new(LogResetNotifier)).await
    }

    /// Default configuration with a custom reset token sink.
    pub async fn with_notifier(notifier: Arc<dyn ResetNotifier>) -> Self {
        Self::build(|_| {}, notifier).await
    }

    async fn build(
        configure: impl FnOnce(&mut ServerConfig),
        notifier: Arc<dyn ResetNotifier>,
    ) -> Self {
        let tmp = TempDir::new().unwrap();
        let provider = MockServer::start().await;

        let mut config = ServerConfig::default();
        config.database_path = tmp.path().join("voxmeter.db");
        config.artifact_dir = tmp.path().join("audio");
        config.provider.api_key = Some("test-elevenlabs-key".to_string());
        config.provider.base_url = provider.uri();
        config.provider.request_timeout_seconds = 5;
        config.auth.jwt_secret = "router-test-secret".to_string();
        config.auth.admin_key = Some(ADMIN_KEY.to_string());
        configure(&mut config);

        let client =
            ElevenLabsProvider::new(ElevenLabsConfig::from_provider_config(&config.provider))
                .unwrap();
        let state = AppState::with_collaborators(config, Arc::new(client), notifier)
            .await
            .unwrap();
        let app = create_app(state.clone());

        Self {
            app,
            state,
            provider,
            _tmp: tmp,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        Reply {
            status,
            content_type,
            bytes,
        }
    }

    /// Register an account and return its session token.
    pub async fn signup(&self, email: &str, username: &str) -> String {
        let reply = self
            .send(json_request(
                "POST",
                "/api/auth/signup",
                None,
                json!({ "username": username, "Email": email, "password": "secret123" }),
            ))
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.json());
        reply.json()["token"].as_str().unwrap().to_string()
    }

    /// Answer every synthesis and conversion call with a short MP3.
    pub async fn mount_audio_success(&self) {
        Mock::given(method("POST"))
            .and(path_regex(r"^/v1/(text-to-speech|speech-to-speech)/.+$"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "audio/mpeg")
                    .set_body_bytes(MP3_BYTES),
            )
            .mount(&self.provider)
            .await;
    }

    /// Number of requests the fake provider has seen.
    pub async fn provider_calls(&self) -> usize {
        self.provider
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    pub async fn credits_used(&self, token: &str) -> u64 {
        let reply = self.send(get("/api/auth/me", Some(token))).await;
        assert_eq!(reply.status, StatusCode::OK);
        reply.json()["account"]["credits_used"].as_u64().unwrap()
    }
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    request("GET", uri, token)
}

pub fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// One multipart field
pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

const BOUNDARY: &str = "voxmeter-test-boundary";

pub fn multipart_request(uri: &str, token: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(file_name) = part.file_name {
            disposition.push_str(&format!("; filename=\"{file_name}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap()
}
