//! ElevenLabs client against a wiremock server.
//!
//! Run: cargo test --test elevenlabs_provider_tests

use std::time::Duration;

use serde_json::json;
use voxmeter_gateway::core::{
    AudioInput, ElevenLabsConfig, ElevenLabsProvider, ProviderError, VoiceProvider, VoiceSettings,
};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-elevenlabs-key";
const MP3_FRAME: &[u8] = &[0xFF, 0xFB, 0x90, 0x64, 0x00, 0x00, 0x00, 0x00];

fn provider_for(server: &MockServer) -> ElevenLabsProvider {
    let config = ElevenLabsConfig::default()
        .with_base_url(&server.uri())
        .with_api_key(API_KEY)
        .with_timeout(Duration::from_secs(5));
    ElevenLabsProvider::new(config).unwrap()
}

#[tokio::test]
async fn synthesize_posts_model_and_settings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/21m00Tcm4TlvDq8ikWAM"))
        .and(header("xi-api-key", API_KEY))
        .and(body_partial_json(json!({
            "text": "السلام علیکم",
            "model_id": "eleven_multilingual_v2",
            "voice_settings": { "stability": 0.5, "similarity_boost": 0.75 }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .set_body_bytes(MP3_FRAME),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let audio = provider
        .synthesize(
            "السلام علیکم",
            "21m00Tcm4TlvDq8ikWAM",
            &VoiceSettings::synthesis(),
        )
        .await
        .unwrap();

    assert_eq!(audio.as_ref(), MP3_FRAME);
}

#[tokio::test]
async fn upstream_error_body_is_kept_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/21m00Tcm4TlvDq8ikWAM"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string(r#"{"detail":{"status":"invalid_api_key"}}"#),
        )
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .synthesize("سلام", "21m00Tcm4TlvDq8ikWAM", &VoiceSettings::synthesis())
        .await
        .unwrap_err();

    match err {
        ProviderError::Upstream { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, r#"{"detail":{"status":"invalid_api_key"}}"#);
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_audio_is_an_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/21m00Tcm4TlvDq8ikWAM"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .synthesize("سلام", "21m00Tcm4TlvDq8ikWAM", &VoiceSettings::synthesis())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse(_)));
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/21m00Tcm4TlvDq8ikWAM"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(MP3_FRAME)
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = ElevenLabsConfig::default()
        .with_base_url(&server.uri())
        .with_api_key(API_KEY)
        .with_timeout(Duration::from_millis(200));
    let provider = ElevenLabsProvider::new(config).unwrap();

    let err = provider
        .synthesize("سلام", "21m00Tcm4TlvDq8ikWAM", &VoiceSettings::synthesis())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn convert_sends_multipart_to_stream_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/speech-to-speech/pNInz6obpgDQGcFmaJgB/stream"))
        .and(header("xi-api-key", API_KEY))
        .and(body_string_contains("eleven_english_sts_v2"))
        .and(body_string_contains("similarity_boost"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(MP3_FRAME))
        .expect(1)
        .mount(&server)
        .await;

    let input = AudioInput::new(b"ID3\x03\x00fake-mp3".to_vec(), "in.mp3", "audio/mpeg");
    let audio = provider_for(&server)
        .convert(&input, "pNInz6obpgDQGcFmaJgB", &VoiceSettings::conversion())
        .await
        .unwrap();
    assert_eq!(audio.len(), MP3_FRAME.len());
}

#[tokio::test]
async fn clone_voice_returns_new_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/voices/add"))
        .and(body_string_contains("Narrator"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "voice_id": "cloned123" })))
        .expect(1)
        .mount(&server)
        .await;

    let sample = AudioInput::new(b"ID3\x03\x00sample".to_vec(), "s.mp3", "audio/mpeg");
    let voice_id = provider_for(&server)
        .clone_voice("Narrator", "calm", &[sample])
        .await
        .unwrap();
    assert_eq!(voice_id, "cloned123");
}

#[tokio::test]
async fn list_voices_defaults_missing_category() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/voices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "voices": [
                { "voice_id": "a1", "name": "Rachel" },
                { "voice_id": "b2", "name": "Mine", "category": "cloned", "description": "own" }
            ]
        })))
        .mount(&server)
        .await;

    let voices = provider_for(&server).list_voices().await.unwrap();
    assert_eq!(voices.len(), 2);
    assert_eq!(voices[0].category, "premade");
    assert_eq!(voices[1].category, "cloned");
    assert_eq!(voices[1].description.as_deref(), Some("own"));
}

#[tokio::test]
async fn delete_voice_maps_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/voices/gone1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("voice_not_found"))
        .mount(&server)
        .await;

    let err = provider_for(&server).delete_voice("gone1").await.unwrap_err();
    assert_eq!(
        err,
        ProviderError::Upstream {
            status: 404,
            message: "voice_not_found".to_string()
        }
    );
}

#[tokio::test]
async fn subscription_maps_usage_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/user/subscription"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tier": "creator",
            "character_count": 25000,
            "character_limit": 100000,
            "next_character_count_reset_unix": 1_900_000_000i64,
            "voice_add_edit_counter": 4,
            "voice_limit": 30,
            "status": "active"
        })))
        .mount(&server)
        .await;

    let usage = provider_for(&server).subscription().await.unwrap();
    assert_eq!(usage.tier, "creator");
    assert_eq!(usage.character_count, 25_000);
    assert_eq!(usage.character_limit, 100_000);
    assert_eq!(usage.next_reset_unix, Some(1_900_000_000));
    assert_eq!(usage.voice_count, Some(4));
    assert_eq!(usage.voice_limit, Some(30));
}
