//! ElevenLabs voice provider.
//!
//! # API Reference
//!
//! - Synthesis: `POST /v1/text-to-speech/{voice_id}`
//! - Conversion: `POST /v1/speech-to-speech/{voice_id}/stream` (multipart)
//! - Voice Clone: `POST /v1/voices/add` (multipart)
//! - Voice List: `GET /v1/voices`
//! - Voice Delete: `DELETE /v1/voices/{voice_id}`
//! - Usage: `GET /v1/user/subscription`
//!
//! # Authentication
//!
//! ElevenLabs uses API key authentication via the `xi-api-key` header.

pub mod config;
pub mod messages;
pub mod provider;

pub use config::ElevenLabsConfig;
pub use provider::ElevenLabsProvider;

/// Provider key, also used for pricing lookups
pub const PROVIDER_NAME: &str = "elevenlabs";

pub const API_KEY_HEADER: &str = "xi-api-key";
