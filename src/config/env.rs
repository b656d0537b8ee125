use std::path::PathBuf;
use std::str::FromStr;

use super::{AuthConfig, MeteringConfig, ProviderConfig, ServerConfig, VoiceTable};

/// Build a configuration from an environment source
///
/// `lookup` returns the value for a variable name, so tests can feed a map
/// instead of mutating the process environment.
pub(super) fn from_lookup<F>(lookup: F) -> Result<ServerConfig, Box<dyn std::error::Error>>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
    let defaults = ServerConfig::default();

    let mut voices = VoiceTable::default();
    if let Some(id) = get("ELEVENLABS_MALE_VOICE_ID") {
        voices.conversion_male = id;
    }
    if let Some(id) = get("ELEVENLABS_FEMALE_VOICE_ID") {
        voices.conversion_female = id;
    }
    for preset in voices.cloned.iter_mut() {
        let var = format!("VOICE_{}_ID", preset.key.to_uppercase());
        if let Some(id) = get(&var) {
            preset.voice_id = id;
        }
    }

    let provider_defaults = ProviderConfig::default();
    let provider = ProviderConfig {
        api_key: get("ELEVENLABS_API_KEY"),
        base_url: get("ELEVENLABS_BASE_URL").unwrap_or_else(|| provider_defaults.base_url.clone()),
        request_timeout_seconds: parse_or(
            get("PROVIDER_TIMEOUT_SECONDS"),
            "PROVIDER_TIMEOUT_SECONDS",
            provider_defaults.request_timeout_seconds,
        )?,
        synthesis_model: get("ELEVENLABS_TTS_MODEL")
            .unwrap_or_else(|| provider_defaults.synthesis_model.clone()),
        conversion_model: get("ELEVENLABS_STS_MODEL")
            .unwrap_or_else(|| provider_defaults.conversion_model.clone()),
    };

    let auth_defaults = AuthConfig::default();
    let auth = AuthConfig {
        jwt_secret: get("JWT_SECRET").unwrap_or_default(),
        session_ttl_hours: parse_or(
            get("SESSION_TTL_HOURS"),
            "SESSION_TTL_HOURS",
            auth_defaults.session_ttl_hours,
        )?,
        reset_ttl_minutes: parse_or(
            get("RESET_TTL_MINUTES"),
            "RESET_TTL_MINUTES",
            auth_defaults.reset_ttl_minutes,
        )?,
        admin_key: get("ADMIN_KEY"),
    };

    let metering_defaults = MeteringConfig::default();
    let metering = MeteringConfig {
        default_credits_limit: parse_or(
            get("CREDITS_LIMIT"),
            "CREDITS_LIMIT",
            metering_defaults.default_credits_limit,
        )?,
        conversion_cost: parse_or(
            get("CONVERSION_COST"),
            "CONVERSION_COST",
            metering_defaults.conversion_cost,
        )?,
        max_text_chars: parse_or(
            get("MAX_TEXT_CHARS"),
            "MAX_TEXT_CHARS",
            metering_defaults.max_text_chars,
        )?,
        max_audio_bytes: parse_or(
            get("MAX_AUDIO_BYTES"),
            "MAX_AUDIO_BYTES",
            metering_defaults.max_audio_bytes,
        )?,
        max_text_upload_bytes: parse_or(
            get("MAX_TEXT_UPLOAD_BYTES"),
            "MAX_TEXT_UPLOAD_BYTES",
            metering_defaults.max_text_upload_bytes,
        )?,
        script_threshold: parse_or(
            get("SCRIPT_THRESHOLD"),
            "SCRIPT_THRESHOLD",
            metering_defaults.script_threshold,
        )?,
    };

    Ok(ServerConfig {
        host: get("HOST").unwrap_or_else(|| defaults.host.clone()),
        port: parse_or(get("PORT"), "PORT", defaults.port)?,
        database_path: get("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| defaults.database_path.clone()),
        artifact_dir: get("ARTIFACT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| defaults.artifact_dir.clone()),
        provider,
        voices,
        auth,
        metering,
        cors_allowed_origins: get("CORS_ALLOWED_ORIGINS"),
        rate_limit_requests_per_second: parse_or(
            get("RATE_LIMIT_REQUESTS_PER_SECOND"),
            "RATE_LIMIT_REQUESTS_PER_SECOND",
            defaults.rate_limit_requests_per_second,
        )?,
        rate_limit_burst_size: parse_or(
            get("RATE_LIMIT_BURST_SIZE"),
            "RATE_LIMIT_BURST_SIZE",
            defaults.rate_limit_burst_size,
        )?,
    })
}

fn parse_or<T: FromStr>(
    value: Option<String>,
    name: &str,
    default: T,
) -> Result<T, Box<dyn std::error::Error>> {
    match value {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("Invalid value for {name}: '{raw}'").into()),
        None => Ok(default),
    }
}
