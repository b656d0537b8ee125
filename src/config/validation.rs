use std::collections::HashSet;

use super::{ServerConfig, VoicePreset};

/// Validate a fully merged configuration.
pub(super) fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.auth.jwt_secret.trim().is_empty() {
        return Err("JWT_SECRET must be set (auth.jwt_secret in YAML)".into());
    }
    if config.port == 0 {
        return Err("Server port must be non-zero".into());
    }
    if config.auth.session_ttl_hours == 0 || config.auth.reset_ttl_minutes == 0 {
        return Err("Token lifetimes must be greater than zero".into());
    }
    if config.provider.request_timeout_seconds == 0 {
        return Err("Provider timeout must be greater than zero".into());
    }

    let metering = &config.metering;
    if metering.default_credits_limit == 0 {
        return Err("Default credits limit must be positive".into());
    }
    if !(metering.script_threshold > 0.0 && metering.script_threshold <= 1.0) {
        return Err(format!(
            "Script threshold must be in (0, 1], got {}",
            metering.script_threshold
        )
        .into());
    }

    validate_presets("synthesis", &config.voices.synthesis)?;
    validate_presets("cloned", &config.voices.cloned)?;
    if config.voices.conversion_male.trim().is_empty()
        || config.voices.conversion_female.trim().is_empty()
    {
        return Err("Conversion voice ids must not be empty".into());
    }

    Ok(())
}

fn validate_presets(table: &str, presets: &[VoicePreset]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for preset in presets {
        if preset.key.trim().is_empty() || preset.voice_id.trim().is_empty() {
            return Err(format!("{table} voice entries need both a key and a voice_id"));
        }
        if !seen.insert(preset.key.as_str()) {
            return Err(format!("Duplicate {table} voice key '{}'", preset.key));
        }
    }
    Ok(())
}
