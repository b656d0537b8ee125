use std::path::PathBuf;

use super::yaml::{VoicePresetYaml, YamlConfig};
use super::{ServerConfig, VoicePreset};

/// Apply YAML values on top of an environment-derived configuration.
///
/// Every value present in the YAML wins; absent values keep what the
/// environment (or the defaults) provided.
pub(super) fn apply_yaml(config: &mut ServerConfig, yaml: YamlConfig) {
    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
    }

    if let Some(storage) = yaml.storage {
        if let Some(path) = storage.database_path {
            config.database_path = PathBuf::from(path);
        }
        if let Some(dir) = storage.artifact_dir {
            config.artifact_dir = PathBuf::from(dir);
        }
    }

    if let Some(provider) = yaml.provider {
        if provider.api_key.is_some() {
            config.provider.api_key = provider.api_key;
        }
        if let Some(url) = provider.base_url {
            config.provider.base_url = url;
        }
        if let Some(timeout) = provider.timeout_seconds {
            config.provider.request_timeout_seconds = timeout;
        }
        if let Some(model) = provider.synthesis_model {
            config.provider.synthesis_model = model;
        }
        if let Some(model) = provider.conversion_model {
            config.provider.conversion_model = model;
        }
    }

    if let Some(voices) = yaml.voices {
        if let Some(synthesis) = voices.synthesis {
            config.voices.synthesis = synthesis.into_iter().map(preset_from_yaml).collect();
        }
        if let Some(key) = voices.default_synthesis {
            config.voices.default_synthesis = key;
        }
        if let Some(id) = voices.conversion_male {
            config.voices.conversion_male = id;
        }
        if let Some(id) = voices.conversion_female {
            config.voices.conversion_female = id;
        }
        if let Some(cloned) = voices.cloned {
            config.voices.cloned = cloned.into_iter().map(preset_from_yaml).collect();
        }
    }

    if let Some(auth) = yaml.auth {
        if let Some(secret) = auth.jwt_secret {
            config.auth.jwt_secret = secret;
        }
        if let Some(hours) = auth.session_ttl_hours {
            config.auth.session_ttl_hours = hours;
        }
        if let Some(minutes) = auth.reset_ttl_minutes {
            config.auth.reset_ttl_minutes = minutes;
        }
        if auth.admin_key.is_some() {
            config.auth.admin_key = auth.admin_key;
        }
    }

    if let Some(metering) = yaml.metering {
        let target = &mut config.metering;
        if let Some(limit) = metering.default_credits_limit {
            target.default_credits_limit = limit;
        }
        if let Some(cost) = metering.conversion_cost {
            target.conversion_cost = cost;
        }
        if let Some(max) = metering.max_text_chars {
            target.max_text_chars = max;
        }
        if let Some(max) = metering.max_audio_bytes {
            target.max_audio_bytes = max;
        }
        if let Some(max) = metering.max_text_upload_bytes {
            target.max_text_upload_bytes = max;
        }
        if let Some(threshold) = metering.script_threshold {
            target.script_threshold = threshold;
        }
    }

    if let Some(security) = yaml.security {
        if security.cors_allowed_origins.is_some() {
            config.cors_allowed_origins = security.cors_allowed_origins;
        }
        if let Some(rps) = security.rate_limit_requests_per_second {
            config.rate_limit_requests_per_second = rps;
        }
        if let Some(burst) = security.rate_limit_burst_size {
            config.rate_limit_burst_size = burst;
        }
    }
}

fn preset_from_yaml(entry: VoicePresetYaml) -> VoicePreset {
    let name = entry.name.unwrap_or_else(|| entry.key.clone());
    VoicePreset {
        description: entry.description.unwrap_or_default(),
        key: entry.key,
        name,
        voice_id: entry.voice_id,
    }
}
