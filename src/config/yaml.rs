use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Anything left out
/// falls back to the environment, then to built-in defaults.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///
/// storage:
///   database_path: "/var/lib/voxmeter/voxmeter.db"
///   artifact_dir: "/var/lib/voxmeter/audio"
///
/// provider:
///   api_key: "your-elevenlabs-key"
///   base_url: "https://api.elevenlabs.io"
///   timeout_seconds: 60
///
/// voices:
///   default_synthesis: "female-1"
///   conversion_male: "pNInz6obpgDQGcFmaJgB"
///   cloned:
///     - key: "mareeb"
///       name: "Mareeb"
///       voice_id: "your-cloned-voice-id"
///
/// auth:
///   jwt_secret: "change-me"
///   session_ttl_hours: 168
///   admin_key: "ops-key"
///
/// metering:
///   default_credits_limit: 1000
///   conversion_cost: 100
///
/// security:
///   cors_allowed_origins: "https://app.example.com"
///   rate_limit_requests_per_second: 60
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub storage: Option<StorageYaml>,
    pub provider: Option<ProviderYaml>,
    pub voices: Option<VoicesYaml>,
    pub auth: Option<AuthYaml>,
    pub metering: Option<MeteringYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Database and artifact locations from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageYaml {
    pub database_path: Option<String>,
    pub artifact_dir: Option<String>,
}

/// Provider settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProviderYaml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub synthesis_model: Option<String>,
    pub conversion_model: Option<String>,
}

/// One voice preset entry
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VoicePresetYaml {
    pub key: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub voice_id: String,
}

/// Voice tables from YAML; a present list replaces the default list
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VoicesYaml {
    pub synthesis: Option<Vec<VoicePresetYaml>>,
    pub default_synthesis: Option<String>,
    pub conversion_male: Option<String>,
    pub conversion_female: Option<String>,
    pub cloned: Option<Vec<VoicePresetYaml>>,
}

/// Token and admin secrets from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthYaml {
    pub jwt_secret: Option<String>,
    pub session_ttl_hours: Option<u64>,
    pub reset_ttl_minutes: Option<u64>,
    pub admin_key: Option<String>,
}

/// Metering limits from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MeteringYaml {
    pub default_credits_limit: Option<u64>,
    pub conversion_cost: Option<u64>,
    pub max_text_chars: Option<usize>,
    pub max_audio_bytes: Option<usize>,
    pub max_text_upload_bytes: Option<usize>,
    pub script_threshold: Option<f64>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
