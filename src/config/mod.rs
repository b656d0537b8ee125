//! Configuration module for the Voxmeter gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Applying YAML overrides on top of the environment configuration
//! - `validation`: Configuration validation logic
//! - `pricing`: Static provider plan pricing table
//!
//! # Example
//! ```rust,no_run
//! use voxmeter_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
pub mod pricing;
mod validation;
mod yaml;

pub use pricing::{
    PlanPricing, VoiceToolsOverage, estimate_monthly_cost, get_plan_pricing, get_voice_overage,
    list_plans, tts_cost_per_credit,
};

/// Default ElevenLabs API endpoint
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";

/// Outbound provider settings
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// ElevenLabs API key (`ELEVENLABS_API_KEY`)
    pub api_key: Option<String>,
    /// Base URL of the provider API; overridable for staging and tests
    pub base_url: String,
    /// Upper bound for a single provider round trip
    pub request_timeout_seconds: u64,
    /// Model used for text synthesis
    pub synthesis_model: String,
    /// Model used for speech-to-speech conversion
    pub conversion_model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_ELEVENLABS_BASE_URL.to_string(),
            request_timeout_seconds: 60,
            synthesis_model: "eleven_multilingual_v2".to_string(),
            conversion_model: "eleven_english_sts_v2".to_string(),
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Drop for ProviderConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.api_key {
            key.zeroize();
        }
    }
}

/// A named voice bound to a provider voice id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoicePreset {
    pub key: String,
    pub name: String,
    pub description: String,
    pub voice_id: String,
}

impl VoicePreset {
    pub fn new(key: &str, name: &str, description: &str, voice_id: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            voice_id: voice_id.to_string(),
        }
    }
}

/// Voice lookup tables, validated into a `VoiceCatalog` at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceTable {
    /// Presets available for text synthesis
    pub synthesis: Vec<VoicePreset>,
    /// Key of the preset used when a request names no voice
    pub default_synthesis: String,
    /// Conversion target for `voice_type = "male"`
    pub conversion_male: String,
    /// Conversion target for `voice_type = "female"`
    pub conversion_female: String,
    /// Premium cloned voices offered to every account
    pub cloned: Vec<VoicePreset>,
}

impl Default for VoiceTable {
    fn default() -> Self {
        Self {
            synthesis: vec![
                VoicePreset::new("female-1", "Rachel", "Calm female voice", "21m00Tcm4TlvDq8ikWAM"),
                VoicePreset::new("female-2", "Domi", "Strong female voice", "AZnzlk1XvdvUeBnXmlld"),
                VoicePreset::new("female-3", "Bella", "Soft female voice", "EXAVITQu4vr4xnSDxMaL"),
                VoicePreset::new("male-1", "Arnold", "Crisp male voice", "VR6AewLTigWG4xSOukaG"),
            ],
            default_synthesis: "female-1".to_string(),
            conversion_male: "pNInz6obpgDQGcFmaJgB".to_string(),
            conversion_female: "21m00Tcm4TlvDq8ikWAM".to_string(),
            cloned: vec![
                VoicePreset::new(
                    "mareeb",
                    "Mareeb",
                    "Warm, confident female voice",
                    "21m00Tcm4TlvDq8ikWAM",
                ),
                VoicePreset::new(
                    "aleeza",
                    "Aleeza",
                    "Soft, elegant female voice",
                    "21m00Tcm4TlvDq8ikWAM",
                ),
                VoicePreset::new(
                    "eiza",
                    "Eiza",
                    "Clear, expressive female voice",
                    "21m00Tcm4TlvDq8ikWAM",
                ),
            ],
        }
    }
}

/// Token and admin secrets
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for session and reset tokens (`JWT_SECRET`)
    pub jwt_secret: String,
    /// Session token lifetime in hours
    pub session_ttl_hours: u64,
    /// Password reset token lifetime in minutes
    pub reset_ttl_minutes: u64,
    /// Shared key for the admin report endpoints (`ADMIN_KEY`)
    pub admin_key: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            session_ttl_hours: 24 * 7,
            reset_ttl_minutes: 60,
            admin_key: None,
        }
    }
}

impl AuthConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_hours * 3600)
    }

    pub fn reset_ttl(&self) -> Duration {
        Duration::from_secs(self.reset_ttl_minutes * 60)
    }
}

impl Drop for AuthConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.jwt_secret.zeroize();
        if let Some(ref mut key) = self.admin_key {
            key.zeroize();
        }
    }
}

/// Credit metering limits
#[derive(Debug, Clone, PartialEq)]
pub struct MeteringConfig {
    /// Credits granted to a new account
    pub default_credits_limit: u64,
    /// Flat credit cost of one voice conversion
    pub conversion_cost: u64,
    /// Largest synthesis text accepted, in characters
    pub max_text_chars: usize,
    /// Largest audio upload accepted, in bytes
    pub max_audio_bytes: usize,
    /// Largest text file upload accepted, in bytes
    pub max_text_upload_bytes: usize,
    /// Minimum share of target-script characters among alphabetic ones
    pub script_threshold: f64,
}

impl Default for MeteringConfig {
    fn default() -> Self {
        Self {
            default_credits_limit: 1000,
            conversion_cost: 100,
            max_text_chars: 5000,
            max_audio_bytes: 10 * 1024 * 1024,
            max_text_upload_bytes: 1024 * 1024,
            script_threshold: 0.8,
        }
    }
}

/// Server configuration
///
/// Contains all configuration needed to run the gateway:
/// - Server settings (host, port)
/// - Storage locations (database file, artifact directory)
/// - Provider credentials and voice tables
/// - Token and admin secrets
/// - Metering limits
/// - Security settings (CORS, rate limiting)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // Storage
    pub database_path: PathBuf,
    pub artifact_dir: PathBuf,

    pub provider: ProviderConfig,
    pub voices: VoiceTable,
    pub auth: AuthConfig,
    pub metering: MeteringConfig,

    // Security settings
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: u32,
    pub rate_limit_burst_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            database_path: PathBuf::from("data/voxmeter.db"),
            artifact_dir: PathBuf::from("data/audio"),
            provider: ProviderConfig::default(),
            voices: VoiceTable::default(),
            auth: AuthConfig::default(),
            metering: MeteringConfig::default(),
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Reads the process environment (including values loaded from `.env` by `main`)
    /// and validates the result.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = env::from_lookup(|key| std::env::var(key).ok())?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable fallback
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or parsed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    ///
    /// # Example
    /// ```rust,no_run
    /// use voxmeter_gateway::config::ServerConfig;
    /// use std::path::PathBuf;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config_path = PathBuf::from("config.yaml");
    /// let config = ServerConfig::from_file(&config_path)?;
    /// println!("Server listening on {}", config.address());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        Self::from_file_with_lookup(path, |key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_file`] with an explicit environment source.
    pub fn from_file_with_lookup<F>(
        path: &PathBuf,
        lookup: F,
    ) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        // YAML > ENV (.env is loaded into the environment in main.rs) > defaults
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let mut config = env::from_lookup(lookup)?;
        merge::apply_yaml(&mut config, yaml_config);

        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether the admin report endpoints are enabled
    pub fn has_admin_key(&self) -> bool {
        self.auth
            .admin_key
            .as_deref()
            .is_some_and(|key| !key.is_empty())
    }

    /// Get the provider API key or a descriptive error
    pub fn get_provider_api_key(&self) -> Result<String, String> {
        self.provider
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| "ElevenLabs API key not configured".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.address(), "0.0.0.0:3001");
        assert_eq!(config.metering.default_credits_limit, 1000);
        assert_eq!(config.auth.session_ttl(), Duration::from_secs(7 * 24 * 3600));
        assert_eq!(config.auth.reset_ttl(), Duration::from_secs(3600));
        assert!(!config.has_admin_key());
    }

    #[test]
    fn test_get_provider_api_key_missing() {
        let config = ServerConfig::default();
        let err = config.get_provider_api_key().unwrap_err();
        assert!(err.contains("not configured"));
    }

    #[test]
    fn test_get_provider_api_key_present() {
        let mut config = ServerConfig::default();
        config.provider.api_key = Some("el-key".to_string());
        assert_eq!(config.get_provider_api_key().unwrap(), "el-key");
    }

    #[test]
    fn test_from_file_yaml_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 8080

storage:
  database_path: "/tmp/vox.db"
  artifact_dir: "/tmp/vox-audio"

provider:
  api_key: "yaml-el-key"
  timeout_seconds: 15

auth:
  jwt_secret: "yaml-secret"
  admin_key: "yaml-admin"

metering:
  default_credits_limit: 5000
  conversion_cost: 40
"#;

        fs::write(&config_path, yaml_content).unwrap();

        let config = ServerConfig::from_file_with_lookup(&config_path, lookup_from(&[])).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_path, PathBuf::from("/tmp/vox.db"));
        assert_eq!(config.artifact_dir, PathBuf::from("/tmp/vox-audio"));
        assert_eq!(config.provider.api_key, Some("yaml-el-key".to_string()));
        assert_eq!(config.provider.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.auth.jwt_secret, "yaml-secret");
        assert!(config.has_admin_key());
        assert_eq!(config.metering.default_credits_limit, 5000);
        assert_eq!(config.metering.conversion_cost, 40);
    }

    #[test]
    fn test_from_file_yaml_overrides_env() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 8080

provider:
  api_key: "yaml-key"
"#;

        fs::write(&config_path, yaml_content).unwrap();

        let env = lookup_from(&[
            ("HOST", "0.0.0.0"),
            ("ELEVENLABS_API_KEY", "env-key"),
            ("JWT_SECRET", "env-secret"),
            ("CREDITS_LIMIT", "250"),
        ]);
        let config = ServerConfig::from_file_with_lookup(&config_path, env).unwrap();

        // YAML overrides ENV
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.provider.api_key, Some("yaml-key".to_string()));
        // ENV fills what YAML leaves out
        assert_eq!(config.auth.jwt_secret, "env-secret");
        assert_eq!(config.metering.default_credits_limit, 250);
    }

    #[test]
    fn test_from_file_missing_file() {
        let config_path = PathBuf::from("/nonexistent/config.yaml");
        let result = ServerConfig::from_file_with_lookup(&config_path, lookup_from(&[]));

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");

        fs::write(&config_path, "invalid: yaml: [content").unwrap();

        let result = ServerConfig::from_file_with_lookup(&config_path, lookup_from(&[]));

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );
    }

    #[test]
    fn test_from_file_rejects_missing_secret() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "server:\n  port: 9000\n").unwrap();

        let result = ServerConfig::from_file_with_lookup(&config_path, lookup_from(&[]));
        assert!(result.unwrap_err().to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_cloned_voice_ids_from_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        let yaml_content = r#"
auth:
  jwt_secret: "s"
voices:
  cloned:
    - key: "mareeb"
      name: "Mareeb"
      voice_id: "custom-mareeb"
"#;
        fs::write(&config_path, yaml_content).unwrap();

        let config = ServerConfig::from_file_with_lookup(&config_path, lookup_from(&[])).unwrap();
        assert_eq!(config.voices.cloned.len(), 1);
        assert_eq!(config.voices.cloned[0].voice_id, "custom-mareeb");
        // Untouched tables keep their defaults
        assert_eq!(config.voices.synthesis.len(), 4);
    }
}
