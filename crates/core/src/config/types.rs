use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub credits: CreditsConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("triptych.db")
}

/// Credit ledger configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreditsConfig {
    /// Balance granted to a requester the first time they're seen.
    #[serde(default = "default_initial_balance")]
    pub initial_balance: u64,
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            initial_balance: default_initial_balance(),
        }
    }
}

fn default_initial_balance() -> u64 {
    100
}

/// Durable artifact storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory artifacts are written under.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Base URL signed download links are built on.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Secret used to sign download URLs.
    pub signing_secret: String,
    /// Lifetime of a signed download URL (default: 1 hour).
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_secs: u64,
    /// Timeout for fetching an artifact from the provider.
    #[serde(default = "default_ingest_timeout")]
    pub ingest_timeout_secs: u32,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("data/videos")
}

fn default_public_base_url() -> String {
    "http://localhost:8080/files".to_string()
}

fn default_signed_url_ttl() -> u64 {
    3600
}

fn default_ingest_timeout() -> u32 {
    300
}

/// Configured provider adapters. Unset providers are not registered.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub luma: Option<LumaConfig>,
    #[serde(default)]
    pub runway: Option<RunwayConfig>,
    #[serde(default)]
    pub replicate: Option<ReplicateConfig>,
}

impl ProvidersConfig {
    /// Whether a provider with this name has a config section.
    pub fn is_configured(&self, name: &str) -> bool {
        match name {
            "luma" => self.luma.is_some(),
            "runway" => self.runway.is_some(),
            "replicate" => self.replicate.is_some(),
            _ => false,
        }
    }
}

/// Luma Dream Machine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LumaConfig {
    pub api_key: String,
    #[serde(default = "default_luma_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for LumaConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_luma_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_luma_url() -> String {
    "https://api.lumalabs.ai/dream-machine/v1".to_string()
}

/// Runway configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunwayConfig {
    pub api_key: String,
    #[serde(default = "default_runway_url")]
    pub base_url: String,
    /// Value sent as `X-Runway-Version`.
    #[serde(default = "default_runway_version")]
    pub api_version: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for RunwayConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_runway_url(),
            api_version: default_runway_version(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_runway_url() -> String {
    "https://api.dev.runwayml.com/v1".to_string()
}

fn default_runway_version() -> String {
    "2024-11-06".to_string()
}

/// Replicate (Stable Video Diffusion) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplicateConfig {
    pub api_key: String,
    #[serde(default = "default_replicate_url")]
    pub base_url: String,
    #[serde(default = "default_replicate_version")]
    pub model_version: String,
    /// 1-255, higher means more motion.
    #[serde(default = "default_motion_bucket")]
    pub motion_bucket_id: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Conditioning augmentation.
    #[serde(default = "default_cond_aug")]
    pub cond_aug: f64,
    #[serde(default = "default_decoding_t")]
    pub decoding_t: u32,
    #[serde(default = "default_video_length")]
    pub video_length: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_replicate_url(),
            model_version: default_replicate_version(),
            motion_bucket_id: default_motion_bucket(),
            fps: default_fps(),
            cond_aug: default_cond_aug(),
            decoding_t: default_decoding_t(),
            video_length: default_video_length(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_replicate_url() -> String {
    "https://api.replicate.com/v1".to_string()
}

fn default_replicate_version() -> String {
    "stability-ai/stable-video-diffusion:3f0457e4619daac51203dedb472816fd4af51f3149fa7a9e0b5ffcf1b8172438"
        .to_string()
}

fn default_motion_bucket() -> u32 {
    127
}

fn default_fps() -> u32 {
    6
}

fn default_cond_aug() -> f64 {
    0.02
}

fn default_decoding_t() -> u32 {
    7
}

fn default_video_length() -> String {
    "14_frames_with_svd".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub credits: CreditsConfig,
    pub orchestrator: OrchestratorConfig,
    pub storage: SanitizedStorageConfig,
    pub providers: Vec<SanitizedProviderConfig>,
}

/// Sanitized storage config (signing secret hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStorageConfig {
    pub root: PathBuf,
    pub public_base_url: String,
    pub signing_secret_configured: bool,
    pub signed_url_ttl_secs: u64,
}

/// Sanitized provider config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProviderConfig {
    pub name: String,
    pub base_url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let mut providers = Vec::new();
        if let Some(luma) = &config.providers.luma {
            providers.push(SanitizedProviderConfig {
                name: "luma".to_string(),
                base_url: luma.base_url.clone(),
                api_key_configured: !luma.api_key.is_empty(),
                timeout_secs: luma.timeout_secs,
            });
        }
        if let Some(runway) = &config.providers.runway {
            providers.push(SanitizedProviderConfig {
                name: "runway".to_string(),
                base_url: runway.base_url.clone(),
                api_key_configured: !runway.api_key.is_empty(),
                timeout_secs: runway.timeout_secs,
            });
        }
        if let Some(replicate) = &config.providers.replicate {
            providers.push(SanitizedProviderConfig {
                name: "replicate".to_string(),
                base_url: replicate.base_url.clone(),
                api_key_configured: !replicate.api_key.is_empty(),
                timeout_secs: replicate.timeout_secs,
            });
        }

        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            credits: config.credits.clone(),
            orchestrator: config.orchestrator.clone(),
            storage: SanitizedStorageConfig {
                root: config.storage.root.clone(),
                public_base_url: config.storage.public_base_url.clone(),
                signing_secret_configured: !config.storage.signing_secret.is_empty(),
                signed_url_ttl_secs: config.storage.signed_url_ttl_secs,
            },
            providers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[storage]
signing_secret = "s3cret"
"#;

    #[test]
    fn test_deserialize_minimal_config() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "triptych.db");
        assert_eq!(config.credits.initial_balance, 100);
        assert_eq!(config.storage.signed_url_ttl_secs, 3600);
        assert_eq!(config.storage.root.to_str().unwrap(), "data/videos");
        assert!(config.providers.luma.is_none());
    }

    #[test]
    fn test_deserialize_missing_storage_fails() {
        let toml = r#"
[server]
port = 8080
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_providers() {
        let toml = r#"
[storage]
signing_secret = "s3cret"

[providers.luma]
api_key = "luma-key"

[providers.runway]
api_key = "runway-key"
timeout_secs = 60

[providers.replicate]
api_key = "r8-key"
motion_bucket_id = 180
"#;
        let config: Config = toml::from_str(toml).unwrap();

        let luma = config.providers.luma.as_ref().unwrap();
        assert_eq!(luma.base_url, "https://api.lumalabs.ai/dream-machine/v1");
        assert_eq!(luma.timeout_secs, 30);

        let runway = config.providers.runway.as_ref().unwrap();
        assert_eq!(runway.timeout_secs, 60);
        assert_eq!(runway.api_version, "2024-11-06");

        let replicate = config.providers.replicate.as_ref().unwrap();
        assert_eq!(replicate.motion_bucket_id, 180);
        assert_eq!(replicate.fps, 6);
        assert_eq!(replicate.video_length, "14_frames_with_svd");

        assert!(config.providers.is_configured("runway"));
        assert!(!config.providers.is_configured("sora"));
    }

    #[test]
    fn test_provider_without_api_key_fails() {
        let toml = r#"
[storage]
signing_secret = "s3cret"

[providers.luma]
base_url = "http://localhost:9000"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let toml = r#"
[storage]
signing_secret = "s3cret"

[providers.luma]
api_key = "luma-key"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);

        assert!(sanitized.storage.signing_secret_configured);
        assert_eq!(sanitized.providers.len(), 1);
        assert_eq!(sanitized.providers[0].name, "luma");
        assert!(sanitized.providers[0].api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("s3cret"));
        assert!(!json.contains("luma-key"));
    }
}
