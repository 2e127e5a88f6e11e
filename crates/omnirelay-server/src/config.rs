//! Server configuration loading from file and environment variables.

use omnirelay_platform::PlatformConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

use crate::concierge::DEFAULT_WEBHOOK_URL;

/// Environment variable holding the platform credential.
pub const API_KEY_ENV: &str = "OMNIDIM_API_KEY";

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Voice-agent platform connection settings.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Concierge preset settings.
    #[serde(default)]
    pub concierge: ConciergeConfig,

    /// Workflow orchestration settings.
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Name reported by the health endpoint.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConciergeConfig {
    /// Post-call webhook used when a request does not name one.
    #[serde(default = "default_webhook_url")]
    pub default_webhook_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowConfig {
    /// Number dialed by `/workflow` when the request omits `to_number`.
    #[serde(default)]
    pub default_to_number: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "omnirelay_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    5001
}

fn default_service_name() -> String {
    "omnirelay".to_string()
}

fn default_webhook_url() -> String {
    DEFAULT_WEBHOOK_URL.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for ConciergeConfig {
    fn default() -> Self {
        Self {
            default_webhook_url: default_webhook_url(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The platform credential was not provided.
    #[error("OMNIDIM_API_KEY is not set")]
    MissingApiKey,
}

/// Loads configuration from a TOML file, falling back to defaults, then
/// applies environment overrides from the process environment.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if no platform API key is available.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`], resolving overrides through `lookup`.
pub fn load_config_with<F>(path: Option<&str>, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_overrides(config, lookup)
}

/// Applies environment overrides using `lookup` to resolve variables.
///
/// - `OMNIRELAY_HOST` overrides `server.host`
/// - `OMNIRELAY_PORT` overrides `server.port`
/// - `OMNIRELAY_LOG_LEVEL` overrides `logging.level`
/// - `OMNIRELAY_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `OMNIDIM_BASE_URL` overrides `platform.base_url`
/// - `OMNIDIM_API_KEY` sets `platform.api_key` (required)
pub fn apply_overrides<F>(mut config: Config, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("OMNIRELAY_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("OMNIRELAY_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(level) = lookup("OMNIRELAY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("OMNIRELAY_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(base_url) = lookup("OMNIDIM_BASE_URL") {
        if !base_url.trim().is_empty() {
            config.platform.base_url = base_url;
        }
    }
    if let Some(api_key) = lookup(API_KEY_ENV) {
        config.platform.api_key = api_key;
    }

    if config.platform.api_key.trim().is_empty() {
        return Err(ConfigError::MissingApiKey);
    }

    Ok(config)
}
