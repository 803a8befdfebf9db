//! Service configuration
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (--bind, --port, --database)
//! 2. Environment variables (LEARNSMART_*, PORT, JWT_SECRET, OPENAI_*)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! Runtime state that must survive restarts (the generated token secret,
//! leaderboard length) lives in the `settings` table instead.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = crate::auth::token::DEFAULT_TOKEN_TTL_DAYS;
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Bootstrap configuration loaded from TOML
///
/// Every key is optional; absent keys fall through to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub bind: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// SQLite file (relative or absolute)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Allowed browser origin for CORS
    #[serde(default)]
    pub cors_origin: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: Option<String>,

    #[serde(default)]
    pub token_ttl_days: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub database: Option<PathBuf>,
}

/// LLM provider settings after resolution
#[derive(Clone, PartialEq, Eq)]
pub struct OpenAiSettings {
    /// `None` disables the AI endpoints
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl std::fmt::Debug for OpenAiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub cors_origin: String,
    pub log_level: String,
    /// Explicit signing secret; `None` means use the persisted one
    pub jwt_secret: Option<String>,
    pub token_ttl_days: i64,
    pub openai: OpenAiSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI, environment, TOML and defaults
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let toml_config = load_toml_config(cli.config.as_deref());

        let bind = cli
            .bind
            .clone()
            .or_else(|| env_value("LEARNSMART_BIND"))
            .or(toml_config.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let port = match cli.port {
            Some(port) => port,
            None => match env_value("PORT") {
                Some(raw) => raw
                    .parse::<u16>()
                    .map_err(|_| Error::Config(format!("Invalid PORT value: {}", raw)))?,
                None => toml_config.port.unwrap_or(DEFAULT_PORT),
            },
        };

        let database_path = cli
            .database
            .clone()
            .or_else(|| env_value("LEARNSMART_DATABASE").map(PathBuf::from))
            .or(toml_config.database_path)
            .unwrap_or_else(default_database_path);

        let cors_origin = env_value("LEARNSMART_CORS_ORIGIN")
            .or(toml_config.cors_origin)
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string());

        let jwt_secret = env_value("JWT_SECRET").or(toml_config.auth.jwt_secret);

        let token_ttl_days = toml_config
            .auth
            .token_ttl_days
            .unwrap_or(DEFAULT_TOKEN_TTL_DAYS);
        if token_ttl_days <= 0 {
            return Err(Error::Config(format!(
                "auth.token_ttl_days must be positive, got {}",
                token_ttl_days
            )));
        }

        let openai = OpenAiSettings {
            api_key: env_value("OPENAI_API_KEY").or(toml_config.openai.api_key),
            model: env_value("OPENAI_MODEL")
                .or(toml_config.openai.model)
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            base_url: env_value("OPENAI_BASE_URL")
                .or(toml_config.openai.base_url)
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        };

        Ok(Self {
            bind,
            port,
            database_path,
            cors_origin,
            log_level: toml_config.logging.level,
            jwt_secret,
            token_ttl_days,
            openai,
        })
    }

    /// `bind:port` for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Non-empty environment variable
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Load the TOML file, falling back to defaults on any problem
///
/// An explicit path that cannot be read or parsed logs a warning; with no
/// explicit path the platform locations are tried silently.
pub fn load_toml_config(explicit: Option<&Path>) -> TomlConfig {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match default_config_file() {
            Some(p) => p,
            None => return TomlConfig::default(),
        },
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str::<TomlConfig>(&content) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring malformed config file {}: {}", path.display(), e);
                TomlConfig::default()
            }
        },
        Err(e) => {
            warn!("Could not read config file {}: {}", path.display(), e);
            TomlConfig::default()
        }
    }
}

/// First existing config file: `~/.config/learnsmart/config.toml`, then
/// `/etc/learnsmart/config.toml`
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("learnsmart").join("config.toml"));
    let system_config = PathBuf::from("/etc/learnsmart/config.toml");

    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }
    if cfg!(unix) && system_config.exists() {
        return Some(system_config);
    }
    None
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("learnsmart"))
        .unwrap_or_else(|| PathBuf::from("./learnsmart_data"))
        .join("learnsmart.db")
}
