//! Configuration types and loading
//!
//! Config file path precedence: `--config` > `CONFIG_PATH` env var > default.
//! The app secret is loaded from the COMPONENT_APPSECRET env var or
//! `appsecret_file`, never stored in the TOML directly.

use std::path::{Path, PathBuf};

use component_auth::AppSecret;
use component_auth::constants::DEFAULT_API_BASE;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Env var holding the platform app secret
pub const APPSECRET_ENV: &str = "COMPONENT_APPSECRET";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub component: ComponentConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Platform identity and collaborator locations
#[derive(Debug, Deserialize)]
pub struct ComponentConfig {
    pub appid: String,
    #[serde(skip)]
    pub appsecret: Option<AppSecret>,
    /// Path to a file containing the app secret (alternative to the env var)
    #[serde(default)]
    pub appsecret_file: Option<PathBuf>,
    /// File kept current by the verify-ticket push receiver
    pub verify_ticket_file: PathBuf,
    /// JSON file caching the platform token between runs
    pub token_file: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_owned()
}

fn default_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from a TOML file, then resolve the app secret.
    ///
    /// Secret resolution order:
    /// 1. COMPONENT_APPSECRET env var
    /// 2. appsecret_file path from config
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.component.appid.trim().is_empty() {
            return Err(ConfigError::invalid("component.appid", "must not be empty"));
        }

        if !config.http.api_base.starts_with("http://")
            && !config.http.api_base.starts_with("https://")
        {
            return Err(ConfigError::invalid(
                "http.api_base",
                format!("must start with http:// or https://, got: {}", config.http.api_base),
            ));
        }

        if config.http.timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "http.timeout_secs",
                "must be greater than 0",
            ));
        }

        if let Ok(secret) = std::env::var(APPSECRET_ENV) {
            config.component.appsecret = Some(AppSecret::new(secret));
        } else if let Some(ref secret_file) = config.component.appsecret_file {
            let secret =
                std::fs::read_to_string(secret_file).map_err(|source| ConfigError::Read {
                    path: secret_file.clone(),
                    source,
                })?;
            let secret = secret.trim();
            if !secret.is_empty() {
                config.component.appsecret = Some(AppSecret::new(secret));
            }
        }

        if config.component.appsecret.is_none() {
            return Err(ConfigError::MissingSecret { env: APPSECRET_ENV });
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("component-probe.toml")
    }
}
