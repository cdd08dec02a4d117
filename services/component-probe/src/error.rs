//! Probe configuration errors

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("`{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Neither the env var nor `component.appsecret_file` produced a secret.
    #[error("app secret not configured: set {env} or component.appsecret_file")]
    MissingSecret { env: &'static str },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Result alias using ConfigError
pub type Result<T> = std::result::Result<T, ConfigError>;
