//! Process configuration: a TOML file with every field defaulted, plus a few
//! environment overrides for container deployments.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub const ENV_LISTEN: &str = "POSTCARD_RELAY_LISTEN";
pub const ENV_IMAGE_DIR: &str = "POSTCARD_RELAY_IMAGE_DIR";
pub const ENV_LOG_DIR: &str = "POSTCARD_RELAY_LOG_DIR";

/// Well above axum's 2 MB default so full-size postcards fit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub listen: SocketAddr,
    /// Overlay PNGs (one per host, plus `matte` and `postcard`) and optional font files.
    pub image_dir: PathBuf,
    /// Journal directory; `None` disables journaling.
    pub log_dir: Option<PathBuf>,
    pub forward_scheme: String,
    pub forward_timeout_secs: u64,
    /// Upper bound on each background job (forward, journal, store write).
    pub task_timeout_secs: u64,
    pub matte_on_origination: bool,
    pub register_on_start: bool,
    /// Largest request body `/relay` accepts. Routes carry the postcard inline.
    pub max_body_bytes: usize,
    pub store: StoreConfig,
    pub identity: IdentityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 80)),
            image_dir: PathBuf::from("/usr/local/postcard-relay"),
            log_dir: Some(PathBuf::from("/var/log/postcard-relay")),
            forward_scheme: "http".to_string(),
            forward_timeout_secs: 5,
            task_timeout_secs: 5,
            matte_on_origination: false,
            register_on_start: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            store: StoreConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::File,
            path: PathBuf::from("/var/lib/postcard-relay"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    #[default]
    Metadata,
    Static,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    pub source: IdentitySource,
    pub name: String,
    pub endpoint: String,
    pub private: String,
    pub project_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Applies `POSTCARD_RELAY_*` overrides read through `var`.
    pub fn apply_env_with(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(listen) = var(ENV_LISTEN) {
            self.listen = listen.parse().map_err(|e| ConfigError::Invalid {
                key: ENV_LISTEN,
                reason: format!("{listen:?}: {e}"),
            })?;
        }
        if let Some(dir) = var(ENV_IMAGE_DIR) {
            self.image_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var(ENV_LOG_DIR) {
            self.log_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|k| std::env::var(k).ok())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.forward_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "forward_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.task_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "task_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "max_body_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.forward_scheme.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "forward_scheme",
                reason: "must not be empty".to_string(),
            });
        }
        if self.identity.source == IdentitySource::Static && self.identity.name.trim().is_empty()
        {
            return Err(ConfigError::Invalid {
                key: "identity.name",
                reason: "static identity needs a host name".to_string(),
            });
        }
        Ok(())
    }

    pub fn forward_timeout(&self) -> Duration {
        Duration::from_secs(self.forward_timeout_secs)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
