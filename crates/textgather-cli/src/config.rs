//! Configuration loading from TOML files

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use textgather_core::HttpConfig;
use textgather_repo::RepoConfig;

/// Global configuration for textgather
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub repo: RepoSection,
    pub http: HttpSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepoSection {
    pub base_url: String,
}

impl Default for RepoSection {
    fn default() -> Self {
        Self {
            base_url: RepoConfig::default().base_url().to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub user_agent: String,
    pub max_tries: u32,
    pub throttle_ms: u64,
    pub backoff_cap_secs: u64,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub stream_timeout_secs: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        let defaults = HttpConfig::default();
        Self {
            user_agent: defaults.user_agent,
            max_tries: defaults.max_tries,
            throttle_ms: defaults.throttle.as_millis() as u64,
            backoff_cap_secs: defaults.backoff_cap.as_secs(),
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            read_timeout_secs: defaults.read_timeout.as_secs(),
            stream_timeout_secs: defaults.stream_timeout.as_secs(),
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./textgather.toml (current directory)
    /// 2. ~/.config/textgather/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("textgather.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "textgather") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            user_agent: self.http.user_agent.clone(),
            max_tries: self.http.max_tries,
            throttle: Duration::from_millis(self.http.throttle_ms),
            backoff_cap: Duration::from_secs(self.http.backoff_cap_secs),
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.http.read_timeout_secs),
            stream_timeout: Duration::from_secs(self.http.stream_timeout_secs),
        }
    }

    pub fn repo_config(&self) -> RepoConfig {
        RepoConfig::new(self.repo.base_url.clone())
    }
}
