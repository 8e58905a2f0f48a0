use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use repofolio_api::{Endpoints, TransportSettings};

/// Main configuration structure
///
/// This gets loaded from config file, env vars, and CLI args.
/// Priority: CLI > Env > File > Defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load config from default location, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from an explicit file; a missing file means defaults
    pub fn load_from(config_path: &Path) -> crate::Result<Self> {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)
                .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Write config to `config_path`, creating missing parent directories
    pub fn save_to(&self, config_path: &Path) -> crate::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(config_path, contents)?;
        Ok(())
    }

    /// `GITHUB_TOKEN` and `REPOFOLIO_OWNER` win over the file
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("GITHUB_TOKEN").filter(|t| !t.is_empty()) {
            self.github.token = Some(token);
        }
        if let Some(owner) = lookup("REPOFOLIO_OWNER").filter(|o| !o.is_empty()) {
            self.github.owner = owner;
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.github.owner.trim().is_empty() {
            return Err(crate::Error::ConfigError(
                "github.owner must be set (config file, REPOFOLIO_OWNER or --owner)".into(),
            ));
        }
        if self.cache.ttl_ms <= 0 {
            return Err(crate::Error::ConfigError("cache.ttl_ms must be positive".into()));
        }
        Ok(())
    }

    /// Uses XDG on Linux/macOS, AppData on Windows
    pub fn config_path() -> crate::Result<PathBuf> {
        Ok(app_dir(dirs::config_dir())?.join("config.toml"))
    }

    pub fn cache_path(&self) -> crate::Result<PathBuf> {
        match &self.cache.path {
            Some(path) => Ok(path.clone()),
            None => Ok(app_dir(dirs::data_dir())?.join("cache.db")),
        }
    }

    pub fn descriptions_path(&self) -> crate::Result<PathBuf> {
        match &self.storage.descriptions_path {
            Some(path) => Ok(path.clone()),
            None => Ok(app_dir(dirs::data_dir())?.join("descriptions.db")),
        }
    }
}

fn app_dir(base: Option<PathBuf>) -> crate::Result<PathBuf> {
    base.map(|dir| dir.join("repofolio"))
        .ok_or_else(|| crate::Error::ConfigError("Could not find a home for repofolio files".into()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Personal access token, sent as a bearer token on every request
    pub token: Option<String>,

    /// Account whose repositories make up the portfolio
    #[serde(default)]
    pub owner: String,

    /// API URL (for GitHub Enterprise)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,

    /// Host serving raw file contents (README)
    #[serde(default = "default_raw_url")]
    pub raw_url: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Unset means no timeout at all
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_graphql_url() -> String {
    "https://api.github.com/graphql".to_string()
}

fn default_raw_url() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_api_version() -> String {
    "2022-11-28".to_string()
}

fn default_user_agent() -> String {
    "repofolio/0.1.0".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            owner: String::new(),
            api_url: default_api_url(),
            graphql_url: default_graphql_url(),
            raw_url: default_raw_url(),
            api_version: default_api_version(),
            user_agent: default_user_agent(),
            request_timeout_secs: None,
        }
    }
}

impl GitHubConfig {
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            api_url: self.api_url.trim_end_matches('/').to_string(),
            graphql_url: self.graphql_url.clone(),
            raw_url: self.raw_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            token: self.token.clone(),
            api_version: self.api_version.clone(),
            user_agent: self.user_agent.clone(),
            timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a cached response counts as fresh
    #[serde(default = "default_cache_ttl")]
    pub ttl_ms: i64,

    /// SQLite file for cached responses
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_cache_ttl() -> i64 {
    repofolio_cache::DEFAULT_TTL_MS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_cache_ttl(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// SQLite file for description overrides
    #[serde(default)]
    pub descriptions_path: Option<PathBuf>,
}
