//! Application configuration with layered loading.
//!
//! Loading precedence (highest wins):
//! 1. Environment variables (NAVWARN_*)
//! 2. TOML config file (if NAVWARN_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root directory of the local attachment repository.
    ///
    /// Set via NAVWARN_REPO_ROOT environment variable.
    #[serde(default = "default_repo_root")]
    pub repo_root: PathBuf,

    /// Base URL of the remote message server, e.g.
    /// `https://msi.example.org`. The remote provider is only started
    /// when set.
    ///
    /// Set via NAVWARN_REMOTE_URL environment variable.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Seconds between message refresh cycles, per provider.
    ///
    /// Set via NAVWARN_REFRESH_INTERVAL_SECS environment variable.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Seconds between repository cleanup passes, per provider.
    ///
    /// Set via NAVWARN_CLEANUP_INTERVAL_SECS environment variable.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Bound on cached filtered views per provider bucket.
    ///
    /// Set via NAVWARN_CACHE_MAX_ENTRIES environment variable.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Lifespan of a cached view in seconds, independent of access.
    ///
    /// Set via NAVWARN_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Connect timeout for outbound HTTP in milliseconds.
    ///
    /// Set via NAVWARN_CONNECT_TIMEOUT_MS environment variable.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Read timeout for outbound HTTP in milliseconds.
    ///
    /// Set via NAVWARN_READ_TIMEOUT_MS environment variable.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Attachment mirror worker pool size; bounds outbound concurrency
    /// against the remote origin.
    ///
    /// Set via NAVWARN_MIRROR_WORKERS environment variable.
    #[serde(default = "default_mirror_workers")]
    pub mirror_workers: usize,

    /// Days a firing exercise stays in the legacy active window.
    ///
    /// Set via NAVWARN_FIRING_EXERCISE_DAYS environment variable.
    #[serde(default = "default_firing_exercise_days")]
    pub firing_exercise_days: u64,

    /// User-Agent string for outbound HTTP requests.
    ///
    /// Set via NAVWARN_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_repo_root() -> PathBuf {
    PathBuf::from("./navwarn-repo")
}

fn default_refresh_interval_secs() -> u64 {
    300
}

fn default_cleanup_interval_secs() -> u64 {
    3600
}

fn default_cache_max_entries() -> usize {
    20_000
}

fn default_cache_ttl_secs() -> u64 {
    30 * 60
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_read_timeout_ms() -> u64 {
    10_000
}

fn default_mirror_workers() -> usize {
    2
}

fn default_firing_exercise_days() -> u64 {
    7
}

fn default_user_agent() -> String {
    "navwarn/0.1".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            repo_root: default_repo_root(),
            remote_url: None,
            refresh_interval_secs: default_refresh_interval_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            cache_max_entries: default_cache_max_entries(),
            cache_ttl_secs: default_cache_ttl_secs(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            mirror_workers: default_mirror_workers(),
            firing_exercise_days: default_firing_exercise_days(),
            user_agent: default_user_agent(),
        }
    }
}

impl AppConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or validation
    /// fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("NAVWARN_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("NAVWARN_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self =
            figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The remote server URL, required when the remote provider is used.
    pub fn require_remote_url(&self) -> Result<&str, ConfigError> {
        self.remote_url.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "remote_url".into(),
            hint: "Set NAVWARN_REMOTE_URL environment variable".into(),
        })
    }
}
