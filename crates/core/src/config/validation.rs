//! Configuration validation rules.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_max_entries` or `cache_ttl_secs` is 0
    /// - an interval or timeout is outside its sane bounds
    /// - `mirror_workers` is 0 or exceeds 16
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_max_entries == 0 {
            return Err(invalid("cache_max_entries", "must be greater than 0"));
        }
        if self.cache_ttl_secs == 0 {
            return Err(invalid("cache_ttl_secs", "must be greater than 0"));
        }

        if self.refresh_interval_secs < 10 {
            return Err(invalid("refresh_interval_secs", "must be at least 10 seconds"));
        }
        if self.cleanup_interval_secs < 60 {
            return Err(invalid("cleanup_interval_secs", "must be at least 60 seconds"));
        }

        if self.connect_timeout_ms < 100 || self.connect_timeout_ms > 60_000 {
            return Err(invalid("connect_timeout_ms", "must be between 100ms and 60s"));
        }
        if self.read_timeout_ms < 100 || self.read_timeout_ms > 300_000 {
            return Err(invalid("read_timeout_ms", "must be between 100ms and 5 minutes"));
        }

        if self.mirror_workers == 0 || self.mirror_workers > 16 {
            return Err(invalid("mirror_workers", "must be between 1 and 16"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if let Some(url) = &self.remote_url
            && !url.starts_with("http://")
            && !url.starts_with("https://")
        {
            return Err(invalid("remote_url", "must be an http(s) URL"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_cache_entries() {
        let config = AppConfig { cache_max_entries: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_max_entries"));
    }

    #[test]
    fn test_validate_refresh_interval_too_small() {
        let config = AppConfig { refresh_interval_secs: 5, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "refresh_interval_secs"));
    }

    #[test]
    fn test_validate_worker_bounds() {
        let config = AppConfig { mirror_workers: 0, ..Default::default() };
        assert!(config.validate().is_err());
        let config = AppConfig { mirror_workers: 17, ..Default::default() };
        assert!(config.validate().is_err());
        let config = AppConfig { mirror_workers: 16, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_remote_url_scheme() {
        let config = AppConfig { remote_url: Some("ftp://example.org".into()), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "remote_url"));

        let config = AppConfig { remote_url: Some("https://example.org".into()), ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
