//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, MAX_TTL_SECS};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `scope_url` does not parse or is not http(s)
    /// - `cache_prefix` or `cache_version` is empty or contains whitespace
    /// - `precache_manifest` is empty
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `sweep_interval_ms` is under one second
    /// - `user_agent` is empty
    /// - any `ttl_*_secs` exceeds [`MAX_TTL_SECS`]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scope = self.scope()?;
        if !matches!(scope.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid { field: "scope_url".into(), reason: "must be http or https".into() });
        }

        for (field, value) in [("cache_prefix", &self.cache_prefix), ("cache_version", &self.cache_version)] {
            if value.is_empty() || value.chars().any(char::is_whitespace) {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: "must be non-empty and contain no whitespace".into(),
                });
            }
        }

        if self.precache_manifest.is_empty() {
            return Err(ConfigError::Invalid {
                field: "precache_manifest".into(),
                reason: "must list at least the root document".into(),
            });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.sweep_interval_ms < 1_000 {
            return Err(ConfigError::Invalid {
                field: "sweep_interval_ms".into(),
                reason: "must be at least 1000ms".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        for (field, secs) in [
            ("ttl_taxonomy_secs", self.ttl_taxonomy_secs),
            ("ttl_content_secs", self.ttl_content_secs),
            ("ttl_volatile_secs", self.ttl_volatile_secs),
        ] {
            if secs > MAX_TTL_SECS {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: format!("must not exceed one week ({MAX_TTL_SECS}s)"),
                });
            }
        }

        if self.ttl_volatile_secs > self.ttl_content_secs || self.ttl_content_secs > self.ttl_taxonomy_secs {
            tracing::warn!(
                taxonomy = self.ttl_taxonomy_secs,
                content = self.ttl_content_secs,
                volatile = self.ttl_volatile_secs,
                "TTL table is not ordered taxonomy >= content >= volatile"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_scope() {
        let config = AppConfig { scope_url: "not a url".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "scope_url"));
    }

    #[test]
    fn test_validate_non_http_scope() {
        let config = AppConfig { scope_url: "ftp://example.com/".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "scope_url"));
    }

    #[test]
    fn test_validate_empty_version() {
        let config = AppConfig { cache_version: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_version"));
    }

    #[test]
    fn test_validate_prefix_with_whitespace() {
        let config = AppConfig { cache_prefix: "my app".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_prefix"));
    }

    #[test]
    fn test_validate_empty_manifest() {
        let config = AppConfig { precache_manifest: Vec::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "precache_manifest"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = AppConfig { timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_sweep_interval() {
        let config = AppConfig { sweep_interval_ms: 999, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "sweep_interval_ms"));
    }

    #[test]
    fn test_validate_ttl_ceiling() {
        let config = AppConfig { ttl_taxonomy_secs: u64::MAX, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "ttl_taxonomy_secs"));

        let config = AppConfig { ttl_taxonomy_secs: MAX_TTL_SECS, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }
}
