//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
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

/// Version marker embedded in every generation name. Bumping it forces a clean slate.
pub const DEFAULT_CACHE_VERSION: &str = "v1";

/// Longest TTL any response cache entry may carry: one week.
pub const MAX_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin and path the interception layer controls.
    ///
    /// Set via SWCACHE_SCOPE_URL environment variable.
    #[serde(default = "default_scope_url")]
    pub scope_url: String,

    /// Path to the SQLite generation store.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Prefix shared by every generation name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version tag for the current deployment.
    ///
    /// Set via SWCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Paths fetched eagerly into the precache at install, relative to `scope_url`.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SWCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Base URL of the REST backend. Defaults to `{scope_url}api/v1` when unset.
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Interval of the response cache's background expiry sweep, in milliseconds.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// TTL for rarely-changing taxonomy endpoints (categories, tags).
    #[serde(default = "default_ttl_taxonomy_secs")]
    pub ttl_taxonomy_secs: u64,

    /// TTL for content listings and details.
    #[serde(default = "default_ttl_content_secs")]
    pub ttl_content_secs: u64,

    /// TTL for high-churn counters and notifications.
    #[serde(default = "default_ttl_volatile_secs")]
    pub ttl_volatile_secs: u64,
}

fn default_scope_url() -> String {
    "http://localhost:8080/".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_cache_prefix() -> String {
    "app".into()
}

fn default_cache_version() -> String {
    DEFAULT_CACHE_VERSION.into()
}

fn default_precache_manifest() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/favicon.svg".into()]
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_sweep_interval_ms() -> u64 {
    60_000
}

fn default_ttl_taxonomy_secs() -> u64 {
    30 * 60
}

fn default_ttl_content_secs() -> u64 {
    5 * 60
}

fn default_ttl_volatile_secs() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scope_url: default_scope_url(),
            db_path: default_db_path(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            precache_manifest: default_precache_manifest(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            api_base_url: None,
            sweep_interval_ms: default_sweep_interval_ms(),
            ttl_taxonomy_secs: default_ttl_taxonomy_secs(),
            ttl_content_secs: default_ttl_content_secs(),
            ttl_volatile_secs: default_ttl_volatile_secs(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Background sweep interval as Duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Parsed scope URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `scope_url` does not parse.
    pub fn scope(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.scope_url)
            .map_err(|e| ConfigError::Invalid { field: "scope_url".into(), reason: e.to_string() })
    }

    /// REST backend base URL, derived from the scope when not configured.
    pub fn api_base(&self) -> String {
        match &self.api_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("{}/api/v1", self.scope_url.trim_end_matches('/')),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
