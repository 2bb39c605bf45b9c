//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::registry::DuplicatePolicy;

/// Filter used when verbose logging is on.
pub const VERBOSE_LOG_DIRECTIVE: &str = "endpoint_registry=debug,info";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Server Configuration ===
    /// Address to bind the HTTP server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    // === Discovery Document ===
    /// Name reported by the discovery document.
    #[serde(default = "default_api_name")]
    pub api_name: String,

    /// Version reported by the discovery document.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Path the discovery document is served on.
    #[serde(default = "default_discovery_path")]
    pub discovery_path: String,

    // === Cache ===
    /// TTL applied when a cache write does not specify one.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_default_ttl_ms: u64,

    /// TTL of the memoized `/api/stats` summary.
    #[serde(default = "default_stats_ttl_ms")]
    pub stats_ttl_ms: u64,

    // === Module Loading ===
    /// What to do when two modules claim the same route.
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,

    /// Absolute directory scanned for JSON endpoint manifests.
    #[serde(default)]
    pub module_dir: Option<PathBuf>,

    // === Optional Surfaces ===
    /// Install the Prometheus recorder and serve `/metrics`.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Serve the generated OpenAPI document.
    #[serde(default = "default_true")]
    pub openapi_enabled: bool,

    // === Logging ===
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_api_name() -> String {
    "endpoint-registry".to_string()
}

fn default_api_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_discovery_path() -> String {
    "/api/".to_string()
}

fn default_cache_ttl_ms() -> u64 {
    5 * 60 * 1000 // five minutes
}

fn default_stats_ttl_ms() -> u64 {
    60 * 1000
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_name: default_api_name(),
            api_version: default_api_version(),
            discovery_path: default_discovery_path(),
            cache_default_ttl_ms: default_cache_ttl_ms(),
            stats_ttl_ms: default_stats_ttl_ms(),
            duplicate_policy: DuplicatePolicy::default(),
            module_dir: None,
            metrics_enabled: default_true(),
            openapi_enabled: default_true(),
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Ok(envy::from_env()?)
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(invalid("PORT must be non-zero"));
        }

        if !self.discovery_path.starts_with('/') {
            return Err(invalid("DISCOVERY_PATH must start with '/'"));
        }

        if self.cache_default_ttl_ms == 0 {
            return Err(invalid("CACHE_DEFAULT_TTL_MS must be greater than zero"));
        }

        if let Some(dir) = &self.module_dir {
            if !dir.is_absolute() {
                return Err(invalid(format!(
                    "MODULE_DIR must be an absolute path, got {}",
                    dir.display()
                )));
            }
        }

        Ok(())
    }

    /// Tracing filter directive. `--verbose` or `VERBOSE=true` wins over
    /// `RUST_LOG`.
    pub fn log_directive(&self, verbose_flag: bool) -> &str {
        if verbose_flag || self.verbose {
            VERBOSE_LOG_DIRECTIVE
        } else {
            &self.rust_log
        }
    }

    /// Default cache TTL as a duration.
    pub fn cache_default_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_default_ttl_ms)
    }

    /// Stats summary TTL as a duration.
    pub fn stats_ttl(&self) -> Duration {
        Duration::from_millis(self.stats_ttl_ms)
    }
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::InvalidConfig(message.into())
}
