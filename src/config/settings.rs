//! Configuration settings structures for vistagram
//!
//! All structures can be loaded from TOML files and environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "vistagram".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/vistagram.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_access_token_expiration() -> i64 {
    30
}

fn default_cache_max_entries() -> usize {
    100_000
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_redis_pool_size() -> u32 {
    8
}

fn default_redis_connection_timeout() -> u64 {
    5
}

fn default_redis_key_prefix() -> String {
    "vistagram".to_string()
}

fn default_session_ttl() -> u64 {
    3600
}

fn default_online_ttl() -> u64 {
    300
}

fn default_snapshot_ttl() -> u64 {
    300
}

fn default_per_page() -> u32 {
    20
}

fn default_max_per_page() -> u32 {
    100
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_max_file_size() -> usize {
    10 * 1024 * 1024 // 10MB
}

fn default_allowed_extensions() -> Vec<String> {
    [".jpg", ".jpeg", ".png", ".gif"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_url_prefix() -> String {
    "/uploads".to_string()
}

fn default_frontend_url() -> String {
    "http://localhost:5173".to_string()
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Database Configuration
// ============================================================================

/// Diesel database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[serde(default)]
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of idle connections kept in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,

    /// Whether to automatically run pending migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout: default_connection_timeout(),
            auto_migrate: false,
        }
    }
}

// ============================================================================
// JWT Configuration
// ============================================================================

/// JWT authentication configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    /// IMPORTANT: use a strong random value supplied through the environment
    #[serde(default)]
    pub secret: String,

    /// Access token lifetime in minutes
    #[serde(default = "default_access_token_expiration")]
    pub access_token_expiration: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            access_token_expiration: default_access_token_expiration(),
        }
    }
}

impl JwtConfig {
    /// Token lifetime in seconds, used for session and blacklist TTLs.
    pub fn access_token_ttl_seconds(&self) -> u64 {
        (self.access_token_expiration.max(0) as u64) * 60
    }
}

// ============================================================================
// Logger Settings
// ============================================================================

/// Console output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            colored: true,
        }
    }
}

/// File output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_path")]
    pub path: String,

    #[serde(default = "default_true")]
    pub append: bool,

    /// Output format: "full", "compact", "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: true,
            format: default_log_format(),
        }
    }
}

/// Logger configuration as it appears in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub console: ConsoleSettings,

    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Convert the file representation into the runtime `LoggerConfig`.
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let format = self
            .file
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::validation("logger.file.format".to_string(), e.to_string()))?;

        let console = ConsoleConfig::new(self.console.enabled, self.console.colored);
        let file = FileConfig::new(
            self.file.enabled,
            PathBuf::from(self.file.path),
            self.file.append,
            format,
        );

        LoggerConfig::new(console, file, self.level)
            .map_err(|e| ConfigError::validation("logger".to_string(), e.to_string()))
    }
}

// ============================================================================
// Cache Configuration
// ============================================================================

/// Cache transport type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

/// In-process cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
    /// Upper bound on stored keys; writes beyond it are rejected as transport errors
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_cache_max_entries(),
        }
    }
}

/// Redis cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisCacheConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,

    #[serde(default = "default_redis_pool_size")]
    pub pool_size: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_redis_connection_timeout")]
    pub connection_timeout: u64,

    /// Key prefix for all cache entries
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            connection_timeout: default_redis_connection_timeout(),
            key_prefix: default_redis_key_prefix(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// When false every cache call is a miss and the Store serves everything
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub backend: CacheBackend,

    /// Default session lifetime in seconds
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: u64,

    /// How long a user counts as online after their last login
    #[serde(default = "default_online_ttl")]
    pub online_ttl_seconds: u64,

    #[serde(default)]
    pub memory: MemoryCacheConfig,

    #[serde(default)]
    pub redis: RedisCacheConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::default(),
            session_ttl_seconds: default_session_ttl(),
            online_ttl_seconds: default_online_ttl(),
            memory: MemoryCacheConfig::default(),
            redis: RedisCacheConfig::default(),
        }
    }
}

// ============================================================================
// Timeline / Uploads / Sharing
// ============================================================================

/// Timeline assembly configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Lifetime of a cached timeline page
    #[serde(default = "default_snapshot_ttl")]
    pub snapshot_ttl_seconds: u64,

    #[serde(default = "default_per_page")]
    pub default_per_page: u32,

    #[serde(default = "default_max_per_page")]
    pub max_per_page: u32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl_seconds: default_snapshot_ttl(),
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
        }
    }
}

/// Image upload configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_upload_dir")]
    pub directory: String,

    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Lowercase extensions including the leading dot
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Public URL prefix under which stored images are served
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            directory: default_upload_dir(),
            max_file_size: default_max_file_size(),
            allowed_extensions: default_allowed_extensions(),
            url_prefix: default_url_prefix(),
        }
    }
}

/// Share link configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharingConfig {
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            frontend_url: default_frontend_url(),
        }
    }
}

/// Cache reconciliation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Repopulate the cache from the database when the worker starts
    #[serde(default = "default_true")]
    pub run_on_startup: bool,

    /// Optional cron expression (with seconds) for periodic runs
    #[serde(default)]
    pub schedule: Option<String>,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            run_on_startup: true,
            schedule: None,
        }
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub jwt: JwtConfig,

    #[serde(default)]
    pub logger: LoggerSettings,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub timeline: TimelineConfig,

    #[serde(default)]
    pub uploads: UploadConfig,

    #[serde(default)]
    pub sharing: SharingConfig,

    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_timeline_config() -> impl Strategy<Value = TimelineConfig> {
        (1u64..=3600u64, 1u32..=50u32, 50u32..=500u32).prop_map(
            |(snapshot_ttl_seconds, default_per_page, max_per_page)| TimelineConfig {
                snapshot_ttl_seconds,
                default_per_page,
                max_per_page,
            },
        )
    }

    fn arb_cache_config() -> impl Strategy<Value = CacheConfig> {
        (
            any::<bool>(),
            prop_oneof![Just(CacheBackend::Memory), Just(CacheBackend::Redis)],
            1usize..=1_000_000usize,
            "[a-z]{1,12}",
            1u64..=86_400u64,
        )
            .prop_map(
                |(enabled, backend, max_entries, key_prefix, session_ttl_seconds)| CacheConfig {
                    enabled,
                    backend,
                    memory: MemoryCacheConfig { max_entries },
                    redis: RedisCacheConfig {
                        key_prefix,
                        ..RedisCacheConfig::default()
                    },
                    session_ttl_seconds,
                    online_ttl_seconds: default_online_ttl(),
                },
            )
    }

    proptest! {
        #[test]
        fn prop_cache_config_toml_round_trip(config in arb_cache_config()) {
            let text = toml::to_string(&config).unwrap();
            let parsed: CacheConfig = toml::from_str(&text).unwrap();
            prop_assert_eq!(parsed, config);
        }

        #[test]
        fn prop_timeline_config_toml_round_trip(config in arb_timeline_config()) {
            let text = toml::to_string(&config).unwrap();
            let parsed: TimelineConfig = toml::from_str(&text).unwrap();
            prop_assert_eq!(parsed, config);
        }
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.timeline.snapshot_ttl_seconds, 300);
        assert_eq!(settings.timeline.default_per_page, 20);
        assert_eq!(settings.uploads.max_file_size, 10 * 1024 * 1024);
        assert!(settings.uploads.allowed_extensions.contains(&".png".to_string()));
        assert_eq!(settings.jwt.access_token_ttl_seconds(), 30 * 60);
        assert!(settings.cache.enabled);
        assert_eq!(settings.cache.backend, CacheBackend::Memory);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.cache, CacheConfig::default());
        assert_eq!(settings.reconciliation, ReconciliationConfig::default());
    }

    #[test]
    fn test_shipped_default_toml_matches_defaults() {
        let settings: Settings = toml::from_str(include_str!("../../config/default.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_backend_parses_lowercase() {
        let config: CacheConfig = toml::from_str("backend = \"redis\"").unwrap();
        assert_eq!(config.backend, CacheBackend::Redis);
    }

    #[test]
    fn test_logger_settings_into_config() {
        let settings = LoggerSettings {
            level: "debug".to_string(),
            ..LoggerSettings::default()
        };
        let config = settings.into_logger_config().unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.file.format, LogFormat::Json);
    }

    #[test]
    fn test_logger_settings_rejects_unknown_format() {
        let mut settings = LoggerSettings::default();
        settings.file.format = "xml".to_string();
        assert!(settings.into_logger_config().is_err());
    }
}
