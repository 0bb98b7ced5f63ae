//! Configuration validation logic
//!
//! Each section validates itself; `Settings::validate` runs them in order and
//! stops at the first failure.

use crate::config::error::ConfigError;
use crate::config::settings::{
    CacheBackend, CacheConfig, DatabaseConfig, JwtConfig, LoggerSettings, ReconciliationConfig,
    Settings, SharingConfig, TimelineConfig, UploadConfig,
};

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

const MIN_JWT_SECRET_LEN: usize = 32;

impl DatabaseConfig {
    /// # Validation Rules
    /// - URL must be a `postgres://` or `postgresql://` URL
    /// - Max connections must be greater than 0 and not below min connections
    /// - Connection timeout must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::validation(
                "database.url",
                "Database URL is required. Set VISTAGRAM_DATABASE__URL or database.url.",
            ));
        }

        if !(self.url.starts_with("postgres://") || self.url.starts_with("postgresql://")) {
            return Err(ConfigError::validation(
                "database.url",
                "Invalid database URL. Expected postgres://[user:password@]host[:port]/database",
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_connections",
                "Max connections must be greater than 0.",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::validation(
                "database.min_connections",
                "Min connections cannot exceed max connections.",
            ));
        }

        if self.connection_timeout == 0 {
            return Err(ConfigError::validation(
                "database.connection_timeout",
                "Connection timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl JwtConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::validation(
                "jwt.secret",
                "JWT secret cannot be empty",
            ));
        }

        if self.secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::validation(
                "jwt.secret",
                "JWT secret should be at least 32 characters",
            ));
        }

        if self.access_token_expiration <= 0 {
            return Err(ConfigError::validation(
                "jwt.access_token_expiration",
                "Access token expiration must be positive",
            ));
        }

        Ok(())
    }
}

impl LoggerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.level.to_lowercase();
        // EnvFilter directives such as "vistagram=debug,info" are accepted as-is
        if !level.contains('=') && !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::validation(
                "logger.level".to_string(),
                format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.file.format.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.file.format".to_string(),
                format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.file.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            ));
        }

        if self.file.enabled && self.file.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path cannot be empty when file output is enabled",
            ));
        }

        if !self.console.enabled && !self.file.enabled {
            return Err(ConfigError::validation(
                "logger",
                "At least one output (console or file) must be enabled",
            ));
        }

        Ok(())
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }

        match self.backend {
            CacheBackend::Memory => {
                if self.memory.max_entries == 0 {
                    return Err(ConfigError::validation(
                        "cache.memory.max_entries",
                        "Max entries must be greater than 0",
                    ));
                }
            }
            CacheBackend::Redis => {
                let url = &self.redis.url;
                if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
                    return Err(ConfigError::validation(
                        "cache.redis.url",
                        "Redis URL must start with redis:// or rediss://",
                    ));
                }
                if self.redis.pool_size == 0 {
                    return Err(ConfigError::validation(
                        "cache.redis.pool_size",
                        "Pool size must be greater than 0",
                    ));
                }
                if self.redis.key_prefix.is_empty() || self.redis.key_prefix.contains('*') {
                    return Err(ConfigError::validation(
                        "cache.redis.key_prefix",
                        "Key prefix must be non-empty and must not contain '*'",
                    ));
                }
            }
        }

        if self.session_ttl_seconds == 0 {
            return Err(ConfigError::validation(
                "cache.session_ttl_seconds",
                "Session TTL must be greater than 0",
            ));
        }

        if self.online_ttl_seconds == 0 {
            return Err(ConfigError::validation(
                "cache.online_ttl_seconds",
                "Online TTL must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl TimelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snapshot_ttl_seconds == 0 {
            return Err(ConfigError::validation(
                "timeline.snapshot_ttl_seconds",
                "Snapshot TTL must be greater than 0",
            ));
        }

        if self.max_per_page == 0 {
            return Err(ConfigError::validation(
                "timeline.max_per_page",
                "Max page size must be greater than 0",
            ));
        }

        if self.default_per_page == 0 || self.default_per_page > self.max_per_page {
            return Err(ConfigError::validation(
                "timeline.default_per_page",
                "Default page size must be between 1 and max_per_page",
            ));
        }

        Ok(())
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directory.trim().is_empty() {
            return Err(ConfigError::validation(
                "uploads.directory",
                "Upload directory cannot be empty",
            ));
        }

        if self.max_file_size == 0 {
            return Err(ConfigError::validation(
                "uploads.max_file_size",
                "Max file size must be greater than 0",
            ));
        }

        if self.allowed_extensions.is_empty() {
            return Err(ConfigError::validation(
                "uploads.allowed_extensions",
                "At least one extension must be allowed",
            ));
        }

        if let Some(bad) = self
            .allowed_extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(ConfigError::validation(
                "uploads.allowed_extensions".to_string(),
                format!("Extension '{}' must start with '.'", bad),
            ));
        }

        Ok(())
    }
}

impl SharingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.frontend_url.starts_with("http://") || self.frontend_url.starts_with("https://"))
        {
            return Err(ConfigError::validation(
                "sharing.frontend_url",
                "Frontend URL must be an http(s) URL",
            ));
        }
        Ok(())
    }
}

impl ReconciliationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(schedule) = &self.schedule {
            // tokio-cron-scheduler expects 6 or 7 fields (seconds first)
            let fields = schedule.split_whitespace().count();
            if !(6..=7).contains(&fields) {
                return Err(ConfigError::validation(
                    "reconciliation.schedule".to_string(),
                    format!(
                        "Cron expression '{}' must have 6 or 7 fields (sec min hour day month weekday [year])",
                        schedule
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl Settings {
    /// Validate every section of the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.jwt.validate()?;
        self.logger.validate()?;
        self.cache.validate()?;
        self.timeline.validate()?;
        self.uploads.validate()?;
        self.sharing.validate()?;
        self.reconciliation.validate()?;
        Ok(())
    }
}
