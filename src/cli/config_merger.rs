//! Configuration merger for CLI arguments and config files
//!
//! Loads the layered configuration and applies command-line overrides on
//! top. Validation is left to the command being run, since not every
//! command needs every section.

use std::path::Path;

use super::parser::{Cli, Commands};
use crate::config::error::ConfigError;
use crate::config::{ConfigLoader, settings::Settings};

/// Configuration merger that handles CLI argument integration with file-based configuration
pub struct ConfigurationMerger {
    base_config: Settings,
}

impl ConfigurationMerger {
    /// Create a new configuration merger with base configuration
    pub fn new(base_config: Settings) -> Self {
        Self { base_config }
    }

    /// Load configuration the way the CLI asked for it.
    ///
    /// # Errors
    /// Returns ConfigError if loading fails
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut loader = ConfigLoader::new()?;
        if let Some(env) = cli.env.clone() {
            loader = loader.with_environment(env.into());
        }
        if let Some(path) = cli.config.as_deref() {
            loader = loader.with_config_file(Path::new(path));
        }
        Ok(Self::new(loader.load()?))
    }

    /// Merge CLI arguments with the base configuration
    ///
    /// CLI arguments have highest priority; configuration file values are
    /// used as base.
    pub fn merge_cli_args(&self, cli: &Cli) -> Settings {
        let mut config = self.base_config.clone();

        if cli.verbose {
            config.logger.level = "debug".to_string();
        } else if cli.quiet {
            config.logger.level = "error".to_string();
        }

        if let Commands::Worker {
            schedule: Some(schedule),
            ..
        } = &cli.command
        {
            config.reconciliation.schedule = Some(schedule.clone());
        }

        config
    }

    /// Get the current configuration (useful for inspection)
    pub fn config(&self) -> &Settings {
        &self.base_config
    }
}
