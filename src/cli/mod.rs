//! CLI module for vistagram
//!
//! This module provides command-line interface functionality including:
//! - Argument parsing with clap
//! - Configuration merging (CLI args + config files)
//! - Command handlers for migrate, sync, cache and worker

pub mod config_merger;
pub mod executor;
pub mod handlers;
pub mod parser;
pub mod validation;

pub use config_merger::ConfigurationMerger;
pub use executor::execute_command;
pub use parser::{CacheCommand, Cli, Commands, Environment};

use crate::config::settings::Settings;
use crate::logger::init_logger;

/// Load configuration and apply CLI overrides
///
/// # Errors
/// Returns error if configuration files cannot be read or parsed
pub fn load_and_merge_config(cli: &Cli) -> anyhow::Result<Settings> {
    let merger = ConfigurationMerger::from_cli(cli)?;
    Ok(merger.merge_cli_args(cli))
}

/// Initialize logger from settings
///
/// # Errors
/// Returns error if the logger section is invalid or a subscriber is already set
pub fn init_logger_from_settings(settings: &Settings) -> anyhow::Result<()> {
    settings.logger.validate()?;
    let logger_config = settings.logger.clone().into_logger_config()?;
    init_logger(logger_config)
}
