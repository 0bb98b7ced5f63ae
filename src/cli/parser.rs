//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, arguments, and their documentation.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Operator tooling for the vistagram photo timeline
#[derive(Parser, Debug)]
#[command(name = "vistagram")]
#[command(about = "Operator tooling for the vistagram photo timeline")]
#[command(long_about = "
Vistagram keeps like and share counters in a cache in front of PostgreSQL.
This tool manages the schema, repopulates the cache from the database and
inspects or flushes the cache.

EXAMPLES:
    # Apply pending migrations
    vistagram migrate

    # Preview pending migrations
    vistagram migrate --dry-run

    # Rebuild cached counters and like sets from the database
    vistagram sync

    # Check the cache and count keys per kind
    vistagram cache ping
    vistagram cache stats

    # Drop every cached key (counters come back after the next sync)
    vistagram cache flush --yes

    # Reconcile on startup, then every 10 minutes until Ctrl-C
    vistagram worker --schedule '0 */10 * * * *'
")]
#[command(version = crate::clap_long_version())]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    ///
    /// Load this single TOML file instead of the layered `config/` directory.
    /// Environment variables still override it.
    ///
    /// Example: --config /etc/vistagram/production.toml
    #[arg(
        short,
        long,
        value_name = "FILE",
        value_parser = super::validation::validate_config_file_path
    )]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects which `{environment}.toml` layer is loaded.
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Database migration operations
    ///
    /// Examples:
    ///   vistagram migrate                    # Apply all pending migrations
    ///   vistagram migrate --dry-run          # Show pending migrations without applying
    ///   vistagram migrate --rollback 3       # Rollback the last 3 migrations
    Migrate {
        /// Show pending migrations without applying
        #[arg(long, conflicts_with = "rollback")]
        dry_run: bool,

        /// Number of migrations to rollback (1 to 100)
        #[arg(
            long,
            value_name = "STEPS",
            conflicts_with = "dry_run",
            value_parser = super::validation::validate_rollback_steps
        )]
        rollback: Option<u32>,
    },

    /// Repopulate the cache from the database once
    ///
    /// Overwrites every post counter with the database values and re-adds
    /// every like to its user's like set. Safe to run under live traffic.
    Sync {
        /// Rows fetched per database round trip
        #[arg(long, value_name = "ROWS", value_parser = super::validation::validate_batch_size)]
        batch_size: Option<i64>,
    },

    /// Cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },

    /// Run reconciliation in the background until interrupted
    ///
    /// Reconciles once at startup when `reconciliation.run_on_startup` is set,
    /// then on every tick of the configured cron schedule.
    Worker {
        /// Cron expression with seconds, overrides `reconciliation.schedule`
        #[arg(long, value_name = "CRON")]
        schedule: Option<String>,

        /// Skip the startup reconciliation
        #[arg(long)]
        no_initial_sync: bool,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CacheCommand {
    /// Check that the cache answers
    Ping,
    /// Count keys per kind
    Stats,
    /// Delete every key in the cache namespace
    Flush {
        /// Confirm the flush
        #[arg(long)]
        yes: bool,
    },
}

/// Environment options
#[derive(ValueEnum, Clone, Debug)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_flag() {
        let err = Cli::try_parse_from(["vistagram", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["vistagram", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["vistagram"]).is_err());
    }

    #[test]
    fn test_migrate_command() {
        let cli = Cli::try_parse_from(["vistagram", "migrate", "--dry-run"]).unwrap();
        match cli.command {
            Commands::Migrate { dry_run, rollback } => {
                assert!(dry_run);
                assert!(rollback.is_none());
            }
            other => panic!("Expected Migrate command, got {:?}", other),
        }
    }

    #[test]
    fn test_migrate_flags_conflict() {
        let err = Cli::try_parse_from(["vistagram", "migrate", "--dry-run", "--rollback", "2"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_rollback_steps_bounds() {
        assert!(Cli::try_parse_from(["vistagram", "migrate", "--rollback", "0"]).is_err());
        assert!(Cli::try_parse_from(["vistagram", "migrate", "--rollback", "101"]).is_err());
    }

    #[test]
    fn test_sync_batch_size() {
        let cli = Cli::try_parse_from(["vistagram", "sync", "--batch-size", "250"]).unwrap();
        assert!(matches!(cli.command, Commands::Sync { batch_size: Some(250) }));
    }

    #[test]
    fn test_cache_flush_command() {
        let cli = Cli::try_parse_from(["vistagram", "cache", "flush", "--yes"]).unwrap();
        match cli.command {
            Commands::Cache { action } => assert_eq!(action, CacheCommand::Flush { yes: true }),
            other => panic!("Expected Cache command, got {:?}", other),
        }
    }

    #[test]
    fn test_worker_command() {
        let cli = Cli::try_parse_from([
            "vistagram",
            "--env",
            "prod",
            "worker",
            "--schedule",
            "0 0 * * * *",
        ])
        .unwrap();
        assert!(matches!(cli.env, Some(Environment::Production)));
        match cli.command {
            Commands::Worker {
                schedule,
                no_initial_sync,
            } => {
                assert_eq!(schedule.as_deref(), Some("0 0 * * * *"));
                assert!(!no_initial_sync);
            }
            other => panic!("Expected Worker command, got {:?}", other),
        }
    }

    #[test]
    fn test_conflicting_verbose_quiet() {
        let err = Cli::try_parse_from(["vistagram", "--verbose", "--quiet", "sync"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
