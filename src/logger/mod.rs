//! Logger Module
//!
//! A logging system based on `tracing-subscriber` with support for:
//! - Console output with color control
//! - File output in Full, Compact or JSON format

pub mod config;
pub mod error;
pub(crate) mod writer;


pub use config::*;
pub use error::LoggerError;

use std::io::IsTerminal;

use tracing::Subscriber;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use writer::LogFileWriter;

/// Fully assembled subscriber, ready to be installed or scoped in tests.
pub type BoxedSubscriber = Box<dyn Subscriber + Send + Sync + 'static>;

/// Initialize the global subscriber with the given configuration
pub fn init_logger(config: LoggerConfig) -> anyhow::Result<()> {
    build_subscriber(&config)?.try_init()?;
    Ok(())
}

/// Assemble the subscriber for a configuration without installing it.
pub fn build_subscriber(config: &LoggerConfig) -> anyhow::Result<BoxedSubscriber> {
    config.validate()?;

    let filter = config
        .env_filter()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let use_ansi = config.console.colored && std::io::stdout().is_terminal();

    match (config.console.enabled, config.file.enabled) {
        (true, true) => build_both(&config.file, use_ansi, filter),
        (true, false) => Ok(Box::new(
            tracing_subscriber::registry()
                .with(filter)
                .with(console_layer(use_ansi)),
        )),
        (false, true) => build_file_only(&config.file, filter),
        (false, false) => anyhow::bail!("At least one output (console or file) must be enabled"),
    }
}

fn console_layer<S>(use_ansi: bool) -> fmt::Layer<S> {
    fmt::layer()
        .with_ansi(use_ansi)
        .with_target(true)
        .with_level(true)
}

fn build_file_only(config: &FileConfig, filter: EnvFilter) -> anyhow::Result<BoxedSubscriber> {
    let writer = LogFileWriter::new(config)?;

    let subscriber: BoxedSubscriber = match config.format {
        LogFormat::Full => Box::new(
            tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(writer),
            ),
        ),
        LogFormat::Compact => Box::new(
            tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .compact()
                    .with_writer(writer),
            ),
        ),
        LogFormat::Json => Box::new(
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(false).json().with_writer(writer)),
        ),
    };

    Ok(subscriber)
}

fn build_both(
    config: &FileConfig,
    use_ansi: bool,
    filter: EnvFilter,
) -> anyhow::Result<BoxedSubscriber> {
    let writer = LogFileWriter::new(config)?;

    // File layer goes first so console ANSI codes do not leak into span fields
    // (tokio-rs/tracing#1817). The console layer is built per arm because its
    // subscriber type differs with the file format.
    let subscriber: BoxedSubscriber = match config.format {
        LogFormat::Full => Box::new(
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_ansi(false)
                        .with_target(true)
                        .with_writer(writer),
                )
                .with(console_layer(use_ansi)),
        ),
        LogFormat::Compact => Box::new(
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_ansi(false)
                        .with_target(true)
                        .compact()
                        .with_writer(writer),
                )
                .with(console_layer(use_ansi)),
        ),
        LogFormat::Json => Box::new(
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(false).json().with_writer(writer))
                .with(console_layer(use_ansi)),
        ),
    };

    Ok(subscriber)
}
