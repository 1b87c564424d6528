//! Diagnostic logging via `tracing`, written to stderr so stdout stays
//! reserved for command output.
//!
//! Verbosity comes from the `-v` count unless `RUST_LOG` is set:
//! none is `warn`, `-v` is `info`, `-vv` is `debug`, more is `trace`.

use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{GlError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub with_ansi: bool,
}

impl LogConfig {
    pub fn from_verbosity(verbosity: u8, format: LogFormat) -> Self {
        let level = match verbosity {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            format,
            with_ansi: true,
        }
    }
}

/// Install the global subscriber. Call once, before any work starts.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = build_env_filter(config.level);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(config.with_ansi)
                    .with_target(false)
                    .without_time(),
            )
            .try_init(),
    };
    installed.map_err(|e| GlError::Other(format!("failed to initialise logging: {e}")))
}

fn build_env_filter(level: Level) -> EnvFilter {
    // RUST_LOG wins; otherwise our crate at `level`, dependencies at warn.
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_lowercase();
        EnvFilter::new(format!("warn,glprep={level}"))
    })
}
