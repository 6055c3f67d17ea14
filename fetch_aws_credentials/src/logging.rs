//! Support for structured logging.

use std::{io::stderr, str::FromStr};

use anyhow::{format_err, Error, Result};
use tracing_subscriber::EnvFilter;

/// What log format we should use.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum LogFormat {
    /// Pretty, indented logs.
    Indented,
    /// Single-line log entries with all keys on each line.
    Flat,
    /// JSON records.
    Json,
}

impl LogFormat {
    /// Install a global `tracing` subscriber which writes to standard error.
    ///
    /// Filtering is controlled by `RUST_LOG`, and defaults to `warn`.
    pub(crate) fn install(self) -> Result<()> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn"));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(stderr);
        match self {
            Self::Indented => builder.pretty().try_init(),
            Self::Flat => builder.try_init(),
            Self::Json => builder.json().try_init(),
        }
        .map_err(|err| format_err!("could not set up logging: {}", err))
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "indented" => Ok(LogFormat::Indented),
            "flat" => Ok(LogFormat::Flat),
            "json" => Ok(LogFormat::Json),
            _ => Err(format_err!("unknown log format: {}", s)),
        }
    }
}
