//! Structured logging setup.
//!
//! Everything in this crate logs through `tracing`; nothing installs a
//! subscriber on its own. Applications call [`init_logging`] once at startup
//! (or install their own subscriber).
//!
//! ## Environment Variables
//!
//! | Variable | Values | Default |
//! |---|---|---|
//! | `BRRTW_LOG_LEVEL` | `trace` / `debug` / `info` / `warn` / `error` | `info` |
//! | `BRRTW_LOG_FORMAT` | `json` / `pretty` | `json` |
//! | `BRRTW_LOG_ASYNC` | `true` / `false` | `false` |
//! | `BRRTW_LOG_FILTER` | comma-separated `EnvFilter` directives | unset |
//!
//! `RUST_LOG`, when set, takes precedence over `BRRTW_LOG_LEVEL`.

use std::env;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::runtime_config::parse_bool;

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Write through a background thread (`tracing-appender`).
    pub async_logging: bool,
    /// Extra `EnvFilter` directives, comma-separated.
    pub target_filter: Option<String>,
    /// Include file:line in every event.
    pub include_location: bool,
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("BRRTW_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::parse(
                &env::var("BRRTW_LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
            ),
            async_logging: env::var("BRRTW_LOG_ASYNC")
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(false),
            target_filter: env::var("BRRTW_LOG_FILTER").ok(),
            include_location: false,
        }
    }

    /// Debug level, pretty output with locations.
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            target_filter: None,
            include_location: true,
        }
    }

    pub fn default_prod() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: true,
            target_filter: None,
            include_location: false,
        }
    }

    pub(crate) fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// The filter `init_logging` installs.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));

        if let Some(directives) = &self.target_filter {
            for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                let parsed = directive
                    .parse()
                    .with_context(|| format!("Invalid log filter directive: {directive}"))?;
                filter = filter.add_directive(parsed);
            }
        }
        Ok(filter)
    }
}

/// Keeps the background writer alive. Dropping it flushes pending events.
#[must_use = "dropping the guard stops the async log writer"]
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
}

/// Install the global `tracing` subscriber described by `config`.
///
/// ```no_run
/// use brrtwire::logging::{init_logging, LogConfig};
///
/// let _guard = init_logging(&LogConfig::from_env()).expect("logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuard> {
    let env_filter = config.env_filter()?;

    let (writer, worker) = if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(non_blocking), Some(guard))
    } else {
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout), None)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_list(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(LoggingGuard { _worker: worker })
}
