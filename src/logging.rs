//! Structured logging setup
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the application. [`init_logging`] is the stock setup used by the demo
//! binary: an `EnvFilter` plus a JSON or pretty `fmt` layer on stdout.
//!
//! ## Environment Variables
//!
//! - `SOL_LOG_LEVEL`: `trace` | `debug` | `info` | `warn` | `error` (default `info`)
//! - `SOL_LOG_FORMAT`: `json` | `pretty` (default `pretty`)
//! - `SOL_LOG_TARGETS`: extra comma-separated filter directives
//! - `SOL_LOG_LOCATION`: `true` to include file and line
//!
//! `RUST_LOG`, when set, replaces the level entirely.

use std::env;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format of the `fmt` layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Anything other than `json` selects the pretty format.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Extra filter directives, comma-separated (`sol::router=debug,...`)
    pub target_filter: Option<String>,
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Pretty,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: env::var("SOL_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: env::var("SOL_LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.format),
            target_filter: env::var("SOL_LOG_TARGETS").ok().filter(|s| !s.is_empty()),
            include_location: env::var("SOL_LOG_LOCATION")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.include_location),
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_ascii_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));

        // accept-loop chatter from the transport is rarely useful
        if let Ok(directive) = "may_minihttp=warn".parse() {
            filter = filter.add_directive(directive);
        }

        if let Some(targets) = &self.target_filter {
            for raw in targets.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                match raw.parse() {
                    Ok(directive) => filter = filter.add_directive(directive),
                    Err(_) => eprintln!("Warning: invalid log filter directive: {raw}"),
                }
            }
        }
        filter
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
///
/// ```no_run
/// use sol::logging::{init_logging, LogConfig};
///
/// init_logging(&LogConfig::from_env()).expect("logging already initialised");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")
}
