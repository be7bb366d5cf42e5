//! Courtside Logging
//!
//! Installs a `tracing` subscriber configured from `COURTSIDE_*` environment
//! variables. Library crates only emit `tracing` events; binaries call
//! [`init`] once at startup.
//!
//! # Usage
//!
//! ```rust,no_run
//! courtside_log::init().expect("logging already initialized");
//! tracing::info!(port = 8080, "Server started");
//! ```
//!
//! # Environment Variables
//!
//! - `COURTSIDE_DEBUG=1` - Enable debug logging
//! - `COURTSIDE_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `COURTSIDE_LOG_FORMAT=pretty|compact|json` - Set output format
//! - `COURTSIDE_LOG_COLOR=1|0` - Enable/disable colors
//!
//! `RUST_LOG`, when set, replaces the level-derived filter entirely.

use std::env;
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry};

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum level of emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Trace level (most verbose)
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warning level
    Warn,
    /// Error level
    Error,
    /// No logging
    Off,
}

impl Level {
    /// Directive understood by `EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl FromStr for Level {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "off" | "none" => Ok(Level::Off),
            _ => Err(UnknownValue(s.to_string())),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_directive())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human format
    Pretty,
    /// Single-line human format
    Compact,
    /// Newline-delimited JSON
    Json,
}

impl FromStr for Format {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "compact" => Ok(Format::Compact),
            "json" => Ok(Format::Json),
            _ => Err(UnknownValue(s.to_string())),
        }
    }
}

/// An unrecognized level or format name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownValue(pub String);

impl fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

impl std::error::Error for UnknownValue {}

// ============================================================================
// Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether colors are enabled
    pub color: bool,
    /// Whether to include the event target
    pub target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Compact,
            color: false,
            target: true,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| {
            lookup(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        };

        let debug = flag("COURTSIDE_DEBUG").unwrap_or(false);

        let level = lookup("COURTSIDE_LOG_LEVEL")
            .and_then(|s| s.parse().ok())
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("COURTSIDE_LOG_FORMAT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(Format::Compact);

        let color = flag("COURTSIDE_LOG_COLOR")
            .unwrap_or_else(|| lookup("NO_COLOR").is_none() && lookup("TERM").is_some());

        Self {
            debug,
            level,
            format,
            color: color && format != Format::Json,
            target: true,
        }
    }

    /// Set the level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the format.
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable colors.
    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Filter used when `RUST_LOG` is not set.
    pub fn default_filter(&self) -> EnvFilter {
        EnvFilter::new(self.level.as_directive())
    }

    /// Install this configuration as the global subscriber.
    pub fn try_init(&self) -> Result<(), TryInitError> {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| self.default_filter());

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            Format::Pretty => tracing_subscriber::fmt::layer()
                .pretty()
                .with_ansi(self.color)
                .with_target(self.target)
                .with_writer(std::io::stderr)
                .boxed(),
            Format::Compact => tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(self.color)
                .with_target(self.target)
                .with_writer(std::io::stderr)
                .boxed(),
            Format::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_target(self.target)
                .with_writer(std::io::stderr)
                .boxed(),
        };

        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init()
    }
}

/// Initialize logging from the environment.
pub fn init() -> Result<(), TryInitError> {
    LogConfig::from_env().try_init()
}

// ============================================================================
// Tests
// ============================================================================
