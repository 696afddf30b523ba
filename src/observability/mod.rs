//! Logging Setup
//!
//! Settings come from environment variables so CI and local runs differ only
//! in their environment:
//!
//! - `RUST_LOG`: filter directives (default `info`)
//! - `LOG_FORMAT`: `pretty` (default) or `json`

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directives, `RUST_LOG` syntax
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        LogConfig {
            filter: std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string()),
            format: Self::parse_format(std::env::var("LOG_FORMAT").ok().as_deref()),
        }
    }

    fn parse_format(value: Option<&str>) -> LogFormat {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Install the global subscriber.
///
/// Returns false if one was already installed, which happens when several
/// tests in one binary each initialize logging.
pub fn init_logging(config: &LogConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_test_writer();
    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    result.is_ok()
}
