//! Structured logging configuration.

/// Environment variable holding the log filter directives.
pub const LOG_FILTER_ENV: &str = "BRANCHSWEEP_LOG";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `tracing_subscriber::EnvFilter` directives.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration, preferring `BRANCHSWEEP_LOG` for the filter.
    #[must_use]
    pub fn from_env(format: LogFormat, verbose: bool) -> Self {
        let filter = std::env::var(LOG_FILTER_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty());
        Self::resolve(format, verbose, filter)
    }

    /// Picks the filter: explicit directives win, then `--verbose`, then `info`.
    #[must_use]
    pub fn resolve(format: LogFormat, verbose: bool, filter: Option<String>) -> Self {
        let filter = filter.unwrap_or_else(|| {
            if verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });
        Self { format, filter }
    }
}
