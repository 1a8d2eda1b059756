//! Structured logging setup for reqsmith
//!
//! Logging goes through the `tracing` ecosystem and is written to stderr, so
//! stdout stays free for command output (`plan --format json` and friends).
//!
//! # Configuration sources
//!
//! In order of precedence:
//!
//! - `--log-level`, then `-v` / `-q` on the command line
//! - `REQSMITH_LOG_LEVEL` (trace, debug, info, warn, error)
//! - `RUST_LOG`, which replaces the generated filter entirely when set
//!
//! `REQSMITH_LOG_JSON=true` switches to JSON lines.
//!
//! # Example
//!
//! ```no_run
//! use reqsmith::util::logging;
//! use tracing::{info, warn};
//!
//! logging::init_from_env();
//!
//! info!(file = "requirements.txt", "Installing requirements");
//! warn!(phase = "deploy", "Unknown phase, treating as disabled");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level to display
    pub level: Level,

    /// Use JSON output format
    pub use_json: bool,

    /// Include the module target (e.g., reqsmith::installer) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    /// INFO level, plain text, with targets and without locations
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Resolves the level from command-line flags, falling back to
    /// `env_level` and then to INFO.
    ///
    /// ```
    /// use reqsmith::util::LoggingConfig;
    /// use tracing::Level;
    ///
    /// let config = LoggingConfig::from_flags(None, true, false, None);
    /// assert_eq!(config.level, Level::DEBUG);
    /// ```
    pub fn from_flags(
        log_level: Option<&str>,
        verbose: bool,
        quiet: bool,
        env_level: Option<&str>,
    ) -> Self {
        let level = if let Some(level) = log_level {
            parse_level(level)
        } else if verbose {
            Level::DEBUG
        } else if quiet {
            Level::ERROR
        } else {
            env_level.map(parse_level).unwrap_or(Level::INFO)
        };

        Self::with_level(level)
    }

    pub fn json(mut self, use_json: bool) -> Self {
        self.use_json = use_json;
        self
    }

    /// `EnvFilter` directives for this configuration
    pub fn directives(&self) -> String {
        format!(
            "{}={}",
            env!("CARGO_CRATE_NAME"),
            self.level.to_string().to_lowercase()
        )
    }
}

/// Parses a log level from a string
///
/// Unknown values fall back to INFO with a note on stderr.
///
/// ```
/// use reqsmith::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("WARN"), Level::WARN);
/// assert_eq!(parse_level("loud"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Initializes the logging system. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = if env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(config.directives())
        };

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    });
}

/// Initializes logging from `REQSMITH_LOG_LEVEL` and `REQSMITH_LOG_JSON`
pub fn init_from_env() {
    let level = env::var("REQSMITH_LOG_LEVEL").ok();
    let config = LoggingConfig::from_flags(None, false, false, level.as_deref()).json(json_from_env());
    init_logging(config);
}

/// Whether `REQSMITH_LOG_JSON` asks for JSON output
pub fn json_from_env() -> bool {
    env::var("REQSMITH_LOG_JSON")
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
