//! Configuration management for reqsmith
//!
//! Configuration is read once from environment variables into an immutable
//! [`InstallerConfig`] which is then passed to the resolver and installer.
//! Command-line flags are applied on top by the CLI.
//!
//! # Environment Variables
//!
//! - `REQSMITH_PKG_MGR`: Package manager (uv|pip|conda) - default: "uv"
//! - `REQSMITH_CONDA_ROOT`: Conda installation root - required when the manager is conda
//! - `REQSMITH_CONDA_ENV`: Conda environment name - optional
//! - `REQSMITH_INSTALL_SYSTEM`, `REQSMITH_INSTALL_DEV`, `REQSMITH_INSTALL_BASE`,
//!   `REQSMITH_INSTALL_TASK`: Phase enable flags - default: "true"
//! - `REQSMITH_ONLY_PIP`: Skip source builds unless overridden - default: "false"
//! - `REQSMITH_FORCE_REBUILD`: Rebuild packages that are already installed - default: "false"
//! - `REQSMITH_PIP_DEPS`: Comma-separated pip override list - default: empty
//! - `REQSMITH_SRC_DEPS`: Comma-separated source override list - default: empty
//! - `REQSMITH_RETRY_COUNT`: Attempts per command - default: "3"
//! - `REQSMITH_RETRY_DELAY`: Seconds between attempts - default: "5"
//! - `REQSMITH_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use reqsmith::InstallerConfig;
//!
//! let config = InstallerConfig::from_env().expect("invalid configuration");
//! config.validate().expect("invalid configuration");
//! println!("{}", config);
//! ```

use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default values for configuration
const DEFAULT_RETRY_COUNT: u32 = 3;
const DEFAULT_RETRY_DELAY_SECS: u64 = 5;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid package manager: {0}. Valid options: uv, pip, conda")]
    InvalidPackageManager(String),

    #[error("Unknown phase: {0}. Valid phases: system, dev, base, task")]
    UnknownPhase(String),

    #[error("Conda package manager selected but REQSMITH_CONDA_ROOT is not set")]
    MissingCondaRoot,

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Package manager used for installs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Uv,
    Pip,
    Conda,
}

impl PackageManager {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Uv => "uv",
            PackageManager::Pip => "pip",
            PackageManager::Conda => "conda",
        }
    }
}

impl FromStr for PackageManager {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uv" => Ok(PackageManager::Uv),
            "pip" => Ok(PackageManager::Pip),
            "conda" => Ok(PackageManager::Conda),
            _ => Err(ConfigError::InvalidPackageManager(s.to_string())),
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Named installation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    System,
    Dev,
    Base,
    Task,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::System, Phase::Dev, Phase::Base, Phase::Task];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::System => "system",
            Phase::Dev => "dev",
            Phase::Base => "base",
            Phase::Task => "task",
        }
    }

    /// Exact, case-sensitive lookup by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|phase| phase.as_str() == name)
    }
}

impl FromStr for Phase {
    type Err = ConfigError;

    /// Strict lookup: unknown names are an error
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "system" => Ok(Phase::System),
            "dev" => Ok(Phase::Dev),
            "base" => Ok(Phase::Base),
            "task" => Ok(Phase::Task),
            _ => Err(ConfigError::UnknownPhase(s.to_string())),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Enable flag per phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseConfig {
    pub system: bool,
    pub dev: bool,
    pub base: bool,
    pub task: bool,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            system: true,
            dev: true,
            base: true,
            task: true,
        }
    }
}

impl PhaseConfig {
    pub fn enabled(&self, phase: Phase) -> bool {
        match phase {
            Phase::System => self.system,
            Phase::Dev => self.dev,
            Phase::Base => self.base,
            Phase::Task => self.task,
        }
    }

    pub fn set(&mut self, phase: Phase, enabled: bool) {
        match phase {
            Phase::System => self.system = enabled,
            Phase::Dev => self.dev = enabled,
            Phase::Base => self.base = enabled,
            Phase::Task => self.task = enabled,
        }
    }
}

/// Which override list to consult
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideKind {
    Pip,
    Source,
}

/// Set of item names parsed from a comma-separated list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OverrideList {
    items: Vec<String>,
}

impl OverrideList {
    /// Parses `"a, b,,c"` into `[a, b, c]`. Matching is exact, no globbing.
    pub fn parse(raw: &str) -> Self {
        let mut items: Vec<String> = Vec::new();
        for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if !items.iter().any(|i| i == item) {
                items.push(item.to_string());
            }
        }
        Self { items }
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.iter().any(|i| i == item)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}

impl fmt::Display for OverrideList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.items.join(","))
    }
}

/// Immutable installer configuration
#[derive(Debug, Clone, Serialize)]
pub struct InstallerConfig {
    pub package_manager: PackageManager,

    /// Conda installation root, used to locate pip when the manager is conda
    pub conda_root: Option<PathBuf>,

    /// Conda environment name; the base environment when unset
    pub conda_env: Option<String>,

    pub phases: PhaseConfig,

    /// Suppress source installs unless the item is source-overridden
    pub only_pip: bool,

    /// Treat every package as needing a build
    pub force_rebuild: bool,

    pub pip_overrides: OverrideList,

    pub source_overrides: OverrideList,

    /// Default attempts per command
    pub retry_count: u32,

    /// Fixed delay between attempts
    pub retry_delay_secs: u64,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            package_manager: PackageManager::default(),
            conda_root: None,
            conda_env: None,
            phases: PhaseConfig::default(),
            only_pip: false,
            force_rebuild: false,
            pip_overrides: OverrideList::default(),
            source_overrides: OverrideList::default(),
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl InstallerConfig {
    /// Loads configuration from `REQSMITH_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// Unparsable booleans and numbers fall back to their defaults; an
    /// unknown package manager is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let package_manager = match lookup("REQSMITH_PKG_MGR") {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => defaults.package_manager,
        };

        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|v| parse_bool(&v))
                .unwrap_or(default)
        };

        let phases = PhaseConfig {
            system: flag("REQSMITH_INSTALL_SYSTEM", true),
            dev: flag("REQSMITH_INSTALL_DEV", true),
            base: flag("REQSMITH_INSTALL_BASE", true),
            task: flag("REQSMITH_INSTALL_TASK", true),
        };

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            package_manager,
            conda_root: non_empty("REQSMITH_CONDA_ROOT").map(PathBuf::from),
            conda_env: non_empty("REQSMITH_CONDA_ENV"),
            phases,
            only_pip: flag("REQSMITH_ONLY_PIP", false),
            force_rebuild: flag("REQSMITH_FORCE_REBUILD", false),
            pip_overrides: OverrideList::parse(&lookup("REQSMITH_PIP_DEPS").unwrap_or_default()),
            source_overrides: OverrideList::parse(
                &lookup("REQSMITH_SRC_DEPS").unwrap_or_default(),
            ),
            retry_count: lookup("REQSMITH_RETRY_COUNT")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(defaults.retry_count),
            retry_delay_secs: lookup("REQSMITH_RETRY_DELAY")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(defaults.retry_delay_secs),
            log_level: lookup("REQSMITH_LOG_LEVEL")
                .unwrap_or(defaults.log_level)
                .to_lowercase(),
        })
    }

    /// Validates the configuration
    ///
    /// Checks that:
    /// - A conda root is set when the manager is conda
    /// - The retry count is at least 1
    /// - Log level is valid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.package_manager == PackageManager::Conda && self.conda_root.is_none() {
            return Err(ConfigError::MissingCondaRoot);
        }

        if self.retry_count == 0 {
            return Err(ConfigError::ValidationFailed(
                "Retry count must be at least 1".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn overrides(&self, kind: OverrideKind) -> &OverrideList {
        match kind {
            OverrideKind::Pip => &self.pip_overrides,
            OverrideKind::Source => &self.source_overrides,
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Program and leading arguments that precede `install`/`show`
    pub fn pip_program(&self) -> Vec<String> {
        match self.package_manager {
            PackageManager::Uv => vec!["uv".to_string(), "pip".to_string()],
            PackageManager::Pip => vec!["pip".to_string()],
            PackageManager::Conda => {
                let pip = match (&self.conda_root, &self.conda_env) {
                    (Some(root), Some(env)) => root.join("envs").join(env).join("bin").join("pip"),
                    (Some(root), None) => root.join("bin").join("pip"),
                    (None, _) => PathBuf::from("pip"),
                };
                vec![pip.display().to_string()]
            }
        }
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert(
            "package_manager".to_string(),
            self.package_manager.to_string(),
        );
        if let Some(ref root) = self.conda_root {
            map.insert("conda_root".to_string(), root.display().to_string());
        }
        if let Some(ref env) = self.conda_env {
            map.insert("conda_env".to_string(), env.clone());
        }
        for phase in Phase::ALL {
            map.insert(
                format!("phase.{}", phase),
                self.phases.enabled(phase).to_string(),
            );
        }
        map.insert("only_pip".to_string(), self.only_pip.to_string());
        map.insert("force_rebuild".to_string(), self.force_rebuild.to_string());
        map.insert("pip_overrides".to_string(), self.pip_overrides.to_string());
        map.insert(
            "source_overrides".to_string(),
            self.source_overrides.to_string(),
        );
        map.insert("retry_count".to_string(), self.retry_count.to_string());
        map.insert(
            "retry_delay_secs".to_string(),
            self.retry_delay_secs.to_string(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for InstallerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Installer Configuration:")?;
        writeln!(f, "  Package Manager: {}", self.package_manager)?;
        if let Some(ref root) = self.conda_root {
            writeln!(f, "  Conda Root: {}", root.display())?;
        }
        if let Some(ref env) = self.conda_env {
            writeln!(f, "  Conda Env: {}", env)?;
        }
        let enabled: Vec<&str> = Phase::ALL
            .iter()
            .filter(|p| self.phases.enabled(**p))
            .map(|p| p.as_str())
            .collect();
        writeln!(f, "  Enabled Phases: {}", enabled.join(", "))?;
        writeln!(f, "  Only Pip: {}", self.only_pip)?;
        writeln!(f, "  Force Rebuild: {}", self.force_rebuild)?;
        writeln!(f, "  Pip Overrides: {}", self.pip_overrides)?;
        writeln!(f, "  Source Overrides: {}", self.source_overrides)?;
        writeln!(
            f,
            "  Retries: {} x {}s",
            self.retry_count, self.retry_delay_secs
        )?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
