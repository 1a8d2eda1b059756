//! reqsmith - annotation-aware requirements installer
//!
//! Installs pip requirements files in which packages can carry their own
//! install options through annotation comments:
//!
//! ```text
//! requests==2.0
//! # [--no-build-isolation]
//! foo @ git+https://example.com/foo
//! bar==1.0
//! ```
//!
//! Here `requests` and `bar` go through one bulk `install -r`, and `foo` is
//! installed afterwards on its own with `--no-build-isolation`.
//!
//! # Core Concepts
//!
//! - **Requirements tree**: a root file plus everything reached through
//!   `-r` includes ([`requirements`])
//! - **Phases**: system, dev, base and task stages that can be switched on
//!   and off independently ([`config`], [`resolver`])
//! - **Execution**: external commands run through an injectable
//!   [`CommandExecutor`] with bounded, fixed-delay retries ([`exec`])
//!
//! # Example Usage
//!
//! ```no_run
//! use reqsmith::exec::{SystemExecutor, ThreadSleeper};
//! use reqsmith::{Installer, InstallerConfig};
//! use std::path::Path;
//!
//! let config = InstallerConfig::from_env()?;
//! let installer = Installer::new(&config, &SystemExecutor, &ThreadSleeper);
//!
//! let status = installer.install_requirements(Path::new("requirements.txt"), 3, false)?;
//! if !status.success() {
//!     eprintln!("install failed: {}", status);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod exec;
pub mod git;
pub mod installer;
pub mod requirements;
pub mod resolver;
pub mod util;

pub use config::{ConfigError, InstallerConfig, OverrideKind, OverrideList, PackageManager, Phase, PhaseConfig};
pub use exec::{CommandExecutor, ExitStatus, RetryExecutor, Sleeper};
pub use git::{clone_with_retry, CloneRequest};
pub use installer::{InstallAction, InstallError, InstallPlan, Installer, PhaseLayout, SetupReport};
pub use requirements::{PackageDirective, RequirementLine, RequirementsDocument, RequirementsError};
pub use resolver::Resolver;
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_reqsmith() {
        assert_eq!(NAME, "reqsmith");
    }
}
