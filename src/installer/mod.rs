//! Install orchestration
//!
//! [`Installer`] ties the requirements passes, the resolver and the retry
//! executor together. One call to [`Installer::install_requirements`]:
//!
//! 1. loads the requirements tree and builds an [`InstallPlan`]
//! 2. without annotations, bulk-installs the file as-is
//! 3. otherwise bulk-installs a temporary filtered copy, then installs each
//!    annotated package on its own, stopping at the first failure
//!
//! Command failures are reported as [`ExitStatus`]; only problems reading the
//! requirements or writing the temporary file are errors.

mod phases;
mod plan;

pub use phases::{PhaseLayout, PhaseResult, SetupReport, ALL_TASKS};
pub use plan::{InstallAction, InstallPlan};

use crate::config::InstallerConfig;
use crate::exec::{format_command, CommandExecutor, ExitStatus, RetryExecutor, Sleeper};
use crate::git::{self, CloneRequest};
use crate::requirements::{RequirementsDocument, RequirementsError};
use crate::resolver::Resolver;
use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, error, info};

/// Prefix of the temporary filtered requirements file
const FILTERED_PREFIX: &str = ".reqsmith-";

#[derive(Debug, Error)]
pub enum InstallError {
    #[error(transparent)]
    Requirements(#[from] RequirementsError),

    #[error("Failed to create temporary requirements file in {}: {source}", .dir.display())]
    TempFile { dir: PathBuf, source: io::Error },

    #[error("Failed to write filtered requirements to {}: {source}", .path.display())]
    WriteFiltered { path: PathBuf, source: io::Error },
}

pub struct Installer<'a> {
    config: &'a InstallerConfig,
    executor: &'a dyn CommandExecutor,
    sleeper: &'a dyn Sleeper,
}

impl<'a> Installer<'a> {
    pub fn new(
        config: &'a InstallerConfig,
        executor: &'a dyn CommandExecutor,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            config,
            executor,
            sleeper,
        }
    }

    pub fn config(&self) -> &InstallerConfig {
        self.config
    }

    /// Retry executor using the configured delay
    pub fn retry_executor(&self) -> RetryExecutor<'a> {
        RetryExecutor::new(self.executor, self.sleeper).with_delay(self.config.retry_delay())
    }

    /// Loads `file` and computes what an install would run
    pub fn plan(&self, file: &Path) -> Result<InstallPlan, InstallError> {
        let document = RequirementsDocument::load(file)?;
        Ok(InstallPlan::build(file, &document))
    }

    /// Installs `file`, its includes and its annotated packages.
    ///
    /// Returns the first failing status, or success once every action has
    /// succeeded. The temporary filtered file is gone when this returns.
    pub fn install_requirements(
        &self,
        file: &Path,
        max_attempts: u32,
        dry_run: bool,
    ) -> Result<ExitStatus, InstallError> {
        let plan = self.plan(file)?;
        let retry = self.retry_executor();

        let Some(filtered) = plan.filtered.as_deref() else {
            info!(file = %file.display(), "Installing requirements");
            let command = self.install_command(&plan.actions[0], file, &plan.index_options);
            return Ok(retry.retry(max_attempts, &command, dry_run));
        };

        info!(
            file = %file.display(),
            annotated = plan.annotated.len(),
            "Installing requirements with annotated packages deferred"
        );

        let status = {
            let temp = write_filtered(plan.root_dir(), filtered)?;
            debug!(path = %temp.path().display(), "Wrote filtered requirements");
            let command = self.install_command(&plan.actions[0], temp.path(), &plan.index_options);
            retry.retry(max_attempts, &command, dry_run)
        };

        if !status.success() {
            error!(
                file = %file.display(),
                %status,
                "Bulk install failed, skipping annotated packages"
            );
            return Ok(status);
        }

        for action in &plan.actions[1..] {
            let InstallAction::Package { spec, options } = action else {
                continue;
            };
            info!(
                package = %spec,
                options = %options.join(" "),
                "Installing annotated package"
            );
            let command = self.install_command(action, file, &plan.index_options);
            let status = retry.retry(max_attempts, &command, dry_run);

            if !status.success() {
                error!(
                    package = %spec,
                    %status,
                    "Failed to install annotated package, install it manually with: {}",
                    format_command(&command)
                );
                return Ok(status);
            }
        }

        Ok(ExitStatus::SUCCESS)
    }

    /// True when `name` has to be built: rebuild is forced or the package
    /// manager does not report it as installed.
    pub fn should_build_package(&self, name: &str) -> bool {
        if self.config.force_rebuild {
            debug!(package = name, "Force rebuild enabled");
            return true;
        }

        let mut command = self.config.pip_program();
        command.extend(["show", "--quiet", name].map(String::from));

        let installed = self.executor.run(&command).success();
        debug!(package = name, installed, "Checked installed package");
        !installed
    }

    pub fn should_install_from_source(&self, phase: &str, item: &str) -> bool {
        Resolver::new(self.config).should_install_from_source(phase, item)
    }

    pub fn clone_with_retry(&self, request: &CloneRequest, attempts: u32, dry_run: bool) -> ExitStatus {
        git::clone_with_retry(&self.retry_executor(), request, attempts, dry_run)
    }

    fn install_command(
        &self,
        action: &InstallAction,
        requirements: &Path,
        index_options: &[String],
    ) -> Vec<String> {
        let mut command = self.config.pip_program();
        command.push("install".to_string());
        command.extend(action.install_args(requirements, index_options));
        command
    }
}

/// Writes `content` to a temporary file next to the requirements when
/// possible, in the system temp dir otherwise. The file is removed when the
/// returned handle drops.
fn write_filtered(dir: Option<&Path>, content: &str) -> Result<NamedTempFile, InstallError> {
    let builder = {
        let mut builder = tempfile::Builder::new();
        builder.prefix(FILTERED_PREFIX).suffix(".txt");
        builder
    };

    let mut temp = match dir.map(|d| builder.tempfile_in(d)) {
        Some(Ok(temp)) => temp,
        Some(Err(e)) => {
            debug!(error = %e, "Cannot create filtered file next to requirements, using temp dir");
            temp_in_system_dir(&builder)?
        }
        None => temp_in_system_dir(&builder)?,
    };

    temp.write_all(content.as_bytes())
        .and_then(|_| temp.flush())
        .map_err(|source| InstallError::WriteFiltered {
            path: temp.path().to_path_buf(),
            source,
        })?;

    Ok(temp)
}

fn temp_in_system_dir(builder: &tempfile::Builder<'_, '_>) -> Result<NamedTempFile, InstallError> {
    builder.tempfile().map_err(|source| InstallError::TempFile {
        dir: env::temp_dir(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PackageManager;
    use crate::exec::mock::{RecordingSleeper, ScriptedExecutor};
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn pip_config() -> InstallerConfig {
        InstallerConfig {
            package_manager: PackageManager::Pip,
            ..Default::default()
        }
    }

    fn leftover_temp_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with(FILTERED_PREFIX))
            })
            .collect()
    }

    #[test]
    fn test_fast_path_single_bulk_install() {
        let dir = TempDir::new().unwrap();
        let file = write(dir.path(), "requirements.txt", "numpy\nscipy\n");
        let config = pip_config();
        let executor = ScriptedExecutor::new();
        let sleeper = RecordingSleeper::new();

        let status = Installer::new(&config, &executor, &sleeper)
            .install_requirements(&file, 3, false)
            .unwrap();

        assert!(status.success());
        assert_eq!(
            executor.calls(),
            vec![vec![
                "pip".to_string(),
                "install".to_string(),
                "-r".to_string(),
                file.display().to_string()
            ]]
        );
    }

    #[test]
    fn test_annotated_install_sequence() {
        let dir = TempDir::new().unwrap();
        let file = write(
            dir.path(),
            "requirements.txt",
            "requests==2.0\n# [--no-build-isolation]\nfoo @ git+https://example.com/foo\nbar==1.0\n",
        );
        let config = InstallerConfig::default();
        let executor = ScriptedExecutor::new();
        let sleeper = RecordingSleeper::new();

        let status = Installer::new(&config, &executor, &sleeper)
            .install_requirements(&file, 3, false)
            .unwrap();

        assert!(status.success());
        let calls = executor.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0][..4], ["uv", "pip", "install", "-r"]);
        assert_eq!(
            calls[1],
            vec![
                "uv",
                "pip",
                "install",
                "--no-build-isolation",
                "foo @ git+https://example.com/foo"
            ]
        );
        assert_eq!(
            executor.requirement_snapshots()[0].as_deref(),
            Some("requests==2.0\n# [skipped by installer] foo @ git+https://example.com/foo\nbar==1.0\n")
        );
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_filtered_file_written_next_to_requirements() {
        let dir = TempDir::new().unwrap();
        let file = write(dir.path(), "requirements.txt", "# [--no-deps]\napex\n");
        let config = pip_config();
        let executor = ScriptedExecutor::new();
        let sleeper = RecordingSleeper::new();

        Installer::new(&config, &executor, &sleeper)
            .install_requirements(&file, 1, false)
            .unwrap();

        let bulk_path = PathBuf::from(&executor.calls()[0][3]);
        let canonical_dir = dir.path().canonicalize().unwrap();
        assert_eq!(bulk_path.parent(), Some(canonical_dir.as_path()));
        assert!(!bulk_path.exists());
    }

    #[test]
    fn test_bulk_failure_skips_annotated_packages() {
        let dir = TempDir::new().unwrap();
        let file = write(dir.path(), "requirements.txt", "numpy\n# [--no-deps]\napex\n");
        let config = pip_config();
        let executor = ScriptedExecutor::always(ExitStatus::from_code(2));
        let sleeper = RecordingSleeper::new();

        let status = Installer::new(&config, &executor, &sleeper)
            .install_requirements(&file, 2, false)
            .unwrap();

        assert_eq!(status.code(), 2);
        assert_eq!(executor.call_count(), 2);
        assert!(executor.calls().iter().all(|c| c.contains(&"-r".to_string())));
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_individual_failure_is_fail_fast() {
        let dir = TempDir::new().unwrap();
        let file = write(
            dir.path(),
            "requirements.txt",
            "# [--no-deps]\napex\n# [--no-build-isolation]\nflash-attn\n",
        );
        let config = pip_config();
        let executor = ScriptedExecutor::with_statuses([ExitStatus::SUCCESS]);
        executor.push_statuses([ExitStatus::failure()]);
        let sleeper = RecordingSleeper::new();

        let status = Installer::new(&config, &executor, &sleeper)
            .install_requirements(&file, 1, false)
            .unwrap();

        assert!(!status.success());
        let calls = executor.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].last().map(String::as_str), Some("apex"));
    }

    #[test]
    fn test_missing_root_file_is_error() {
        let dir = TempDir::new().unwrap();
        let config = pip_config();
        let executor = ScriptedExecutor::new();
        let sleeper = RecordingSleeper::new();

        let err = Installer::new(&config, &executor, &sleeper)
            .install_requirements(&dir.path().join("nope.txt"), 3, false)
            .unwrap_err();

        assert!(matches!(
            err,
            InstallError::Requirements(RequirementsError::MissingFile(_))
        ));
        assert_eq!(executor.call_count(), 0);
    }

    #[test]
    fn test_dry_run_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let file = write(dir.path(), "requirements.txt", "numpy\n# [--no-deps]\napex\n");
        let config = pip_config();
        let executor = ScriptedExecutor::always(ExitStatus::failure());
        let sleeper = RecordingSleeper::new();

        let status = Installer::new(&config, &executor, &sleeper)
            .install_requirements(&file, 3, true)
            .unwrap();

        assert!(status.success());
        assert_eq!(executor.call_count(), 0);
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_configured_retry_delay_is_used() {
        let dir = TempDir::new().unwrap();
        let file = write(dir.path(), "requirements.txt", "numpy\n");
        let config = InstallerConfig {
            retry_delay_secs: 1,
            ..pip_config()
        };
        let executor = ScriptedExecutor::with_statuses([ExitStatus::failure()]);
        let sleeper = RecordingSleeper::new();

        Installer::new(&config, &executor, &sleeper)
            .install_requirements(&file, 2, false)
            .unwrap();

        assert_eq!(sleeper.sleeps(), vec![std::time::Duration::from_secs(1)]);
    }

    #[test]
    fn test_should_build_package() {
        let config = pip_config();
        let sleeper = RecordingSleeper::new();

        let installed = ScriptedExecutor::new();
        assert!(!Installer::new(&config, &installed, &sleeper).should_build_package("apex"));
        assert_eq!(installed.calls()[0], vec!["pip", "show", "--quiet", "apex"]);

        let missing = ScriptedExecutor::always(ExitStatus::failure());
        assert!(Installer::new(&config, &missing, &sleeper).should_build_package("apex"));
    }

    #[test]
    fn test_force_rebuild_skips_probe() {
        let config = InstallerConfig {
            force_rebuild: true,
            ..pip_config()
        };
        let executor = ScriptedExecutor::new();
        let sleeper = RecordingSleeper::new();

        assert!(Installer::new(&config, &executor, &sleeper).should_build_package("apex"));
        assert_eq!(executor.call_count(), 0);
    }

    #[test]
    fn test_write_filtered_falls_back_to_temp_dir() {
        let temp = write_filtered(Some(Path::new("/nonexistent/reqsmith/dir")), "numpy\n").unwrap();
        assert_eq!(fs::read_to_string(temp.path()).unwrap(), "numpy\n");
        assert!(temp.path().starts_with(env::temp_dir()));
    }
}
