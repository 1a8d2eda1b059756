//! Phase-driven setup over a `requirements/` tree
//!
//! Layout, relative to the project root:
//!
//! ```text
//! requirements/
//!   dev.txt
//!   <platform>/
//!     base.txt
//!     <task>.txt
//! ```
//!
//! The system phase has no requirements file of its own; it only gates
//! source builds through the resolver.

use super::Installer;
use crate::config::Phase;
use crate::exec::ExitStatus;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Task name selecting every task file of the platform
pub const ALL_TASKS: &str = "all";

const BASE_FILE: &str = "base.txt";

#[derive(Debug, Clone)]
pub struct PhaseLayout {
    pub root: PathBuf,
    pub platform: String,
    pub task: Option<String>,
}

impl PhaseLayout {
    pub fn new(root: impl Into<PathBuf>, platform: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            platform: platform.into(),
            task: None,
        }
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn requirements_dir(&self) -> PathBuf {
        self.root.join("requirements")
    }

    fn platform_dir(&self) -> PathBuf {
        self.requirements_dir().join(&self.platform)
    }

    /// Requirements files installed by `phase`, in install order
    pub fn files(&self, phase: Phase) -> Vec<PathBuf> {
        match phase {
            Phase::System => Vec::new(),
            Phase::Dev => vec![self.requirements_dir().join("dev.txt")],
            Phase::Base => vec![self.platform_dir().join(BASE_FILE)],
            Phase::Task => match self.task.as_deref() {
                None => Vec::new(),
                Some(ALL_TASKS) => task_files(&self.platform_dir()),
                Some(task) => vec![self.platform_dir().join(format!("{}.txt", task))],
            },
        }
    }
}

/// Every `.txt` in `dir` except `base.txt`, sorted by name
fn task_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot list task requirements");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path.extension().map_or(false, |ext| ext == "txt")
                && path.file_name().map_or(false, |name| name != BASE_FILE)
        })
        .collect();
    files.sort();
    files
}

/// Outcome of one requirements file during setup
#[derive(Debug, Clone, Serialize)]
pub struct PhaseResult {
    pub phase: Phase,
    pub file: PathBuf,
    pub status: ExitStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SetupReport {
    pub results: Vec<PhaseResult>,
    /// Phases switched off in the configuration
    pub disabled: Vec<Phase>,
    /// Phase files that did not exist
    pub missing: Vec<PathBuf>,
}

impl SetupReport {
    /// First failure across all phases, success otherwise
    pub fn status(&self) -> ExitStatus {
        self.results
            .iter()
            .fold(ExitStatus::SUCCESS, |acc, r| acc.and(r.status))
    }

    pub fn failed(&self) -> impl Iterator<Item = &PhaseResult> {
        self.results.iter().filter(|r| !r.status.success())
    }
}

impl<'a> Installer<'a> {
    /// Installs the requirements of every enabled phase in order.
    ///
    /// A failing phase does not stop later phases; the report carries every
    /// status.
    pub fn install_phases(&self, layout: &PhaseLayout, max_attempts: u32, dry_run: bool) -> SetupReport {
        let mut report = SetupReport::default();

        for phase in Phase::ALL {
            if !self.config().phases.enabled(phase) {
                info!(%phase, "Phase disabled, skipping");
                report.disabled.push(phase);
                continue;
            }

            let files = layout.files(phase);
            if files.is_empty() {
                debug!(%phase, "No requirements files for phase");
                continue;
            }

            for file in files {
                if !file.is_file() {
                    warn!(%phase, file = %file.display(), "Requirements file not found, skipping");
                    report.missing.push(file);
                    continue;
                }

                info!(%phase, file = %file.display(), "Installing phase requirements");
                let status = match self.install_requirements(&file, max_attempts, dry_run) {
                    Ok(status) => status,
                    Err(e) => {
                        error!(%phase, file = %file.display(), error = %e, "Failed to process requirements");
                        ExitStatus::failure()
                    }
                };

                if !status.success() {
                    error!(%phase, file = %file.display(), %status, "Phase install failed");
                }
                report.results.push(PhaseResult { phase, file, status });
            }
        }

        report
    }
}
