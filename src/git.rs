//! Git clone with retry

use crate::exec::{ExitStatus, RetryExecutor};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Parameters of a `git clone`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloneRequest {
    pub url: String,
    pub target_dir: PathBuf,
    pub branch: Option<String>,
    pub depth: Option<u32>,
    pub recursive: bool,
}

impl CloneRequest {
    pub fn new(url: impl Into<String>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            target_dir: target_dir.into(),
            branch: None,
            depth: None,
            recursive: false,
        }
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// `git clone [--branch B] [--depth N] [--recursive] URL DIR`
    pub fn command(&self) -> Vec<String> {
        let mut args = vec!["git".to_string(), "clone".to_string()];
        if let Some(branch) = &self.branch {
            args.push("--branch".to_string());
            args.push(branch.clone());
        }
        if let Some(depth) = self.depth {
            args.push("--depth".to_string());
            args.push(depth.to_string());
        }
        if self.recursive {
            args.push("--recursive".to_string());
        }
        args.push(self.url.clone());
        args.push(self.target_dir.display().to_string());
        args
    }

    fn is_checked_out(&self) -> bool {
        self.target_dir.join(".git").exists()
    }
}

/// What was at the clone target before the first attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetState {
    Missing,
    Empty,
    Occupied,
}

impl TargetState {
    fn capture(dir: &Path) -> Self {
        match fs::read_dir(dir) {
            Ok(mut entries) => {
                if entries.next().is_none() {
                    TargetState::Empty
                } else {
                    TargetState::Occupied
                }
            }
            Err(_) if !dir.exists() => TargetState::Missing,
            Err(_) => TargetState::Occupied,
        }
    }
}

/// Clones `request.url`, retrying failed attempts.
///
/// An existing checkout at the target is left alone and counts as success.
/// Between attempts, whatever a failed attempt left behind is cleared, but
/// only inside a target that was missing or empty before the first attempt.
/// A directory that already held files is never touched.
pub fn clone_with_retry(
    retry: &RetryExecutor<'_>,
    request: &CloneRequest,
    attempts: u32,
    dry_run: bool,
) -> ExitStatus {
    if request.is_checked_out() {
        info!(
            target = %request.target_dir.display(),
            "Repository already cloned, skipping"
        );
        return ExitStatus::SUCCESS;
    }

    let state = TargetState::capture(&request.target_dir);
    if state == TargetState::Occupied {
        warn!(
            target = %request.target_dir.display(),
            "Clone target is not empty, git will likely refuse it"
        );
    }

    info!(url = %request.url, target = %request.target_dir.display(), "Cloning repository");
    retry.retry_with_reset(attempts, &request.command(), dry_run, |_| {
        reset_target(&request.target_dir, state)
    })
}

fn reset_target(dir: &Path, state: TargetState) {
    let result = match state {
        TargetState::Occupied => {
            debug!(dir = %dir.display(), "Target held files before cloning, leaving it as is");
            return;
        }
        TargetState::Missing if !dir.exists() => return,
        TargetState::Missing => fs::remove_dir_all(dir),
        TargetState::Empty => clear_dir(dir),
    };
    if let Err(e) = result {
        warn!(dir = %dir.display(), error = %e, "Failed to remove partial checkout");
    }
}

fn clear_dir(dir: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
