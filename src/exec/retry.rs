//! Bounded retry with a fixed delay

use super::{format_command, CommandExecutor, ExitStatus, Sleeper};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Re-runs a failing command up to a fixed number of attempts.
///
/// The delay between attempts is constant: the failures this guards against
/// are transient network errors during downloads and clones.
pub struct RetryExecutor<'a> {
    executor: &'a dyn CommandExecutor,
    sleeper: &'a dyn Sleeper,
    delay: Duration,
}

impl<'a> RetryExecutor<'a> {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

    pub fn new(executor: &'a dyn CommandExecutor, sleeper: &'a dyn Sleeper) -> Self {
        Self {
            executor,
            sleeper,
            delay: Self::DEFAULT_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `command` until it succeeds or `max_attempts` runs have failed.
    ///
    /// With `dry_run` the command is only logged and success is returned.
    /// `max_attempts` of 0 counts as 1.
    pub fn retry(&self, max_attempts: u32, command: &[String], dry_run: bool) -> ExitStatus {
        self.retry_with_reset(max_attempts, command, dry_run, |_| {})
    }

    /// Like [`retry`](Self::retry), calling `reset` with the attempt number
    /// before every attempt after the first.
    pub fn retry_with_reset<F>(
        &self,
        max_attempts: u32,
        command: &[String],
        dry_run: bool,
        mut reset: F,
    ) -> ExitStatus
    where
        F: FnMut(u32),
    {
        let rendered = format_command(command);

        if dry_run {
            info!("[dry-run] {}", rendered);
            return ExitStatus::SUCCESS;
        }

        let attempts = max_attempts.max(1);
        let mut last = ExitStatus::failure();

        for attempt in 1..=attempts {
            if attempt > 1 {
                reset(attempt);
            }

            debug!(attempt, attempts, command = %rendered, "Running command");
            let status = self.executor.run(command);

            if status.success() {
                if attempt > 1 {
                    info!(attempt, attempts, "Command succeeded after retry");
                }
                return status;
            }

            last = status;
            if attempt < attempts {
                warn!(
                    attempt,
                    attempts,
                    code = status.code(),
                    "Command failed, retrying in {}s",
                    self.delay.as_secs()
                );
                self.sleeper.sleep(self.delay);
            }
        }

        error!(
            attempts,
            code = last.code(),
            command = %rendered,
            "Command failed after {} attempt(s)",
            attempts
        );
        last
    }
}
