//! Command execution
//!
//! External programs are reached only through [`CommandExecutor`], and retry
//! waits only through [`Sleeper`], so both can be replaced in tests
//! (see [`mock`]).

pub mod mock;
mod retry;

pub use retry::RetryExecutor;

use serde::Serialize;
use std::fmt;
use std::process::Command;
use std::thread;
use std::time::Duration;
use tracing::{debug, error};

/// Environment variables set by pip's isolated builds that must not leak into
/// child installs
pub const BUILD_ISOLATION_VARS: [&str; 5] = [
    "PYTHONPATH",
    "PYTHONNOUSERSITE",
    "PEP517_BUILD_BACKEND",
    "PIP_BUILD_TRACKER",
    "PIP_REQ_TRACKER",
];

/// Exit code reported when a program cannot be started
const SPAWN_FAILURE_CODE: i32 = 127;

/// Outcome of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExitStatus {
    code: i32,
}

impl ExitStatus {
    pub const SUCCESS: ExitStatus = ExitStatus { code: 0 };

    pub fn from_code(code: i32) -> Self {
        Self { code }
    }

    /// Generic failure (exit code 1)
    pub fn failure() -> Self {
        Self { code: 1 }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    /// Combines two statuses; the first failure wins.
    pub fn and(self, other: ExitStatus) -> ExitStatus {
        if self.success() {
            other
        } else {
            self
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        // Killed by a signal: no code
        Self {
            code: status.code().unwrap_or(1),
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exit {}", self.code)
    }
}

/// Runs a command given as program followed by its arguments
pub trait CommandExecutor: Send + Sync {
    fn run(&self, args: &[String]) -> ExitStatus;
}

/// Blocking wait between retry attempts
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Runs commands as child processes with inherited stdio
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    fn run(&self, args: &[String]) -> ExitStatus {
        let Some((program, rest)) = args.split_first() else {
            error!("Refusing to run an empty command");
            return ExitStatus::failure();
        };

        let mut command = Command::new(program);
        command.args(rest);
        for var in BUILD_ISOLATION_VARS {
            command.env_remove(var);
        }

        debug!(command = %format_command(args), "Spawning process");
        match command.status() {
            Ok(status) => status.into(),
            Err(e) => {
                error!(program = %program, error = %e, "Failed to start process");
                ExitStatus::from_code(SPAWN_FAILURE_CODE)
            }
        }
    }
}

/// Sleeps on the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Renders a command for logs, single-quoting arguments that need it
pub fn format_command(args: &[String]) -> String {
    args.iter()
        .map(|arg| quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '=' | ':' | ',' | '+' | '@')
        });

    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exit_status_basics() {
        assert!(ExitStatus::SUCCESS.success());
        assert!(!ExitStatus::failure().success());
        assert_eq!(ExitStatus::from_code(2).code(), 2);
        assert_eq!(ExitStatus::from_code(3).to_string(), "exit 3");
    }

    #[test]
    fn test_exit_status_and() {
        let ok = ExitStatus::SUCCESS;
        let two = ExitStatus::from_code(2);
        let three = ExitStatus::from_code(3);

        assert_eq!(ok.and(ok), ok);
        assert_eq!(ok.and(two), two);
        assert_eq!(two.and(ok), two);
        assert_eq!(two.and(three), two);
    }

    #[test]
    fn test_format_command_quotes_when_needed() {
        assert_eq!(
            format_command(&args(&["uv", "pip", "install", "-r", "/tmp/req.txt"])),
            "uv pip install -r /tmp/req.txt"
        );
        assert_eq!(
            format_command(&args(&["pip", "install", "foo @ git+https://example.com/foo"])),
            "pip install 'foo @ git+https://example.com/foo'"
        );
        assert_eq!(format_command(&args(&["echo", ""])), "echo ''");
        assert_eq!(format_command(&args(&["echo", "it's"])), r"echo 'it'\''s'");
    }

    #[test]
    fn test_system_executor_empty_command() {
        assert!(!SystemExecutor.run(&[]).success());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_executor_runs_process() {
        assert!(SystemExecutor.run(&args(&["true"])).success());
        assert!(!SystemExecutor.run(&args(&["false"])).success());
        assert_eq!(
            SystemExecutor.run(&args(&["sh", "-c", "exit 7"])).code(),
            7
        );
    }

    #[test]
    fn test_system_executor_missing_program() {
        let status = SystemExecutor.run(&args(&["reqsmith-definitely-not-a-program"]));
        assert_eq!(status.code(), SPAWN_FAILURE_CODE);
    }
}
