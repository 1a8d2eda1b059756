//! Deterministic stand-ins for process execution and sleeping

use super::{CommandExecutor, ExitStatus, Sleeper};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Executor that replays scripted statuses and records every call.
///
/// Once the script runs out, the fallback status is returned. Because the
/// installer deletes its temporary requirements file before returning, the
/// contents of any file passed with `-r` are captured at call time.
pub struct ScriptedExecutor {
    statuses: Mutex<VecDeque<ExitStatus>>,
    fallback: ExitStatus,
    calls: Mutex<Vec<Vec<String>>>,
    requirement_snapshots: Mutex<Vec<Option<String>>>,
}

impl ScriptedExecutor {
    /// Every command succeeds
    pub fn new() -> Self {
        Self::always(ExitStatus::SUCCESS)
    }

    /// Every command returns `status`
    pub fn always(status: ExitStatus) -> Self {
        Self {
            statuses: Mutex::new(VecDeque::new()),
            fallback: status,
            calls: Mutex::new(Vec::new()),
            requirement_snapshots: Mutex::new(Vec::new()),
        }
    }

    /// Returns `statuses` in order, then succeeds
    pub fn with_statuses(statuses: impl IntoIterator<Item = ExitStatus>) -> Self {
        let executor = Self::new();
        executor.push_statuses(statuses);
        executor
    }

    pub fn push_statuses(&self, statuses: impl IntoIterator<Item = ExitStatus>) {
        let mut queue = self.statuses.lock().unwrap();
        queue.extend(statuses);
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Contents of the `-r` file of each call, `None` when the call had none
    pub fn requirement_snapshots(&self) -> Vec<Option<String>> {
        self.requirement_snapshots.lock().unwrap().clone()
    }
}

impl Default for ScriptedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn run(&self, args: &[String]) -> ExitStatus {
        let snapshot = args
            .windows(2)
            .find(|pair| pair[0] == "-r")
            .and_then(|pair| fs::read_to_string(Path::new(&pair[1])).ok());

        self.calls.lock().unwrap().push(args.to_vec());
        self.requirement_snapshots.lock().unwrap().push(snapshot);

        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback)
    }
}

/// Sleeper that records requested durations instead of waiting
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_scripted_then_fallback() {
        let executor = ScriptedExecutor::with_statuses([ExitStatus::from_code(4)]);

        assert_eq!(executor.run(&args(&["a"])).code(), 4);
        assert!(executor.run(&args(&["b"])).success());
        assert_eq!(executor.calls(), vec![args(&["a"]), args(&["b"])]);
    }

    #[test]
    fn test_always_failing() {
        let executor = ScriptedExecutor::always(ExitStatus::failure());
        assert!(!executor.run(&args(&["x"])).success());
        assert!(!executor.run(&args(&["x"])).success());
        assert_eq!(executor.call_count(), 2);
    }

    #[test]
    fn test_requirement_snapshot() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("req.txt");
        fs::write(&path, "numpy\n").unwrap();

        let executor = ScriptedExecutor::new();
        executor.run(&args(&["pip", "install", "-r", path.to_str().unwrap()]));
        executor.run(&args(&["pip", "install", "scipy"]));

        assert_eq!(
            executor.requirement_snapshots(),
            vec![Some("numpy\n".to_string()), None]
        );
    }

    #[test]
    fn test_recording_sleeper() {
        let sleeper = RecordingSleeper::new();
        sleeper.sleep(Duration::from_secs(5));
        assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(5)]);
    }
}
