//! Turns a stored command into processes and collects the outcome
//!
//! Every kind of command goes through [`Executor::execute`], which always returns an
//! [`ExecutionResult`]: launch errors, missing scripts and nonzero exits are all reported as
//! a failed result rather than an error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command as ProcessCommand, Output, Stdio};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commands::{Command, CommandKind};

const DEFAULT_SHELL: &str = "sh";

/// What to do with the remaining lines of a multi command once one fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MultiPolicy {
    /// Stop at the first failing line
    #[default]
    FailFast,
    /// Run every line and report the first failure
    Continue,
}

/// Why an execution did not succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    #[error("script not found: {0}")]
    ScriptNotFound(PathBuf),
    #[error("script is not executable: {0}")]
    ScriptNotExecutable(PathBuf),
    #[error("failed to launch {program}: {reason}")]
    Launch { program: String, reason: String },
    #[error("exited with status {0}")]
    ExitStatus(i32),
    #[error("terminated by signal")]
    Signaled,
    #[error("no commands to execute")]
    NoSteps,
}

impl Failure {
    fn from_exit_code(code: Option<i32>) -> Self {
        code.map_or(Failure::Signaled, Failure::ExitStatus)
    }
}

/// The line of a multi command that failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedStep {
    /// 1-based position among the non-empty lines
    pub position: usize,
    pub line: String,
}

impl fmt::Display for FailedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {}: {}", self.position, self.line)
    }
}

/// Outcome of running one stored command
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub succeeded: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub failed_step: Option<FailedStep>,
    pub failure: Option<Failure>,
    /// Number of processes that were started
    pub steps_run: usize,
    pub duration: Duration,
}

impl ExecutionResult {
    fn failed(failure: Failure) -> Self {
        ExecutionResult {
            failure: Some(failure),
            ..Default::default()
        }
    }
}

/// Output of a single process run
struct StepOutput {
    exit_code: Option<i32>,
    success: bool,
    stdout: String,
    stderr: String,
}

impl From<Output> for StepOutput {
    fn from(o: Output) -> Self {
        StepOutput {
            success: o.status.success(),
            exit_code: o.status.code(),
            stdout: String::from_utf8_lossy(&o.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&o.stderr).into_owned(),
        }
    }
}

/// Runs commands synchronously, capturing their output
#[derive(Debug, Clone)]
pub struct Executor {
    shell: String,
    policy: MultiPolicy,
    cwd: Option<PathBuf>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl Executor {
    #[must_use]
    pub fn new(shell: impl Into<String>) -> Self {
        Executor {
            shell: shell.into(),
            policy: MultiPolicy::default(),
            cwd: None,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: MultiPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run processes in `cwd` instead of the current directory.
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn shell(&self) -> &str {
        &self.shell
    }

    #[must_use]
    pub fn policy(&self) -> MultiPolicy {
        self.policy
    }

    #[must_use]
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Run `command` to completion and report what happened.
    #[must_use]
    pub fn execute(&self, command: &Command) -> ExecutionResult {
        let start = Instant::now();
        let mut result = match command.kind {
            CommandKind::Single => self.execute_single(command),
            CommandKind::Multi => self.execute_multi(command),
            CommandKind::Script => self.execute_script(command),
        };
        result.duration = start.elapsed();

        match result.failure {
            None => info!("Command '{}' succeeded", command.name),
            Some(ref failure) => match result.failed_step {
                Some(ref step) => warn!("Command '{}' failed at {step}: {failure}", command.name),
                None => warn!("Command '{}' failed: {failure}", command.name),
            },
        }
        result
    }

    fn execute_single(&self, command: &Command) -> ExecutionResult {
        info!("Executing single command '{}'", command.name);
        let content = command.content.trim();
        if content.is_empty() {
            return ExecutionResult::failed(Failure::NoSteps);
        }
        match self.run_shell(content) {
            Ok(output) => finish(output, 1),
            Err(failure) => ExecutionResult::failed(failure),
        }
    }

    fn execute_multi(&self, command: &Command) -> ExecutionResult {
        let steps = command.steps();
        if steps.is_empty() {
            return ExecutionResult::failed(Failure::NoSteps);
        }
        info!(
            "Executing multi command '{}' with {} step(s)",
            command.name,
            steps.len()
        );

        let mut result = ExecutionResult::default();
        for (i, line) in steps.iter().enumerate() {
            let position = i + 1;
            debug!("Step {position}/{}: {line}", steps.len());

            let outcome = self.run_shell(line);
            result.steps_run += 1;
            let failure = match outcome {
                Ok(output) => {
                    result.stdout.push_str(&output.stdout);
                    result.stderr.push_str(&output.stderr);
                    result.exit_code = output.exit_code;
                    (!output.success).then(|| Failure::from_exit_code(output.exit_code))
                }
                Err(failure) => {
                    result.exit_code = None;
                    Some(failure)
                }
            };

            if let Some(failure) = failure {
                if result.failure.is_none() {
                    result.failed_step = Some(FailedStep {
                        position,
                        line: (*line).to_string(),
                    });
                    result.failure = Some(failure);
                }
                if self.policy == MultiPolicy::FailFast {
                    break;
                }
            }
        }

        // Under `Continue` the reported exit code is that of the first failing step
        match result.failure {
            Some(Failure::ExitStatus(code)) => result.exit_code = Some(code),
            Some(_) => result.exit_code = None,
            None => {}
        }
        result.succeeded = result.failure.is_none();
        result
    }

    fn execute_script(&self, command: &Command) -> ExecutionResult {
        let path = match self.resolve_script(Path::new(command.content.trim())) {
            Ok(path) => path,
            Err(failure) => return ExecutionResult::failed(failure),
        };
        if let Err(failure) = check_script(&path) {
            return ExecutionResult::failed(failure);
        }
        info!(
            "Executing script '{}': {}",
            command.name,
            path.display()
        );

        let mut process = ProcessCommand::new(&path);
        match self.run(&mut process, &path.display().to_string()) {
            Ok(output) => finish(output, 1),
            Err(failure) => ExecutionResult::failed(failure),
        }
    }

    /// Absolute path of a script, relative paths being taken from the working directory.
    ///
    /// The same path is checked and launched, so a bare file name never goes through a
    /// `PATH` lookup.
    fn resolve_script(&self, raw: &Path) -> Result<PathBuf, Failure> {
        let joined = match self.cwd {
            Some(ref cwd) if raw.is_relative() => cwd.join(raw),
            _ => raw.to_path_buf(),
        };
        std::path::absolute(&joined).map_err(|_| Failure::ScriptNotFound(joined))
    }

    fn run_shell(&self, line: &str) -> Result<StepOutput, Failure> {
        let mut process = ProcessCommand::new(&self.shell);
        process.arg("-c").arg(line);
        self.run(&mut process, &self.shell)
    }

    fn run(&self, process: &mut ProcessCommand, program: &str) -> Result<StepOutput, Failure> {
        if let Some(ref cwd) = self.cwd {
            process.current_dir(cwd);
        }
        process
            .stdin(Stdio::null())
            .output()
            .map(StepOutput::from)
            .map_err(|e| Failure::Launch {
                program: program.to_string(),
                reason: e.to_string(),
            })
    }
}

fn finish(output: StepOutput, steps_run: usize) -> ExecutionResult {
    let failure = (!output.success).then(|| Failure::from_exit_code(output.exit_code));
    ExecutionResult {
        succeeded: output.success,
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
        failed_step: None,
        failure,
        steps_run,
        duration: Duration::ZERO,
    }
}

/// Make sure `path` is something we can launch without going through a shell.
fn check_script(path: &Path) -> Result<(), Failure> {
    if !path.is_file() {
        return Err(Failure::ScriptNotFound(path.to_path_buf()));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = path
            .metadata()
            .map_err(|_| Failure::ScriptNotFound(path.to_path_buf()))?
            .permissions()
            .mode();
        if mode & 0o111 == 0 {
            return Err(Failure::ScriptNotExecutable(path.to_path_buf()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(content: &str) -> Command {
        Command::new("test", CommandKind::Single, content)
    }

    fn multi(content: &str) -> Command {
        Command::new("test", CommandKind::Multi, content)
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str, mode: u32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn test_single_captures_output() {
        let result = Executor::default().execute(&single("echo hello; echo oops >&2"));
        assert!(result.succeeded);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stdout, "hello\n");
        assert_eq!(result.stderr, "oops\n");
        assert!(result.failure.is_none());
        assert_eq!(result.steps_run, 1);
    }

    #[test]
    fn test_single_nonzero_exit() {
        let result = Executor::default().execute(&single("exit 3"));
        assert!(!result.succeeded);
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.failure, Some(Failure::ExitStatus(3)));
        assert!(result.failed_step.is_none());
    }

    #[test]
    fn test_single_runs_in_cwd() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let result = Executor::default()
            .with_cwd(dir.path())
            .execute(&single("ls"));
        assert!(result.succeeded);
        assert!(result.stdout.contains("marker.txt"));
    }

    #[test]
    fn test_missing_shell_is_launch_failure() {
        let result = Executor::new("/nonexistent/shell").execute(&single("echo hi"));
        assert!(!result.succeeded);
        assert_eq!(result.exit_code, None);
        assert!(result.stderr.is_empty());
        match result.failure {
            Some(Failure::Launch { program, .. }) => assert_eq!(program, "/nonexistent/shell"),
            other => panic!("Expected Failure::Launch, got: {other:?}"),
        }
    }

    #[test]
    fn test_multi_missing_shell_fails_first_step() {
        let result = Executor::new("/nonexistent/shell").execute(&multi("echo a\necho b"));
        assert!(!result.succeeded);
        assert_eq!(
            result.failed_step,
            Some(FailedStep {
                position: 1,
                line: "echo a".to_string(),
            })
        );
        assert!(matches!(result.failure, Some(Failure::Launch { .. })));
        assert_eq!(result.exit_code, None);
        assert_eq!(result.steps_run, 1);
        assert!(result.stderr.is_empty());
    }

    #[test]
    fn test_multi_runs_all_lines_in_order() {
        let result = Executor::default().execute(&multi("echo one\n\necho two\necho three"));
        assert!(result.succeeded);
        assert_eq!(result.stdout, "one\ntwo\nthree\n");
        assert_eq!(result.steps_run, 3);
        assert_eq!(result.exit_code, Some(0));
    }

    #[test]
    fn test_multi_fail_fast_stops_at_failing_line() {
        let result = Executor::default().execute(&multi(
            "echo first\nexit 1\necho unreachable",
        ));
        assert!(!result.succeeded);
        assert_eq!(
            result.failed_step,
            Some(FailedStep {
                position: 2,
                line: "exit 1".to_string(),
            })
        );
        assert_eq!(result.exit_code, Some(1));
        assert_eq!(result.steps_run, 2);
        assert_eq!(result.stdout, "first\n");
        assert!(!result.stdout.contains("unreachable"));
    }

    #[test]
    fn test_multi_continue_runs_remaining_lines() {
        let result = Executor::default()
            .with_policy(MultiPolicy::Continue)
            .execute(&multi("exit 0\nexit 4\necho after\nexit 5"));
        assert!(!result.succeeded);
        assert_eq!(result.steps_run, 4);
        assert_eq!(result.stdout, "after\n");
        assert_eq!(result.failed_step.map(|s| s.position), Some(2));
        assert_eq!(result.exit_code, Some(4));
    }

    #[test]
    fn test_multi_lines_are_separate_shells() {
        let result = Executor::default().execute(&multi("FOO=bar\necho \"[$FOO]\""));
        assert!(result.succeeded);
        assert_eq!(result.stdout, "[]\n");
    }

    #[test]
    fn test_multi_without_lines() {
        let result = Executor::default().execute(&multi("\n  \n"));
        assert!(!result.succeeded);
        assert_eq!(result.failure, Some(Failure::NoSteps));
        assert_eq!(result.steps_run, 0);
    }

    #[test]
    fn test_script_missing_path() {
        let cmd = Command::new("script", CommandKind::Script, "/nonexistent/script.sh");
        let result = Executor::default().execute(&cmd);
        assert!(!result.succeeded);
        assert_eq!(
            result.failure,
            Some(Failure::ScriptNotFound(PathBuf::from("/nonexistent/script.sh")))
        );
        assert_eq!(result.steps_run, 0);
    }

    #[test]
    fn test_script_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = Command::new(
            "script",
            CommandKind::Script,
            dir.path().to_string_lossy().to_string(),
        );
        let result = Executor::default().execute(&cmd);
        assert!(matches!(result.failure, Some(Failure::ScriptNotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_script_not_executable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(dir.path(), "plain.sh", "#!/bin/sh\necho hi\n", 0o644);
        let cmd = Command::new("script", CommandKind::Script, path.to_string_lossy().to_string());
        let result = Executor::default().execute(&cmd);
        assert_eq!(result.failure, Some(Failure::ScriptNotExecutable(path)));
        assert_eq!(result.steps_run, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_script_runs_directly() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            dir.path(),
            "greet.sh",
            "#!/bin/sh\necho \"args:$#\"\nexit 7\n",
            0o755,
        );
        let cmd = Command::new("script", CommandKind::Script, path.to_string_lossy().to_string());
        let result = Executor::default().execute(&cmd);
        assert!(!result.succeeded);
        assert_eq!(result.stdout, "args:0\n");
        assert_eq!(result.exit_code, Some(7));
        assert_eq!(result.steps_run, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_script_bare_name_resolves_in_cwd() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "local_task", "#!/bin/sh\necho local\n", 0o755);
        let cmd = Command::new("script", CommandKind::Script, "local_task");
        let result = Executor::default().with_cwd(dir.path()).execute(&cmd);
        assert!(result.succeeded, "{:?}", result.failure);
        assert_eq!(result.stdout, "local\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_script_relative_path_checked_in_cwd() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("bin")).unwrap();
        let path = write_script(&dir.path().join("bin"), "off.sh", "#!/bin/sh\n", 0o644);
        let cmd = Command::new("script", CommandKind::Script, "bin/off.sh");
        let result = Executor::default().with_cwd(dir.path()).execute(&cmd);
        assert_eq!(result.failure, Some(Failure::ScriptNotExecutable(path)));
    }

    #[test]
    fn test_script_relative_name_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = Command::new("script", CommandKind::Script, "nowhere.sh");
        let result = Executor::default().with_cwd(dir.path()).execute(&cmd);
        assert_eq!(
            result.failure,
            Some(Failure::ScriptNotFound(dir.path().join("nowhere.sh")))
        );
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(Failure::ExitStatus(2).to_string(), "exited with status 2");
        assert_eq!(Failure::from_exit_code(None), Failure::Signaled);
        let step = FailedStep {
            position: 2,
            line: "exit 1".to_string(),
        };
        assert_eq!(step.to_string(), "step 2: exit 1");
    }
}
