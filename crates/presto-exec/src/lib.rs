//! Local process execution backend for presto.
//!
//! Narrowed from an `Executor` trait (`spawn`/`logs`/`status`/`wait`/
//! `cancel` against a remote job handle) to a single blocking `run`
//! call, since presto has no remote jobs to separately poll: a command
//! either runs to completion or it doesn't. Outcome classification
//! (not-found, permission-denied, non-zero exit) follows the `except`
//! chain in `executor.py` (`FileNotFoundError`, `PermissionError`,
//! `CalledProcessError`).

use std::io::ErrorKind;

use async_trait::async_trait;

/// What happened when a command argv was run.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The process ran and exited successfully (status code 0).
    Success { output: String },
    /// The process ran but exited with a non-zero status.
    NonZeroExit { output: String, code: Option<i32> },
    /// The first argument of the command could not be found on `PATH`.
    CommandNotFound { message: String },
    /// The OS refused to execute the command.
    PermissionDenied { message: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Captured combined stdout+stderr, or an explanatory message for
    /// outcomes that never produced process output.
    pub fn message(&self) -> &str {
        match self {
            Outcome::Success { output } | Outcome::NonZeroExit { output, .. } => output,
            Outcome::CommandNotFound { message } | Outcome::PermissionDenied { message } => message,
        }
    }
}

/// Runs a single command argv to completion.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(&self, argv: &[String]) -> Outcome;
}

/// Executes commands as local child processes, mirroring
/// `subprocess.check_output(cmd, stderr=subprocess.STDOUT)`: stdout and
/// stderr are captured and combined into a single message.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalExecutor;

#[async_trait]
impl Executor for LocalExecutor {
    async fn run(&self, argv: &[String]) -> Outcome {
        let Some((program, args)) = argv.split_first() else {
            return Outcome::CommandNotFound {
                message: "empty command".to_string(),
            };
        };

        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(std::process::Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                let combined = remove_trailing_space_before_newline(&combined);
                if output.status.success() {
                    Outcome::Success { output: combined }
                } else {
                    Outcome::NonZeroExit {
                        output: combined,
                        code: output.status.code(),
                    }
                }
            }
            Err(err) => match err.kind() {
                ErrorKind::NotFound => Outcome::CommandNotFound {
                    message: format!("{program}: command not found"),
                },
                ErrorKind::PermissionDenied => Outcome::PermissionDenied {
                    message: format!("{program}: permission denied"),
                },
                _ => Outcome::NonZeroExit {
                    output: err.to_string(),
                    code: None,
                },
            },
        }
    }
}

/// Strips trailing whitespace from every line, matching
/// `remove_space_before_new_line`, required so the captured output
/// survives being dumped back out as a YAML literal
/// block scalar.
fn remove_trailing_space_before_newline(output: &str) -> String {
    output
        .lines()
        .map(|line| format!("{}\n", line.trim_end()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_a_successful_command() {
        let executor = LocalExecutor;
        let outcome = executor.run(&["echo".to_string(), "hi".to_string()]).await;
        assert!(outcome.is_success());
        assert_eq!(outcome.message(), "hi\n");
    }

    #[tokio::test]
    async fn reports_non_zero_exit() {
        let executor = LocalExecutor;
        let outcome = executor.run(&["false".to_string()]).await;
        assert!(matches!(outcome, Outcome::NonZeroExit { .. }));
    }

    #[tokio::test]
    async fn reports_command_not_found() {
        let executor = LocalExecutor;
        let outcome = executor
            .run(&["definitely-not-a-real-binary-xyz".to_string()])
            .await;
        assert!(matches!(outcome, Outcome::CommandNotFound { .. }));
    }

    #[test]
    fn strips_trailing_space_before_newline() {
        assert_eq!(remove_trailing_space_before_newline("a  \nb\t\n"), "a\nb\n");
    }
}
