//! External command execution.
//!
//! [`CommandRunner`] is the seam between the client and the cluster tools.
//! [`ProcessRunner`] spawns real processes, each bounded by its own deadline;
//! tests substitute a scripted runner.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

/// Errors from running an external command.
///
/// A command that runs and exits non-zero is not a `RunnerError`; that is
/// reported through [`CommandOutput::exit_code`].
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },

    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build process runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// A single program invocation, without any shell in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs external commands on behalf of the client.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunnerError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunnerError> {
        (**self).run(invocation)
    }
}

/// Spawns real processes with a per-command deadline.
///
/// Owns a current-thread tokio runtime and blocks on it, so it must not be
/// called from inside another async runtime. A child still running at the
/// deadline is killed.
pub struct ProcessRunner {
    runtime: Runtime,
    timeout: Duration,
}

impl fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Result<Self, RunnerError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(RunnerError::Runtime)?;

        Ok(Self { runtime, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run_async(&self, invocation: &Invocation) -> Result<CommandOutput, RunnerError> {
        let program = invocation.program.clone();
        let io_err = |source: std::io::Error| RunnerError::Io {
            program: program.clone(),
            source,
        };

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let input = invocation.stdin.clone();
        let write_stdin = async move {
            let (Some(mut pipe), Some(input)) = (stdin, input) else {
                return Ok(());
            };
            let written = match pipe.write_all(input.as_bytes()).await {
                Ok(()) => pipe.shutdown().await,
                Err(e) => Err(e),
            };
            match written {
                // The child exited without draining stdin; its exit status
                // and stderr still describe the outcome.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    debug!(
                        target: "cluster_client.runner",
                        program = %invocation.program,
                        "Command closed stdin before reading all input"
                    );
                    Ok(())
                }
                other => other,
            }
        };

        let finished = tokio::time::timeout(self.timeout, async {
            let (written, output) = tokio::join!(write_stdin, child.wait_with_output());
            written?;
            output
        })
        .await;

        let output = match finished {
            Ok(result) => result.map_err(io_err)?,
            Err(_elapsed) => {
                warn!(
                    target: "cluster_client.runner",
                    program = %invocation.program,
                    timeout_ms = self.timeout.as_millis(),
                    "Command exceeded its deadline and was killed"
                );
                return Err(RunnerError::TimedOut {
                    program: invocation.program.clone(),
                    timeout: self.timeout,
                });
            }
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunnerError> {
        debug!(target: "cluster_client.runner", command = %invocation, "Running command");

        let output = self.runtime.block_on(self.run_async(invocation))?;

        debug!(
            target: "cluster_client.runner",
            command = %invocation,
            exit_code = output.exit_code,
            stdout_len = output.stdout.len(),
            "Command finished"
        );
        Ok(output)
    }
}
