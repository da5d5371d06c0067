//! Subprocess launching with captured output and an optional time limit

use crate::error::EnvironmentError;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// A command line to launch, without a shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program path or name
    pub program: String,
    /// Arguments in order
    pub args: Vec<String>,
    /// Working directory, inherited when `None`
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Command with no arguments
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished (or abandoned) process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured stdout, lossily decoded
    pub stdout: String,
    /// Captured stderr, lossily decoded
    pub stderr: String,
    /// Exit code; `None` if killed by a signal or timed out
    pub exit_code: Option<i32>,
    /// The time limit elapsed and the process was killed
    pub timed_out: bool,
    /// Wall time
    pub elapsed: Duration,
}

impl CommandOutput {
    /// Output of a process that exited with `code`
    #[must_use]
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: Some(code),
            timed_out: false,
            elapsed: Duration::ZERO,
        }
    }

    /// Output of a process killed at the time limit
    #[must_use]
    pub fn timed_out(elapsed: Duration) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            timed_out: true,
            elapsed,
        }
    }

    /// Exited normally with code zero
    #[inline]
    #[must_use]
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Run a command to completion, capturing stdout and stderr.
///
/// Stdin is closed. When `timeout` elapses the child is killed and the
/// output is reported as timed out rather than as an error.
///
/// # Errors
/// `EnvironmentError::Spawn` if the program cannot be started,
/// `EnvironmentError::Wait` if collecting its output fails.
pub async fn run_command(
    spec: &CommandSpec,
    timeout: Option<Duration>,
) -> Result<CommandOutput, EnvironmentError> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }

    tracing::debug!(command = %spec, "spawning");
    let started = Instant::now();
    let child = cmd.spawn().map_err(|source| EnvironmentError::Spawn {
        program: spec.program.clone(),
        source,
    })?;

    let waited = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(waited) => waited,
            Err(_) => {
                tracing::warn!(command = %spec, ?limit, "command timed out, killed");
                return Ok(CommandOutput::timed_out(started.elapsed()));
            }
        },
        None => child.wait_with_output().await,
    };

    let output = waited.map_err(|source| EnvironmentError::Wait {
        program: spec.program.clone(),
        source,
    })?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
        timed_out: false,
        elapsed: started.elapsed(),
    })
}
