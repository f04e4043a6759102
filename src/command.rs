//! External command invocation
//!
//! Everything the agent runs outside its own process (the orchestrator CLI,
//! the remote config fetch script) goes through a [`CommandRunner`], so the
//! pipeline can be driven against a recording double in tests.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{AgentError, Result};

/// A single external command invocation
#[derive(Clone, Default)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    /// Written to the child's stdin, then stdin is closed. Never logged.
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

// Env values and stdin may carry secrets
impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("program", &self.program)
            .field("args", &self.args)
            .field(
                "envs",
                &self.envs.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            )
            .field("stdin", &self.stdin.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turns a non-zero exit into [`AgentError::CommandFailed`]
    pub fn into_result(self, command: &CommandSpec) -> Result<CommandOutput> {
        if self.success() {
            Ok(self)
        } else {
            Err(AgentError::CommandFailed {
                command: command.to_string(),
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }

    /// Trimmed streams that `log` would emit, given the output flags
    pub fn loggable(&self, log_stdout: bool, log_stderr: bool) -> (Option<&str>, Option<&str>) {
        fn pick(enabled: bool, stream: &str) -> Option<&str> {
            let trimmed = stream.trim();
            (enabled && !trimmed.is_empty()).then_some(trimmed)
        }
        (pick(log_stdout, &self.stdout), pick(log_stderr, &self.stderr))
    }

    /// Logs trimmed stdout at info and stderr at warn, skipping empty streams
    pub fn log(&self, log_stdout: bool, log_stderr: bool) {
        let (out, err) = self.loggable(log_stdout, log_stderr);
        if let Some(out) = out {
            info!("stdout: {}", out);
        }
        if let Some(err) = err {
            warn!("stderr: {}", err);
        }
    }
}

pub type CommandFuture<'a> = Pin<Box<dyn Future<Output = Result<CommandOutput>> + Send + 'a>>;

/// Runs external commands to completion.
///
/// Implementations return `Err` only when the command could not be run at
/// all; a non-zero exit is reported through [`CommandOutput::code`].
pub trait CommandRunner: Send + Sync {
    fn run<'a>(&'a self, command: &'a CommandSpec) -> CommandFuture<'a>;
}

/// Spawns real child processes with `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run<'a>(&'a self, command: &'a CommandSpec) -> CommandFuture<'a> {
        Box::pin(spawn_and_wait(command))
    }
}

async fn spawn_and_wait(command: &CommandSpec) -> Result<CommandOutput> {
    debug!("Running: {}", command);

    let mut child = Command::new(&command.program)
        .args(&command.args)
        .envs(command.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(if command.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AgentError::CommandNotFound(command.program.clone())
            } else {
                AgentError::Io(e)
            }
        })?;

    if let Some(input) = &command.stdin {
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes()).await?;
            // dropping closes the pipe so the child sees EOF
        }
    }

    let output = child.wait_with_output().await?;

    Ok(CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}
