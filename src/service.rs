//! Resolver service control.
//!
//! The resolver's own tools are invoked through the [`CommandRunner`] trait so
//! the pipeline can be exercised without shelling out:
//! - [`ConfigValidator`] runs the syntax checker against a configuration file
//! - [`ServiceReloader`] restarts or reloads the resolver

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;

use crate::error::ValidationError;

/// A program and its arguments.
///
/// Deserializes from a non-empty list of strings, the first being the program.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<String>")]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    /// Create a command from a program and its arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns a copy of this command with one more trailing argument.
    #[must_use]
    pub fn with_arg(&self, arg: impl Into<String>) -> Self {
        let mut cmd = self.clone();
        cmd.args.push(arg.into());
        cmd
    }
}

impl TryFrom<Vec<String>> for CommandSpec {
    type Error = ValidationError;

    fn try_from(mut parts: Vec<String>) -> Result<Self, Self::Error> {
        if parts.is_empty() || parts[0].is_empty() {
            return Err(ValidationError::EmptyCommand);
        }
        let program = parts.remove(0);
        Ok(Self {
            program,
            args: parts,
        })
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Error type for external command execution.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The program could not be started.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The program exited unsuccessfully.
    #[error("`{command}` exited with {}: {output}", describe_status(*.status))]
    Failed {
        command: String,
        /// Exit code, `None` when killed by a signal.
        status: Option<i32>,
        /// Captured stdout followed by stderr.
        output: String,
    },
}

fn describe_status(status: Option<i32>) -> String {
    status.map_or_else(|| "signal".to_string(), |code| format!("status {code}"))
}

/// Trait for running external commands.
///
/// Implementations run the command to completion and capture its output:
/// - [`SystemCommandRunner`] spawns real processes
/// - test doubles record invocations
pub trait CommandRunner: Send + Sync {
    /// Run a command, failing if it cannot be started or exits non-zero.
    fn run(&self, command: &CommandSpec) -> impl Future<Output = Result<(), CommandError>> + Send;
}

/// Runs commands as child processes of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    async fn run(&self, command: &CommandSpec) -> Result<(), CommandError> {
        tracing::debug!(command = %command, "running command");

        let output = Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                command: command.to_string(),
                source,
            })?;

        if output.status.success() {
            return Ok(());
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Err(CommandError::Failed {
            command: command.to_string(),
            status: output.status.code(),
            output: combined.trim_end().to_string(),
        })
    }
}

/// Runs the resolver's syntax checker against a configuration file.
#[derive(Debug, Clone)]
pub struct ConfigValidator {
    command: CommandSpec,
}

impl ConfigValidator {
    pub const fn new(command: CommandSpec) -> Self {
        Self { command }
    }

    /// Check `path`, which is appended to the checker's arguments.
    pub async fn check<R: CommandRunner>(&self, runner: &R, path: &Path) -> Result<(), CommandError> {
        let command = self.command.with_arg(path.to_string_lossy());
        runner.run(&command).await?;
        tracing::info!(path = %path.display(), "configuration check passed");
        Ok(())
    }
}

/// Restarts or reloads the resolver.
#[derive(Debug, Clone)]
pub struct ServiceReloader {
    command: CommandSpec,
}

impl ServiceReloader {
    pub const fn new(command: CommandSpec) -> Self {
        Self { command }
    }

    pub async fn reload<R: CommandRunner>(&self, runner: &R) -> Result<(), CommandError> {
        runner.run(&self.command).await?;
        tracing::info!(command = %self.command, "resolver reloaded");
        Ok(())
    }
}
