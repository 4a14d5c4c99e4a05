//! External command execution.
//!
//! Both the archive utility and the Godot export run through a single
//! synchronous primitive: [`CommandRunner::run`] takes a [`CommandSpec`],
//! blocks until the process exits, and returns a [`CommandOutcome`] with the
//! exit status and, when capture was requested, the process output. Streamed
//! (inherited) output is the default so long exports stay observable.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// A command line plus its environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    capture_output: bool,
}

impl CommandSpec {
    /// Start a command for `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            capture_output: false,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_owned()));
        self
    }

    /// Set an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_owned(), value.as_ref().to_owned()));
        self
    }

    /// Capture stdout and stderr instead of inheriting them.
    #[must_use]
    pub fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    /// Return the program path.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Return the arguments.
    #[must_use]
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Return the value set for `key`, if any.
    #[must_use]
    pub fn get_env(&self, key: &str) -> Option<&OsStr> {
        self.envs
            .iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_os_str())
    }

    /// Return true when output is captured rather than streamed.
    #[must_use]
    pub fn captures_output(&self) -> bool {
        self.capture_output
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Result of a completed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit status of the process.
    pub status: ExitStatus,
    /// Captured stdout, when capture was requested.
    pub stdout: Option<Vec<u8>>,
    /// Captured stderr, when capture was requested.
    pub stderr: Option<Vec<u8>>,
}

impl CommandOutcome {
    /// Return true if the process exited with status 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    /// Run `command` to completion.
    ///
    /// # Errors
    ///
    /// Returns any I/O error encountered while spawning or waiting for the
    /// process. A non-zero exit is not an error at this level.
    fn run(&self, command: &CommandSpec) -> std::io::Result<CommandOutcome>;
}

/// Runs commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, command: &CommandSpec) -> std::io::Result<CommandOutcome> {
        log::debug!("running {command}");
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        for (key, value) in &command.envs {
            cmd.env(key, value);
        }

        if command.capture_output {
            let output = cmd.stdin(Stdio::null()).output()?;
            return Ok(CommandOutcome {
                status: output.status,
                stdout: Some(output.stdout),
                stderr: Some(output.stderr),
            });
        }

        let status = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        Ok(CommandOutcome {
            status,
            stdout: None,
            stderr: None,
        })
    }
}
