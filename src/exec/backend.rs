// src/exec/backend.rs

//! Pluggable process runner abstraction.
//!
//! The orchestrator runs the child through a `ProcessRunner` instead of
//! spawning directly, so tests can script what the "child" writes and how it
//! exits without launching real processes.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::errors::Result;

/// How one standard stream of the child is bound.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StreamBinding {
    /// Share the supervisor's own stream (default).
    #[default]
    Inherit,
    /// Connect to the null device.
    Null,
    /// Read from (stdin) or truncate-and-write to (stdout/stderr) this file.
    File(PathBuf),
}

/// Bindings for the child's stdin, stdout and stderr.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StdioBindings {
    pub stdin: StreamBinding,
    pub stdout: StreamBinding,
    pub stderr: StreamBinding,
}

/// The command to supervise: a program plus its arguments, passed through
/// unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub stdio: StdioBindings,
}

impl CommandSpec {
    /// Split an argv vector into program and arguments.
    ///
    /// Returns `None` for an empty vector.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            stdio: StdioBindings::default(),
        })
    }

    pub fn with_stdio(mut self, stdio: StdioBindings) -> Self {
        self.stdio = stdio;
        self
    }

    /// Shell-quoted rendering of the full command line, for logs.
    pub fn display_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|a| shell_quote(a))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// How the child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStatus {
    /// Exited normally with this code.
    Exited(i32),
    /// Terminated by this signal number.
    Signaled(i32),
}

impl ChildStatus {
    /// Only a clean exit with code zero counts as success.
    pub fn success(&self) -> bool {
        matches!(self, ChildStatus::Exited(0))
    }
}

impl fmt::Display for ChildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildStatus::Exited(code) => write!(f, "exited with code {code}"),
            ChildStatus::Signaled(sig) => write!(f, "terminated by signal {sig}"),
        }
    }
}

/// Trait abstracting how the child command is executed.
///
/// Production code uses [`crate::exec::Supervisor`]; tests can provide their
/// own implementation that doesn't spawn real processes.
pub trait ProcessRunner: Send + Sync {
    /// Run `command` with working directory `cwd` and wait for it to end.
    ///
    /// An `Err` means the command never ran (e.g. not found); a child that ran
    /// and failed is an `Ok` with a non-successful [`ChildStatus`].
    fn run<'a>(
        &'a self,
        command: &'a CommandSpec,
        cwd: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<ChildStatus>> + Send + 'a>>;
}
