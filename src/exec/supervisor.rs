// src/exec/supervisor.rs

//! Production process runner.

use std::fs::File;
use std::future::Future;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{IntempError, Result};
use crate::exec::backend::{ChildStatus, CommandSpec, ProcessRunner, StreamBinding};
use crate::exec::signals::{self, TerminationSignals};

/// Spawns the child with its working directory set to the workspace, waits
/// for it without any timeout and forwards termination signals meanwhile.
/// The signal subscription ends when the child has been reaped.
///
/// Streams are inherited unless bound explicitly, so the supervisor never
/// relays bytes itself and cannot deadlock on a full pipe.
#[derive(Debug, Clone, Default)]
pub struct Supervisor;

impl Supervisor {
    pub fn new() -> Self {
        Self
    }

    pub async fn run_child(&self, command: &CommandSpec, cwd: &Path) -> Result<ChildStatus> {
        // Subscribe before spawning so a signal arriving in between is
        // queued for the child rather than killing us.
        let signals = TerminationSignals::install()
            .map_err(|source| IntempError::io("installing signal forwarding", source))?;
        self.run_child_with(command, cwd, signals).await
    }

    /// Like [`Supervisor::run_child`], relaying signals received on an
    /// existing subscription, including any already queued on it.
    pub async fn run_child_with(
        &self,
        command: &CommandSpec,
        cwd: &Path,
        mut signals: TerminationSignals,
    ) -> Result<ChildStatus> {
        info!(
            cmd = %command.display_line(),
            cwd = %cwd.display(),
            "starting child process"
        );

        let spawn_err = |source: io::Error| IntempError::Spawn {
            program: command.program.clone(),
            source,
        };

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(cwd)
            .stdin(bind(&command.stdio.stdin, false).map_err(spawn_err)?)
            .stdout(bind(&command.stdio.stdout, true).map_err(spawn_err)?)
            .stderr(bind(&command.stdio.stderr, true).map_err(spawn_err)?)
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(spawn_err)?;
        let pid = child.id();

        let status = loop {
            tokio::select! {
                status = child.wait() => break status,
                signo = signals.recv() => match pid {
                    Some(pid) => signals::forward(pid, signo),
                    None => debug!(signo, "child already reaped; signal dropped"),
                },
            }
        }
        .map_err(|source| IntempError::io(format!("waiting for '{}'", command.program), source))?;
        drop(signals);

        let status = child_status(status);
        info!(
            cmd = %command.program,
            status = %status,
            success = status.success(),
            "child process ended"
        );
        Ok(status)
    }
}

impl ProcessRunner for Supervisor {
    fn run<'a>(
        &'a self,
        command: &'a CommandSpec,
        cwd: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<ChildStatus>> + Send + 'a>> {
        Box::pin(self.run_child(command, cwd))
    }
}

fn bind(binding: &StreamBinding, write: bool) -> io::Result<Stdio> {
    match binding {
        StreamBinding::Inherit => Ok(Stdio::inherit()),
        StreamBinding::Null => Ok(Stdio::null()),
        StreamBinding::File(path) => {
            debug!(path = %path.display(), write, "binding child stream to file");
            let file = if write {
                File::create(path)
            } else {
                File::open(path)
            };
            file.map(Stdio::from)
                .map_err(|e| io::Error::new(e.kind(), format!("opening {}: {e}", path.display())))
        }
    }
}

#[cfg(unix)]
fn child_status(status: ExitStatus) -> ChildStatus {
    use std::os::unix::process::ExitStatusExt;
    match (status.code(), status.signal()) {
        (Some(code), _) => ChildStatus::Exited(code),
        (None, Some(sig)) => ChildStatus::Signaled(sig),
        (None, None) => ChildStatus::Exited(-1),
    }
}

#[cfg(not(unix))]
fn child_status(status: ExitStatus) -> ChildStatus {
    ChildStatus::Exited(status.code().unwrap_or(-1))
}
