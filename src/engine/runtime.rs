// src/engine/runtime.rs

//! Async/IO shell around [`RunMachine`].
//!
//! The orchestrator performs the side effects the machine asks for (create
//! the workspace, run the child, publish, clean up) and feeds the results
//! back in as events until the machine reports `Done`.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::RunSettings;
use crate::engine::core::{
    CleanupAction, FailureCause, RunCommand, RunEvent, RunMachine, RunState, Verdict,
};
use crate::errors::{IntempError, Result};
use crate::exec::{ChildStatus, ProcessRunner, TerminationSignals};
use crate::fs::FileSystem;
use crate::publish::{self, PublishReport};
use crate::workspace::{self, Workspace};

/// Exit code for failures of intemp itself (config, workspace, publish).
pub const EXIT_INTERNAL: i32 = 125;
/// Exit code when the command exists but could not be executed.
pub const EXIT_CANNOT_EXECUTE: i32 = 126;
/// Exit code when the command was not found.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// Terminal state (`Cleaned` or `Preserved`).
    pub state: RunState,
    pub workspace: PathBuf,
    pub child: Option<ChildStatus>,
    pub report: Option<PublishReport>,
    /// Spawn or publish error, if one ended the run.
    pub error: Option<IntempError>,
}

impl RunOutcome {
    pub fn verdict(&self) -> Verdict {
        self.state
            .verdict()
            .unwrap_or(Verdict::Failed(FailureCause::Spawn))
    }

    pub fn success(&self) -> bool {
        self.verdict().success()
    }

    /// Path of the workspace if it was left on disk.
    pub fn preserved_workspace(&self) -> Option<&Path> {
        match self.state {
            RunState::Preserved(_) => Some(&self.workspace),
            _ => None,
        }
    }

    /// Process exit code mirroring the child where possible.
    pub fn exit_code(&self) -> i32 {
        match self.verdict() {
            Verdict::Committed => 0,
            Verdict::Failed(FailureCause::Child(ChildStatus::Exited(code))) => code,
            Verdict::Failed(FailureCause::Child(ChildStatus::Signaled(sig))) => 128 + sig,
            Verdict::Failed(FailureCause::Spawn) => match &self.error {
                Some(IntempError::Spawn { source, .. })
                    if source.kind() == io::ErrorKind::NotFound =>
                {
                    EXIT_NOT_FOUND
                }
                _ => EXIT_CANNOT_EXECUTE,
            },
            Verdict::Failed(FailureCause::Publish) => EXIT_INTERNAL,
        }
    }

    /// One-line summary for the user.
    pub fn describe(&self) -> String {
        let tail = match self.preserved_workspace() {
            Some(p) => format!("; workspace kept at {}", p.display()),
            None => String::new(),
        };
        match (self.verdict(), &self.error) {
            (Verdict::Committed, _) => format!("command succeeded and outputs were published{tail}"),
            (Verdict::Failed(FailureCause::Child(status)), _) => {
                format!("command failed ({status}); nothing published{tail}")
            }
            (Verdict::Failed(cause), Some(err)) => {
                format!("{} failure ({cause:?}): {err}{tail}", err.phase())
            }
            (Verdict::Failed(cause), None) => format!("run failed ({cause:?}){tail}"),
        }
    }
}

/// Wires workspace manager, process runner and publisher together.
pub struct Orchestrator {
    fs: Arc<dyn FileSystem>,
    runner: Arc<dyn ProcessRunner>,
    settings: RunSettings,
}

impl Orchestrator {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        runner: Arc<dyn ProcessRunner>,
        settings: RunSettings,
    ) -> Self {
        Self {
            fs,
            runner,
            settings,
        }
    }

    /// Execute one full run.
    ///
    /// Returns `Err` when the workspace could not be created (nothing ran)
    /// or when a termination signal arrives after the child has exited, in
    /// which case publishing or cleanup stops where it is. Every other
    /// failure is reported through [`RunOutcome`] after the cleanup policy
    /// has been applied.
    pub async fn run(&self) -> Result<RunOutcome> {
        let mut machine = RunMachine::new(self.settings.preserve);
        let ws = workspace::create(self.fs.as_ref(), &self.settings.workspace)?;

        info!(workspace = %ws.path().display(), "Running in workspace");
        info!(cmd = %self.settings.command.display_line(), "Command");

        let mut child = None;
        let mut report = None;
        let mut failure = None;
        let mut interrupts = None;

        let mut command = machine.step(RunEvent::WorkspaceCreated)?;
        loop {
            command = match command {
                RunCommand::LaunchChild => machine.step(RunEvent::ChildLaunched)?,
                RunCommand::AwaitChild => {
                    let result = self.runner.run(&self.settings.command, ws.path()).await;
                    interrupts = subscribe_after_child();
                    match result {
                        Ok(status) => {
                            child = Some(status);
                            if status.success() {
                                info!("Command was successful");
                            } else {
                                warn!(%status, "Command failed");
                            }
                            machine.step(RunEvent::ChildExited(status))?
                        }
                        Err(err) => {
                            error!(error = %err, "could not launch command");
                            failure = Some(err);
                            machine.step(RunEvent::SpawnFailed)?
                        }
                    }
                }
                RunCommand::Publish => {
                    let published = tokio::select! {
                        res = self.publish(&ws) => res,
                        signo = next_interrupt(&mut interrupts) => {
                            return Err(interrupted(&ws, signo, "publishing"));
                        }
                    };
                    match published {
                        Ok(r) => {
                            report = Some(r);
                            machine.step(RunEvent::PublishSucceeded)?
                        }
                        Err(err) => {
                            error!(error = %err, "Failed to publish outputs to destination");
                            failure = Some(err);
                            machine.step(RunEvent::PublishFailed)?
                        }
                    }
                }
                RunCommand::Cleanup(action) => {
                    let done = tokio::select! {
                        done = self.cleanup(&ws, action, machine.state()) => done,
                        signo = next_interrupt(&mut interrupts) => {
                            return Err(interrupted(&ws, signo, "cleaning up"));
                        }
                    };
                    machine.step(RunEvent::CleanupDone(done))?
                }
                RunCommand::Done => break,
            };
        }

        let state = machine.state();
        let workspace = match state {
            RunState::Preserved(_) => workspace::preserve(ws),
            _ => ws.path().to_path_buf(),
        };
        Ok(RunOutcome {
            state,
            workspace,
            child,
            report,
            error: failure,
        })
    }

    async fn publish(&self, ws: &Workspace) -> Result<PublishReport> {
        let fs = Arc::clone(&self.fs);
        let source = ws.path().to_path_buf();
        let destination = self.settings.destination.clone();
        let options = self.settings.publish_options();

        tokio::task::spawn_blocking(move || {
            publish::publish(fs.as_ref(), &source, &destination, &options)
        })
        .await
        .map_err(|e| IntempError::Other(anyhow::anyhow!("publish task failed: {e}")))?
    }

    /// Carry out `action`, returning what actually happened to the workspace.
    async fn cleanup(&self, ws: &Workspace, action: CleanupAction, state: RunState) -> CleanupAction {
        let adjective = match state.verdict() {
            Some(Verdict::Committed) => "successful",
            _ => "failed",
        };

        match action {
            CleanupAction::Preserve => {
                info!(
                    workspace = %ws.path().display(),
                    "Preserving working directory of {adjective} run"
                );
                CleanupAction::Preserve
            }
            CleanupAction::Delete => {
                info!(
                    workspace = %ws.path().display(),
                    "Deleting working directory of {adjective} run"
                );
                let fs = Arc::clone(&self.fs);
                let target = ws.clone();
                let res = tokio::task::spawn_blocking(move || workspace::destroy(fs.as_ref(), &target))
                    .await
                    .map_err(|e| IntempError::Other(anyhow::anyhow!("cleanup task failed: {e}")));
                match res {
                    Ok(Ok(())) => CleanupAction::Delete,
                    Ok(Err(err)) | Err(err) => {
                        error!(
                            workspace = %ws.path().display(),
                            error = %err,
                            "could not delete workspace; leaving it in place"
                        );
                        CleanupAction::Preserve
                    }
                }
            }
        }
    }
}

/// Take the signal subscription that guards publishing and cleanup.
fn subscribe_after_child() -> Option<TerminationSignals> {
    match TerminationSignals::install() {
        Ok(signals) => Some(signals),
        Err(e) => {
            warn!(error = %e, "cannot watch for termination signals during publish");
            None
        }
    }
}

async fn next_interrupt(signals: &mut Option<TerminationSignals>) -> i32 {
    match signals {
        Some(signals) => signals.recv().await,
        None => std::future::pending().await,
    }
}

fn interrupted(ws: &Workspace, signo: i32, phase: &str) -> IntempError {
    error!(
        signal = signo,
        workspace = %ws.path().display(),
        "interrupted while {phase}; leaving workspace in place"
    );
    IntempError::Interrupted {
        signal: signo,
        workspace: ws.path().to_path_buf(),
    }
}

/// Process exit code for a run that ended in `err` without an outcome.
pub fn exit_code_for_error(err: &IntempError) -> i32 {
    match err {
        IntempError::Interrupted { signal, .. } => 128 + signal,
        _ => EXIT_INTERNAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::workspace::WorkspaceSpec;
    use std::future::Future;
    use std::pin::Pin;

    use crate::exec::CommandSpec;
    use crate::types::PreservePolicy;

    /// Writes `files` into the workspace and exits with `status`.
    struct ScriptedRunner {
        fs: MockFileSystem,
        files: Vec<(&'static str, &'static str)>,
        status: ChildStatus,
    }

    impl ProcessRunner for ScriptedRunner {
        fn run<'a>(
            &'a self,
            _command: &'a CommandSpec,
            cwd: &'a Path,
        ) -> Pin<Box<dyn Future<Output = Result<ChildStatus>> + Send + 'a>> {
            Box::pin(async move {
                for (name, body) in &self.files {
                    self.fs.add_file(cwd.join(name), body.as_bytes().to_vec());
                }
                Ok(self.status)
            })
        }
    }

    fn setup(status: ChildStatus, preserve: PreservePolicy) -> (MockFileSystem, Orchestrator) {
        let fs = MockFileSystem::new();
        fs.add_dir("/tmp");
        fs.add_dir("/dest");
        let runner = ScriptedRunner {
            fs: fs.clone(),
            files: vec![("result.txt", "42\n")],
            status,
        };
        let mut settings = RunSettings::new(
            CommandSpec::from_argv(&["job".to_string()]).unwrap(),
            PathBuf::from("/dest"),
        );
        settings.workspace = WorkspaceSpec::Under(PathBuf::from("/tmp"));
        settings.preserve = preserve;
        let orch = Orchestrator::new(Arc::new(fs.clone()), Arc::new(runner), settings);
        (fs, orch)
    }

    #[tokio::test]
    async fn success_publishes_and_deletes_workspace() {
        let (fs, orch) = setup(ChildStatus::Exited(0), PreservePolicy::Never);
        let outcome = orch.run().await.unwrap();

        assert_eq!(outcome.state, RunState::Cleaned(Verdict::Committed));
        assert_eq!(outcome.exit_code(), 0);
        assert!(outcome.preserved_workspace().is_none());
        assert!(outcome.workspace.starts_with("/tmp"));
        assert_eq!(fs.read_file("/dest/result.txt"), Some(b"42\n".to_vec()));
        assert!(!fs.exists(&outcome.workspace));
        assert_eq!(outcome.report.unwrap().transferred_names(), vec!["result.txt"]);
    }

    #[tokio::test]
    async fn failure_with_preserve_on_failure_keeps_workspace() {
        let (fs, orch) = setup(ChildStatus::Exited(1), PreservePolicy::Failure);
        let outcome = orch.run().await.unwrap();

        assert!(!outcome.success());
        assert_eq!(outcome.exit_code(), 1);
        assert!(fs.child_names("/dest").is_empty());
        let kept = outcome.preserved_workspace().unwrap();
        assert_eq!(kept, outcome.workspace.as_path());
        assert_eq!(fs.child_names(kept), vec!["result.txt"]);
    }

    #[test]
    fn interruption_maps_to_128_plus_signal() {
        let err = IntempError::Interrupted {
            signal: 2,
            workspace: PathBuf::from("/tmp/intemp.ws"),
        };
        assert_eq!(exit_code_for_error(&err), 130);
        assert_eq!(
            exit_code_for_error(&IntempError::WorkspaceOccupied(PathBuf::from("/w"))),
            EXIT_INTERNAL
        );
    }

    #[tokio::test]
    async fn signaled_child_maps_to_128_plus_signal() {
        let (fs, orch) = setup(ChildStatus::Signaled(15), PreservePolicy::Never);
        let outcome = orch.run().await.unwrap();

        assert_eq!(outcome.exit_code(), 143);
        assert!(fs.child_names("/dest").is_empty());
        assert!(!fs.exists(&outcome.workspace));
    }

    #[tokio::test]
    async fn publish_conflict_keeps_workspace_even_with_preserve_never() {
        let (fs, orch) = setup(ChildStatus::Exited(0), PreservePolicy::Never);
        fs.add_file("/dest/result.txt", b"old".to_vec());

        let outcome = orch.run().await.unwrap();

        assert_eq!(
            outcome.state,
            RunState::Preserved(Verdict::Failed(FailureCause::Publish))
        );
        assert_eq!(outcome.exit_code(), EXIT_INTERNAL);
        assert!(matches!(
            outcome.error,
            Some(IntempError::DestinationConflict { .. })
        ));
        assert_eq!(fs.read_file("/dest/result.txt"), Some(b"old".to_vec()));
        assert!(fs.exists(&outcome.workspace.join("result.txt")));
    }

    #[tokio::test]
    async fn occupied_fixed_workspace_fails_before_running() {
        let (fs, mut orch) = setup(ChildStatus::Exited(0), PreservePolicy::Never);
        fs.add_file("/busy/file", b"x".to_vec());
        orch.settings.workspace = WorkspaceSpec::Fixed(PathBuf::from("/busy"));

        let err = orch.run().await.unwrap_err();
        assert!(matches!(err, IntempError::WorkspaceOccupied(_)));
        assert_eq!(fs.child_names("/busy"), vec!["file"]);
        assert!(fs.child_names("/dest").is_empty());
    }
}
