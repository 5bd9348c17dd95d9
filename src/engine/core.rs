// src/engine/core.rs

//! Pure run state machine.
//!
//! [`RunMachine`] consumes [`RunEvent`]s and answers with the [`RunCommand`]
//! the IO shell (`engine::runtime::Orchestrator`) should carry out next. It
//! owns no paths, processes or Tokio types, so every transition and the
//! cleanup decision can be unit tested directly.

use crate::errors::{IntempError, Result};
use crate::exec::ChildStatus;
use crate::types::PreservePolicy;

/// Why a run did not commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// The command could not be launched.
    Spawn,
    /// The command ran but exited non-zero or was killed by a signal.
    Child(ChildStatus),
    /// The command succeeded but its outputs could not be published.
    Publish,
}

/// How a run ended, before cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Committed,
    Failed(FailureCause),
}

impl Verdict {
    pub fn success(&self) -> bool {
        matches!(self, Verdict::Committed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    WorkspaceCreated,
    ChildRunning,
    /// Child exited zero; the publisher is at work.
    Publishing,
    Committed,
    Failed(FailureCause),
    Cleaned(Verdict),
    Preserved(Verdict),
}

impl RunState {
    fn name(&self) -> &'static str {
        match self {
            RunState::Init => "Init",
            RunState::WorkspaceCreated => "WorkspaceCreated",
            RunState::ChildRunning => "ChildRunning",
            RunState::Publishing => "Publishing",
            RunState::Committed => "Committed",
            RunState::Failed(_) => "Failed",
            RunState::Cleaned(_) => "Cleaned",
            RunState::Preserved(_) => "Preserved",
        }
    }

    /// The verdict, once the run has one.
    pub fn verdict(&self) -> Option<Verdict> {
        match *self {
            RunState::Committed => Some(Verdict::Committed),
            RunState::Failed(cause) => Some(Verdict::Failed(cause)),
            RunState::Cleaned(v) | RunState::Preserved(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Cleaned(_) | RunState::Preserved(_))
    }
}

/// What to do with the workspace at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupAction {
    Delete,
    Preserve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    WorkspaceCreated,
    /// The child has been handed to the process runner.
    ChildLaunched,
    SpawnFailed,
    ChildExited(ChildStatus),
    PublishSucceeded,
    PublishFailed,
    /// The cleanup decision was carried out with this effect.
    CleanupDone(CleanupAction),
}

impl RunEvent {
    fn name(&self) -> &'static str {
        match self {
            RunEvent::WorkspaceCreated => "WorkspaceCreated",
            RunEvent::ChildLaunched => "ChildLaunched",
            RunEvent::SpawnFailed => "SpawnFailed",
            RunEvent::ChildExited(_) => "ChildExited",
            RunEvent::PublishSucceeded => "PublishSucceeded",
            RunEvent::PublishFailed => "PublishFailed",
            RunEvent::CleanupDone(_) => "CleanupDone",
        }
    }
}

/// Command for the IO shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunCommand {
    LaunchChild,
    AwaitChild,
    Publish,
    Cleanup(CleanupAction),
    Done,
}

/// Decide the fate of the workspace from the verdict and the policy.
///
/// A run whose child succeeded but whose publish failed always keeps its
/// workspace: those outputs exist nowhere else.
pub fn cleanup_action(verdict: Verdict, policy: PreservePolicy) -> CleanupAction {
    match (verdict, policy) {
        (Verdict::Failed(FailureCause::Publish), _) => CleanupAction::Preserve,
        (_, PreservePolicy::Always) => CleanupAction::Preserve,
        (Verdict::Failed(_), PreservePolicy::Failure) => CleanupAction::Preserve,
        _ => CleanupAction::Delete,
    }
}

#[derive(Debug)]
pub struct RunMachine {
    state: RunState,
    policy: PreservePolicy,
}

impl RunMachine {
    pub fn new(policy: PreservePolicy) -> Self {
        Self {
            state: RunState::Init,
            policy,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn step(&mut self, event: RunEvent) -> Result<RunCommand> {
        let (next, command) = match (self.state, event) {
            (RunState::Init, RunEvent::WorkspaceCreated) => {
                (RunState::WorkspaceCreated, RunCommand::LaunchChild)
            }
            (RunState::WorkspaceCreated, RunEvent::ChildLaunched) => {
                (RunState::ChildRunning, RunCommand::AwaitChild)
            }
            (RunState::ChildRunning, RunEvent::SpawnFailed) => {
                self.fail(FailureCause::Spawn)
            }
            (RunState::ChildRunning, RunEvent::ChildExited(status)) => {
                if status.success() {
                    (RunState::Publishing, RunCommand::Publish)
                } else {
                    self.fail(FailureCause::Child(status))
                }
            }
            (RunState::Publishing, RunEvent::PublishSucceeded) => {
                let action = cleanup_action(Verdict::Committed, self.policy);
                (RunState::Committed, RunCommand::Cleanup(action))
            }
            (RunState::Publishing, RunEvent::PublishFailed) => self.fail(FailureCause::Publish),
            (state @ (RunState::Committed | RunState::Failed(_)), RunEvent::CleanupDone(done)) => {
                let verdict = state.verdict().unwrap_or(Verdict::Committed);
                let next = match done {
                    CleanupAction::Delete => RunState::Cleaned(verdict),
                    CleanupAction::Preserve => RunState::Preserved(verdict),
                };
                (next, RunCommand::Done)
            }
            (state, event) => {
                return Err(IntempError::InvalidTransition {
                    from: state.name(),
                    event: event.name(),
                });
            }
        };
        self.state = next;
        Ok(command)
    }

    fn fail(&self, cause: FailureCause) -> (RunState, RunCommand) {
        let action = cleanup_action(Verdict::Failed(cause), self.policy);
        (RunState::Failed(cause), RunCommand::Cleanup(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(policy: PreservePolicy, events: &[RunEvent]) -> (RunMachine, Vec<RunCommand>) {
        let mut m = RunMachine::new(policy);
        let cmds = events.iter().map(|e| m.step(*e).unwrap()).collect();
        (m, cmds)
    }

    #[test]
    fn successful_run_publishes_then_cleans() {
        let (m, cmds) = drive(
            PreservePolicy::Never,
            &[
                RunEvent::WorkspaceCreated,
                RunEvent::ChildLaunched,
                RunEvent::ChildExited(ChildStatus::Exited(0)),
                RunEvent::PublishSucceeded,
                RunEvent::CleanupDone(CleanupAction::Delete),
            ],
        );
        assert_eq!(
            cmds,
            vec![
                RunCommand::LaunchChild,
                RunCommand::AwaitChild,
                RunCommand::Publish,
                RunCommand::Cleanup(CleanupAction::Delete),
                RunCommand::Done,
            ]
        );
        assert_eq!(m.state(), RunState::Cleaned(Verdict::Committed));
        assert!(m.state().is_terminal());
    }

    #[test]
    fn failing_child_never_publishes() {
        let (m, cmds) = drive(
            PreservePolicy::Failure,
            &[
                RunEvent::WorkspaceCreated,
                RunEvent::ChildLaunched,
                RunEvent::ChildExited(ChildStatus::Exited(1)),
            ],
        );
        assert_eq!(cmds.last(), Some(&RunCommand::Cleanup(CleanupAction::Preserve)));
        assert_eq!(
            m.state(),
            RunState::Failed(FailureCause::Child(ChildStatus::Exited(1)))
        );
    }

    #[test]
    fn signaled_child_is_a_failure() {
        let (m, _) = drive(
            PreservePolicy::Never,
            &[
                RunEvent::WorkspaceCreated,
                RunEvent::ChildLaunched,
                RunEvent::ChildExited(ChildStatus::Signaled(2)),
            ],
        );
        assert!(!m.state().verdict().unwrap().success());
    }

    #[test]
    fn publish_is_rejected_after_child_failure() {
        let mut m = RunMachine::new(PreservePolicy::Never);
        m.step(RunEvent::WorkspaceCreated).unwrap();
        m.step(RunEvent::ChildLaunched).unwrap();
        m.step(RunEvent::ChildExited(ChildStatus::Exited(2))).unwrap();
        let err = m.step(RunEvent::PublishSucceeded).unwrap_err();
        assert!(matches!(err, IntempError::InvalidTransition { from: "Failed", .. }));
    }

    #[test]
    fn cleanup_decision_table() {
        use CleanupAction::*;
        use PreservePolicy::*;

        let child_failed = Verdict::Failed(FailureCause::Child(ChildStatus::Exited(1)));
        let spawn_failed = Verdict::Failed(FailureCause::Spawn);
        let publish_failed = Verdict::Failed(FailureCause::Publish);

        let cases = [
            (Verdict::Committed, Never, Delete),
            (Verdict::Committed, Failure, Delete),
            (Verdict::Committed, Always, Preserve),
            (child_failed, Never, Delete),
            (child_failed, Failure, Preserve),
            (child_failed, Always, Preserve),
            (spawn_failed, Never, Delete),
            (spawn_failed, Failure, Preserve),
            (publish_failed, Never, Preserve),
            (publish_failed, Failure, Preserve),
            (publish_failed, Always, Preserve),
        ];
        for (verdict, policy, expected) in cases {
            assert_eq!(
                cleanup_action(verdict, policy),
                expected,
                "verdict {verdict:?} policy {policy:?}"
            );
        }
    }
}
