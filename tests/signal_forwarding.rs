// tests/signal_forwarding.rs
//
// Lives in its own test binary: it sends SIGTERM to the test process itself.
// Both cases share one test so no two signals are ever in flight at once.

#![cfg(unix)]

mod common;
use crate::common::init_tracing;

use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use intemp::exec::{ChildStatus, CommandSpec, Supervisor, TerminationSignals};

fn sleeper() -> CommandSpec {
    CommandSpec::from_argv(&["sleep".to_string(), "30".to_string()]).unwrap()
}

#[tokio::test]
async fn termination_signals_reach_the_child() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let supervisor = Supervisor::new();

    // Delivered while the child is running.
    let cmd = sleeper();
    let run = supervisor.run_child(&cmd, dir.path());
    tokio::pin!(run);

    let early = tokio::time::timeout(Duration::from_millis(500), &mut run).await;
    assert!(early.is_err(), "child ended before it was signalled");

    kill(Pid::this(), Signal::SIGTERM).unwrap();

    let status = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("child was not stopped by the forwarded signal")
        .unwrap();
    assert_eq!(status, ChildStatus::Signaled(Signal::SIGTERM as i32));

    // Delivered after subscribing but before the child exists: it is queued
    // and relayed once the child has been spawned.
    let signals = TerminationSignals::install().unwrap();
    kill(Pid::this(), Signal::SIGTERM).unwrap();

    let status = tokio::time::timeout(
        Duration::from_secs(10),
        supervisor.run_child_with(&sleeper(), dir.path(), signals),
    )
    .await
    .expect("queued signal was not relayed to the child")
    .unwrap();
    assert_eq!(status, ChildStatus::Signaled(Signal::SIGTERM as i32));
}
