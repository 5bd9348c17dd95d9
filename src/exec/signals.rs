// src/exec/signals.rs

//! Termination signals (SIGINT, SIGTERM, SIGHUP, SIGQUIT) as an async
//! stream.
//!
//! A [`TerminationSignals`] is a scoped subscription: while one is held,
//! these signals no longer kill the process and are delivered to the holder
//! instead. The supervisor holds one for exactly the child's lifetime and
//! relays what it receives with [`forward`]. The orchestrator takes a fresh
//! one after the child is reaped and turns the first signal into an
//! interrupted run. A fresh subscription never sees signals that arrived
//! before it was taken.

#[cfg(unix)]
mod imp {
    use std::io;

    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    use tokio::signal::unix::{signal, SignalKind};
    use tracing::{debug, info, warn};

    pub struct TerminationSignals {
        interrupt: tokio::signal::unix::Signal,
        terminate: tokio::signal::unix::Signal,
        hangup: tokio::signal::unix::Signal,
        quit: tokio::signal::unix::Signal,
    }

    impl TerminationSignals {
        pub fn install() -> io::Result<Self> {
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
                hangup: signal(SignalKind::hangup())?,
                quit: signal(SignalKind::quit())?,
            })
        }

        /// Wait for the next signal and return its number.
        pub async fn recv(&mut self) -> i32 {
            let sig = tokio::select! {
                Some(()) = self.interrupt.recv() => Signal::SIGINT,
                Some(()) = self.terminate.recv() => Signal::SIGTERM,
                Some(()) = self.hangup.recv() => Signal::SIGHUP,
                Some(()) = self.quit.recv() => Signal::SIGQUIT,
                else => return std::future::pending().await,
            };
            debug!(signal = %sig, "received termination signal");
            sig as i32
        }
    }

    /// Re-send signal `signo` to process `pid`.
    pub fn forward(pid: u32, signo: i32) {
        let child = Pid::from_raw(pid as i32);
        let sig = match Signal::try_from(signo) {
            Ok(sig) => sig,
            Err(e) => {
                warn!(signo, error = %e, "not a forwardable signal");
                return;
            }
        };
        match kill(child, sig) {
            Ok(()) => info!(pid, signal = %sig, "forwarded signal to child"),
            Err(Errno::ESRCH) => debug!(pid, signal = %sig, "child already gone; signal dropped"),
            Err(e) => warn!(pid, signal = %sig, error = %e, "failed to forward signal to child"),
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use std::io;

    /// Only Ctrl-C is observable here; it already reaches the child through
    /// the console, so nothing is relayed.
    pub struct TerminationSignals;

    impl TerminationSignals {
        pub fn install() -> io::Result<Self> {
            Ok(TerminationSignals)
        }

        pub async fn recv(&mut self) -> i32 {
            match tokio::signal::ctrl_c().await {
                Ok(()) => 2,
                Err(_) => std::future::pending().await,
            }
        }
    }

    pub fn forward(_pid: u32, _signo: i32) {}
}

pub use imp::{forward, TerminationSignals};

