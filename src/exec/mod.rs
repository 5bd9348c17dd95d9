// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] defines the `ProcessRunner` trait the orchestrator talks to,
//!   plus the command and status types that cross it. Tests swap in a fake.
//! - [`supervisor`] is the production runner built on
//!   `tokio::process::Command`.
//! - [`signals`] subscribes to termination signals for a bounded scope: the
//!   supervisor relays them to the live child, the orchestrator uses them to
//!   stop publishing or cleanup.

pub mod backend;
pub mod signals;
pub mod supervisor;

pub use backend::{ChildStatus, CommandSpec, ProcessRunner, StdioBindings, StreamBinding};
pub use signals::TerminationSignals;
pub use supervisor::Supervisor;
