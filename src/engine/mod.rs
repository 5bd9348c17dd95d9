// src/engine/mod.rs

//! Orchestration engine for intemp.
//!
//! A run goes `Init → WorkspaceCreated → ChildRunning → (Publishing) →
//! Committed | Failed → Cleaned | Preserved`. The pure state machine and the
//! cleanup decision live in [`core`]; the async/IO shell that creates the
//! workspace, runs the child and publishes is implemented in [`runtime`].

pub mod core;
pub mod runtime;

pub use core::{
    cleanup_action, CleanupAction, FailureCause, RunCommand, RunEvent, RunMachine, RunState,
    Verdict,
};
pub use runtime::{
    exit_code_for_error, Orchestrator, RunOutcome, EXIT_CANNOT_EXECUTE, EXIT_INTERNAL,
    EXIT_NOT_FOUND,
};
