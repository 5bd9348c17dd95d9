// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod publish;
pub mod types;
pub mod workspace;

use std::sync::Arc;

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::{discover, load_and_validate, RunSettings};
use crate::engine::{Orchestrator, RunOutcome};
use crate::errors::{IntempError, Result};
use crate::exec::Supervisor;
use crate::fs::RealFileSystem;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config file discovery and merging with CLI flags
/// - the real filesystem and process supervisor
/// - the orchestrator that runs, publishes and cleans up
pub async fn run(args: CliArgs) -> Result<RunOutcome> {
    let cwd = std::env::current_dir()
        .map_err(|e| IntempError::ConfigError(format!("cannot determine current directory: {e}")))?;

    let file = match discover(args.config.as_deref()) {
        Some(path) => Some(load_and_validate(&path)?),
        None => None,
    };

    let settings = RunSettings::resolve(&args, file.as_ref(), &cwd)?;
    debug!(?settings, "resolved run settings");

    let orchestrator = Orchestrator::new(
        Arc::new(RealFileSystem),
        Arc::new(Supervisor::new()),
        settings,
    );
    orchestrator.run().await
}
