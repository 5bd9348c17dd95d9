// src/logging.rs

//! Diagnostics go to stderr through `tracing`, so the supervised command
//! keeps stdout to itself.
//!
//! `--log-level` sets one global level. Without it, `INTEMP_LOG` is read as
//! a full `EnvFilter` directive list (for example
//! `intemp::publish=debug,warn`), falling back to `info`.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "INTEMP_LOG";

const DEFAULT_DIRECTIVES: &str = "info";

pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();

    fmt()
        .with_env_filter(build_filter(cli_level, env.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("initialising logging: {e}"))?;

    Ok(())
}

/// The CLI flag wins; malformed env directives fall back to the default.
fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(directive(level));
    }
    env.filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

fn directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
