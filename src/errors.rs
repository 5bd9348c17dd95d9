// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Every failure carries enough context to tell which phase of a run broke:
//! workspace setup, spawning the child, or publishing its outputs.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntempError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("failed to create workspace {path:?}: {source}")]
    WorkspaceCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("workspace path {0:?} already exists and is not an empty directory")]
    WorkspaceOccupied(PathBuf),

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("destination entry {target:?} already exists (from workspace entry '{name}')")]
    DestinationConflict { name: String, target: PathBuf },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("publish incomplete; failed entries: {}", .failed.join(", "))]
    IncompletePublish { failed: Vec<String> },

    #[error("interrupted by signal {signal}; workspace left at {workspace:?}")]
    Interrupted { signal: i32, workspace: PathBuf },

    #[error("invalid run transition from {from} on {event}")]
    InvalidTransition {
        from: &'static str,
        event: &'static str,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntempError {
    /// Build an [`IntempError::Io`] with a human readable context line.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        IntempError::Io {
            context: context.into(),
            source,
        }
    }

    /// Short name of the phase that failed, used in diagnostics.
    pub fn phase(&self) -> &'static str {
        match self {
            IntempError::ConfigError(_) | IntempError::TomlError(_) => "config",
            IntempError::WorkspaceCreation { .. } | IntempError::WorkspaceOccupied(_) => {
                "workspace"
            }
            IntempError::Spawn { .. } => "spawn",
            IntempError::DestinationConflict { .. }
            | IntempError::Io { .. }
            | IntempError::IncompletePublish { .. } => "publish",
            IntempError::Interrupted { .. } => "interrupted",
            IntempError::InvalidTransition { .. } | IntempError::Other(_) => "internal",
        }
    }

    /// True for errors raised by the publisher after a successful child run.
    pub fn is_publish_failure(&self) -> bool {
        self.phase() == "publish"
    }
}

pub type Result<T> = std::result::Result<T, IntempError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_reported_per_variant() {
        let occupied = IntempError::WorkspaceOccupied(PathBuf::from("/tmp/x"));
        assert_eq!(occupied.phase(), "workspace");

        let spawn = IntempError::Spawn {
            program: "nope".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(spawn.phase(), "spawn");
        assert!(!spawn.is_publish_failure());

        let conflict = IntempError::DestinationConflict {
            name: "out.txt".into(),
            target: PathBuf::from("/dest/out.txt"),
        };
        assert!(conflict.is_publish_failure());
        assert!(conflict.to_string().contains("out.txt"));

        let interrupted = IntempError::Interrupted {
            signal: 15,
            workspace: PathBuf::from("/tmp/intemp.ws"),
        };
        assert_eq!(interrupted.phase(), "interrupted");
        assert!(!interrupted.is_publish_failure());
    }
}
