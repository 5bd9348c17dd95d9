// src/config/settings.rs

//! Effective settings for one run: CLI flags layered over the config file
//! layered over built-in defaults.

use std::path::{Path, PathBuf};

use crate::cli::CliArgs;
use crate::config::model::ConfigFile;
use crate::errors::{IntempError, Result};
use crate::exec::CommandSpec;
use crate::publish::PublishOptions;
use crate::types::{ConflictAction, ErrorPolicy, OverwritePolicy, PreservePolicy};
use crate::workspace::WorkspaceSpec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub command: CommandSpec,
    pub workspace: WorkspaceSpec,
    /// Absolute destination directory.
    pub destination: PathBuf,
    pub preserve: PreservePolicy,
    pub overwrite: OverwritePolicy,
    pub on_conflict: ConflictAction,
    pub on_error: ErrorPolicy,
    pub force_copy: bool,
}

impl RunSettings {
    /// Defaults for `command`: generated workspace under the system temp
    /// directory, publishing into `destination`.
    pub fn new(command: CommandSpec, destination: PathBuf) -> Self {
        Self {
            command,
            workspace: WorkspaceSpec::system_default(),
            destination,
            preserve: PreservePolicy::default(),
            overwrite: OverwritePolicy::default(),
            on_conflict: ConflictAction::default(),
            on_error: ErrorPolicy::default(),
            force_copy: false,
        }
    }

    /// Merge CLI arguments over an optional config file. Relative CLI paths
    /// are resolved against `cwd`, the invocation directory.
    pub fn resolve(args: &CliArgs, file: Option<&ConfigFile>, cwd: &Path) -> Result<Self> {
        let file = file.cloned().unwrap_or_default();

        let command = CommandSpec::from_argv(&args.command)
            .ok_or_else(|| IntempError::ConfigError("no command given".to_string()))?;

        let workspace = match (&args.workspace, &args.temp_dir) {
            (Some(_), Some(_)) => {
                return Err(IntempError::ConfigError(
                    "--workspace and --temp-dir are mutually exclusive".to_string(),
                ));
            }
            (Some(fixed), None) => WorkspaceSpec::Fixed(absolute(cwd, fixed)),
            (None, Some(parent)) => WorkspaceSpec::Under(absolute(cwd, parent)),
            (None, None) => match file.temp_dir {
                Some(parent) => WorkspaceSpec::Under(absolute(cwd, &parent)),
                None => WorkspaceSpec::system_default(),
            },
        };

        let destination = match (&args.dest, &file.dest) {
            (Some(d), _) => absolute(cwd, d),
            (None, Some(d)) => absolute(cwd, d),
            (None, None) => cwd.to_path_buf(),
        };

        let overwrite = if args.overwrite {
            OverwritePolicy::Allow
        } else {
            args.overwrite_policy
                .or(file.overwrite)
                .unwrap_or_default()
        };

        Ok(Self {
            command,
            workspace,
            destination,
            preserve: args.preserve.or(file.preserve).unwrap_or_default(),
            overwrite,
            on_conflict: args.on_conflict.or(file.on_conflict).unwrap_or_default(),
            on_error: args.on_error.or(file.on_error).unwrap_or_default(),
            force_copy: args.force_copy || file.force_copy.unwrap_or(false),
        })
    }

    pub fn publish_options(&self) -> PublishOptions {
        PublishOptions {
            overwrite: self.overwrite,
            on_conflict: self.on_conflict,
            on_error: self.on_error,
            force_copy: self.force_copy,
            keep_sources: self.preserve == PreservePolicy::Always,
        }
    }
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
