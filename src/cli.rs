// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::{ConflictAction, ErrorPolicy, OverwritePolicy, PreservePolicy};

/// Command-line arguments for `intemp`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "intemp",
    version,
    about = "Run a command in a temporary directory and publish its outputs only if it succeeds.",
    long_about = "Run a command in a fresh temporary directory. If the command exits \
with status 0, every file and directory it produced there is moved into the \
destination directory; otherwise nothing is published.\n\n\
The command runs with the temporary directory as its working directory, so give \
input files as absolute paths and output files as relative ones."
)]
pub struct CliArgs {
    /// Create the workspace as a new subdirectory of DIR.
    ///
    /// Default: the system temporary directory.
    #[arg(short = 't', long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Use exactly DIR as the workspace. It must not exist or be empty.
    #[arg(short = 'w', long, value_name = "DIR", conflicts_with = "temp_dir")]
    pub workspace: Option<PathBuf>,

    /// Where outputs are published on success.
    ///
    /// Default: the current working directory.
    #[arg(short = 'd', long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// When to keep the workspace after the run.
    #[arg(short = 'p', long, value_enum, value_name = "WHEN")]
    pub preserve: Option<PreservePolicy>,

    /// Always copy outputs instead of renaming them, even on one filesystem.
    #[arg(short = 'c', long)]
    pub force_copy: bool,

    /// Replace destination entries that share a name with an output.
    #[arg(short = 'o', long, conflicts_with = "overwrite_policy")]
    pub overwrite: bool,

    /// Overwrite policy (`-o` is shorthand for `allow`).
    #[arg(long, value_enum, value_name = "POLICY")]
    pub overwrite_policy: Option<OverwritePolicy>,

    /// With overwriting forbidden: abort the publish, or skip the entry.
    #[arg(long, value_enum, value_name = "ACTION")]
    pub on_conflict: Option<ConflictAction>,

    /// Stop at the first failed entry, or publish the rest anyway.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub on_error: Option<ErrorPolicy>,

    /// Path to a TOML config file with a `[defaults]` table.
    ///
    /// Falls back to `INTEMP_CONFIG` when omitted.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `INTEMP_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// The command to run, best given after `--`.
    #[arg(
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_after_separator_is_passed_through() {
        let args =
            CliArgs::try_parse_from(["intemp", "-d", "out", "--", "sh", "-c", "echo hi"]).unwrap();
        assert_eq!(args.dest, Some(PathBuf::from("out")));
        assert_eq!(args.command, vec!["sh", "-c", "echo hi"]);
    }

    #[test]
    fn command_flags_are_not_taken_as_ours() {
        let args = CliArgs::try_parse_from(["intemp", "tee", "-a", "log.txt"]).unwrap();
        assert_eq!(args.command, vec!["tee", "-a", "log.txt"]);
        assert!(!args.overwrite);
    }

    #[test]
    fn missing_command_is_rejected() {
        assert!(CliArgs::try_parse_from(["intemp", "-o"]).is_err());
    }

    #[test]
    fn workspace_and_temp_dir_conflict() {
        let res = CliArgs::try_parse_from(["intemp", "-w", "a", "-t", "b", "--", "true"]);
        assert!(res.is_err());
    }

    #[test]
    fn preserve_values_parse() {
        let args = CliArgs::try_parse_from(["intemp", "-p", "on-failure", "--", "true"]).unwrap();
        assert_eq!(args.preserve, Some(PreservePolicy::Failure));
    }
}
