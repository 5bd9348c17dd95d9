use std::fmt;

use clap::ValueEnum;
use serde::Deserialize;

/// When to keep the workspace around after a run.
///
/// - `Never`: always delete it (default). Publish failures still keep it.
/// - `Failure`: keep it when the child or the publish failed.
/// - `Always`: keep it regardless; outputs are copied rather than moved so
///   the preserved workspace still holds them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PreservePolicy {
    Never,
    #[value(alias = "on-failure")]
    #[serde(alias = "on-failure")]
    Failure,
    Always,
}

impl Default for PreservePolicy {
    fn default() -> Self {
        PreservePolicy::Never
    }
}

impl fmt::Display for PreservePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PreservePolicy::Never => "never",
            PreservePolicy::Failure => "failure",
            PreservePolicy::Always => "always",
        };
        f.write_str(s)
    }
}

/// Whether a published entry may replace an existing destination entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    Forbid,
    Allow,
}

impl Default for OverwritePolicy {
    fn default() -> Self {
        OverwritePolicy::Forbid
    }
}

/// What to do with a conflicting entry when overwriting is forbidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConflictAction {
    /// Fail the whole publish before anything is transferred.
    Abort,
    /// Leave the conflicting entry in the workspace and publish the rest.
    Skip,
}

impl Default for ConflictAction {
    fn default() -> Self {
        ConflictAction::Abort
    }
}

/// What to do when transferring one entry fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    Abort,
    Continue,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        ErrorPolicy::Abort
    }
}
