// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::IntempError;
use crate::types::{ConflictAction, ErrorPolicy, OverwritePolicy, PreservePolicy};

/// Configuration file as read from TOML.
///
/// ```toml
/// [defaults]
/// temp_dir = "/scratch/jobs"
/// dest = "results"
/// preserve = "failure"
/// overwrite = "forbid"
/// on_conflict = "abort"
/// on_error = "abort"
/// force_copy = false
/// ```
///
/// Every key is optional; command-line flags win over the file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub defaults: DefaultsSection,
}

/// `[defaults]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsSection {
    /// Parent directory for generated workspaces.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// Where outputs are published.
    #[serde(default)]
    pub dest: Option<PathBuf>,

    #[serde(default)]
    pub preserve: Option<PreservePolicy>,

    #[serde(default)]
    pub overwrite: Option<OverwritePolicy>,

    #[serde(default)]
    pub on_conflict: Option<ConflictAction>,

    #[serde(default)]
    pub on_error: Option<ErrorPolicy>,

    #[serde(default)]
    pub force_copy: Option<bool>,
}

/// Validated configuration. Relative paths have been resolved against the
/// directory holding the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub temp_dir: Option<PathBuf>,
    pub dest: Option<PathBuf>,
    pub preserve: Option<PreservePolicy>,
    pub overwrite: Option<OverwritePolicy>,
    pub on_conflict: Option<ConflictAction>,
    pub on_error: Option<ErrorPolicy>,
    pub force_copy: Option<bool>,
}

impl ConfigFile {
    /// Validate `raw`, anchoring relative paths at `base_dir`.
    pub fn from_raw(raw: RawConfigFile, base_dir: &Path) -> Result<Self, IntempError> {
        let d = raw.defaults;
        Ok(Self {
            temp_dir: anchor("temp_dir", d.temp_dir, base_dir)?,
            dest: anchor("dest", d.dest, base_dir)?,
            preserve: d.preserve,
            overwrite: d.overwrite,
            on_conflict: d.on_conflict,
            on_error: d.on_error,
            force_copy: d.force_copy,
        })
    }
}

fn anchor(key: &str, path: Option<PathBuf>, base_dir: &Path) -> Result<Option<PathBuf>, IntempError> {
    match path {
        None => Ok(None),
        Some(p) if p.as_os_str().is_empty() => Err(IntempError::ConfigError(format!(
            "defaults.{key} must not be empty"
        ))),
        Some(p) if p.is_absolute() => Ok(Some(p)),
        Some(p) => Ok(Some(base_dir.join(p))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_are_anchored_at_config_dir() {
        let raw: RawConfigFile = toml::from_str(
            r#"
[defaults]
temp_dir = "/scratch"
dest = "results"
preserve = "on-failure"
"#,
        )
        .unwrap();

        let cfg = ConfigFile::from_raw(raw, Path::new("/jobs/a")).unwrap();
        assert_eq!(cfg.temp_dir, Some(PathBuf::from("/scratch")));
        assert_eq!(cfg.dest, Some(PathBuf::from("/jobs/a/results")));
        assert_eq!(cfg.preserve, Some(PreservePolicy::Failure));
    }

    #[test]
    fn empty_path_is_rejected() {
        let raw: RawConfigFile = toml::from_str("[defaults]\ndest = \"\"\n").unwrap();
        let err = ConfigFile::from_raw(raw, Path::new("/")).unwrap_err();
        assert!(matches!(err, IntempError::ConfigError(msg) if msg.contains("dest")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let res: Result<RawConfigFile, _> = toml::from_str("[defaults]\ndestination = \"x\"\n");
        assert!(res.is_err());
    }
}
