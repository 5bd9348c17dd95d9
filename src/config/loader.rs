// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{IntempError, Result};

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV: &str = "INTEMP_CONFIG";

/// Load a configuration file and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] for
/// path resolution and sanity checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        IntempError::ConfigError(format!("reading config {}: {e}", path.display()))
    })?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let config = ConfigFile::from_raw(raw_config, &config_root_dir(path))?;
    debug!(path = %path.display(), ?config, "loaded config file");
    Ok(config)
}

/// Which config file to use: the explicit one, else `$INTEMP_CONFIG`, else
/// none at all.
pub fn discover(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(|| {
        std::env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    })
}

/// Directory containing the config file, or `.`.
fn config_root_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OverwritePolicy;
    use std::io::Write;

    #[test]
    fn loads_and_anchors_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[defaults]\ndest = \"out\"\noverwrite = \"allow\"\n").unwrap();

        let cfg = load_and_validate(file.path()).unwrap();
        let parent = file.path().parent().unwrap();
        assert_eq!(cfg.dest, Some(parent.join("out")));
        assert_eq!(cfg.overwrite, Some(OverwritePolicy::Allow));
    }

    #[test]
    fn bad_toml_is_a_toml_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[defaults\n").unwrap();
        assert!(matches!(
            load_and_validate(file.path()),
            Err(IntempError::TomlError(_))
        ));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = load_and_validate("/definitely/not/here.toml").unwrap_err();
        assert_eq!(err.phase(), "config");
    }

    #[test]
    fn explicit_path_wins_discovery() {
        assert_eq!(
            discover(Some(Path::new("/etc/intemp.toml"))),
            Some(PathBuf::from("/etc/intemp.toml"))
        );
    }
}
