// src/workspace/mod.rs

//! Workspace manager: creates, destroys and hands over the temporary
//! directory a supervised command runs in.
//!
//! A fixed workspace path is accepted when it does not exist yet (it is
//! created, parents included) or when it is an existing empty directory.
//! Anything else is reported as [`IntempError::WorkspaceOccupied`].

use std::io;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::{debug, info, warn};

use crate::errors::{IntempError, Result};
use crate::fs::FileSystem;

/// Prefix of generated workspace directory names.
pub const WORKSPACE_PREFIX: &str = "intemp.";

const SUFFIX_LEN: usize = 10;
const MAX_NAME_ATTEMPTS: usize = 64;

/// Where the workspace should live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceSpec {
    /// Use exactly this path.
    Fixed(PathBuf),
    /// Generate a uniquely named directory under this parent.
    Under(PathBuf),
}

impl WorkspaceSpec {
    /// Generate under the system temporary directory.
    pub fn system_default() -> Self {
        WorkspaceSpec::Under(std::env::temp_dir())
    }
}

/// A workspace directory owned by a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Create the workspace described by `spec`.
pub fn create(fs: &dyn FileSystem, spec: &WorkspaceSpec) -> Result<Workspace> {
    let workspace = match spec {
        WorkspaceSpec::Fixed(path) => create_fixed(fs, path)?,
        WorkspaceSpec::Under(parent) => create_unique(fs, parent)?,
    };
    info!(workspace = %workspace.path.display(), "created workspace");
    Ok(workspace)
}

fn create_fixed(fs: &dyn FileSystem, path: &Path) -> Result<Workspace> {
    if fs.exists(path) {
        let empty_dir = fs.is_dir(path)
            && fs
                .read_dir(path)
                .map_err(|source| IntempError::WorkspaceCreation {
                    path: path.to_path_buf(),
                    source,
                })?
                .is_empty();
        if !empty_dir {
            return Err(IntempError::WorkspaceOccupied(path.to_path_buf()));
        }
        debug!(workspace = %path.display(), "reusing existing empty directory");
        return Ok(Workspace {
            path: path.to_path_buf(),
        });
    }

    fs.create_dir_all(path)
        .map_err(|source| IntempError::WorkspaceCreation {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Workspace {
        path: path.to_path_buf(),
    })
}

fn create_unique(fs: &dyn FileSystem, parent: &Path) -> Result<Workspace> {
    let path = create_unique_dir(fs, parent, WORKSPACE_PREFIX).map_err(|source| {
        IntempError::WorkspaceCreation {
            path: parent.to_path_buf(),
            source,
        }
    })?;
    Ok(Workspace { path })
}

/// Create a new directory named `{prefix}{random suffix}` under `parent`.
///
/// The directory is created exclusively: a name that is already taken is
/// never reused, another suffix is drawn instead.
pub fn create_unique_dir(fs: &dyn FileSystem, parent: &Path, prefix: &str) -> io::Result<PathBuf> {
    let mut rng = rand::thread_rng();
    for _ in 0..MAX_NAME_ATTEMPTS {
        let suffix: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(char::from)
            .collect();
        let candidate = parent.join(format!("{prefix}{suffix}"));

        match fs.create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(candidate = %candidate.display(), "name taken; retrying");
            }
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free {prefix}* name under {}", parent.display()),
    ))
}

/// Recursively delete the workspace. A workspace that is already gone is
/// not an error.
pub fn destroy(fs: &dyn FileSystem, workspace: &Workspace) -> Result<()> {
    match fs.remove_dir_all(&workspace.path) {
        Ok(()) => {
            debug!(workspace = %workspace.path.display(), "removed workspace");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(workspace = %workspace.path.display(), "workspace already removed");
            Ok(())
        }
        Err(source) => Err(IntempError::io(
            format!("removing workspace {}", workspace.path.display()),
            source,
        )),
    }
}

/// Give up ownership of the workspace; deleting it is now the caller's job.
pub fn preserve(workspace: Workspace) -> PathBuf {
    workspace.path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn generated_workspace_is_created_under_parent() {
        let fs = MockFileSystem::new();
        fs.add_dir("/tmp");

        let ws = create(&fs, &WorkspaceSpec::Under(PathBuf::from("/tmp"))).unwrap();

        assert_eq!(ws.path().parent(), Some(Path::new("/tmp")));
        let name = ws.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(WORKSPACE_PREFIX));
        assert_eq!(name.len(), WORKSPACE_PREFIX.len() + SUFFIX_LEN);
        assert!(fs.is_dir(ws.path()));
    }

    #[test]
    fn two_generated_workspaces_do_not_collide() {
        let fs = MockFileSystem::new();
        fs.add_dir("/tmp");
        let spec = WorkspaceSpec::Under(PathBuf::from("/tmp"));

        let a = create(&fs, &spec).unwrap();
        let b = create(&fs, &spec).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn missing_parent_is_a_creation_failure() {
        let fs = MockFileSystem::new();
        let err = create(&fs, &WorkspaceSpec::Under(PathBuf::from("/missing"))).unwrap_err();
        assert!(matches!(err, IntempError::WorkspaceCreation { .. }));
    }

    #[test]
    fn fixed_path_is_created_with_parents() {
        let fs = MockFileSystem::new();
        let ws = create(&fs, &WorkspaceSpec::Fixed(PathBuf::from("/a/b/ws"))).unwrap();
        assert_eq!(ws.path(), Path::new("/a/b/ws"));
        assert!(fs.is_dir(Path::new("/a/b/ws")));
    }

    #[test]
    fn fixed_path_may_be_an_existing_empty_dir() {
        let fs = MockFileSystem::new();
        fs.add_dir("/ws");
        assert!(create(&fs, &WorkspaceSpec::Fixed(PathBuf::from("/ws"))).is_ok());
    }

    #[test]
    fn occupied_fixed_path_is_rejected() {
        let fs = MockFileSystem::new();
        fs.add_file("/ws/leftover.txt", b"x".to_vec());
        fs.add_file("/file", b"x".to_vec());

        let err = create(&fs, &WorkspaceSpec::Fixed(PathBuf::from("/ws"))).unwrap_err();
        assert!(matches!(err, IntempError::WorkspaceOccupied(_)));
        let err = create(&fs, &WorkspaceSpec::Fixed(PathBuf::from("/file"))).unwrap_err();
        assert!(matches!(err, IntempError::WorkspaceOccupied(_)));
    }

    #[test]
    fn destroy_is_idempotent() {
        let fs = MockFileSystem::new();
        fs.add_dir("/tmp");
        let ws = create(&fs, &WorkspaceSpec::Under(PathBuf::from("/tmp"))).unwrap();
        fs.add_file(ws.path().join("out.txt"), b"x".to_vec());

        destroy(&fs, &ws).unwrap();
        assert!(!fs.exists(ws.path()));
        destroy(&fs, &ws).unwrap();
    }

    #[test]
    fn preserve_returns_the_path_untouched() {
        let fs = MockFileSystem::new();
        let ws = create(&fs, &WorkspaceSpec::Fixed(PathBuf::from("/keep"))).unwrap();
        assert_eq!(preserve(ws), PathBuf::from("/keep"));
        assert!(fs.is_dir(Path::new("/keep")));
    }
}
