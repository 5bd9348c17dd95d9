// src/publish/plan.rs

//! Per-entry choice between renaming and copying.

use std::path::Path;

use tracing::debug;

use crate::errors::{IntempError, Result};
use crate::fs::FileSystem;
use crate::publish::PublishOptions;

/// How one workspace entry reaches the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Single `rename(2)`; atomic for observers of the destination.
    Rename,
    /// Recursive copy into the destination, then removal of the source.
    CopyThenDelete,
    /// Recursive copy; the source stays in the workspace.
    Copy,
}

impl TransferMode {
    /// Pick the mode for an entry.
    ///
    /// `same_filesystem` is `None` when the platform cannot tell; renaming is
    /// attempted then and falls back to copying on a cross-device error.
    pub fn choose(same_filesystem: Option<bool>, options: &PublishOptions) -> Self {
        if options.keep_sources {
            TransferMode::Copy
        } else if options.force_copy || same_filesystem == Some(false) {
            TransferMode::CopyThenDelete
        } else {
            TransferMode::Rename
        }
    }

    pub fn removes_source(&self) -> bool {
        !matches!(self, TransferMode::Copy)
    }
}

/// Whether `a` and `b` live on the same filesystem.
pub fn same_filesystem(fs: &dyn FileSystem, a: &Path, b: &Path) -> Result<Option<bool>> {
    let dev = |p: &Path| {
        fs.device_id(p)
            .map_err(|source| IntempError::io(format!("inspecting {}", p.display()), source))
    };
    let same = match (dev(a)?, dev(b)?) {
        (Some(x), Some(y)) => Some(x == y),
        _ => None,
    };
    debug!(
        workspace = %a.display(),
        destination = %b.display(),
        ?same,
        "compared filesystems"
    );
    Ok(same)
}
