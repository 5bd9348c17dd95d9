// src/publish/mod.rs

//! Publisher: moves the top-level entries of a finished workspace into the
//! destination directory.
//!
//! Order of operations:
//! 1. Create the destination if needed.
//! 2. Check every entry name for a conflict *before* transferring anything,
//!    so a forbidden overwrite aborts with the destination untouched.
//! 3. Transfer each entry with the [`TransferMode`] chosen for it.
//!
//! Copies are written into a freshly created, randomly named staging
//! directory inside the destination and renamed into place, so a reader
//! never sees a half-copied entry under its final name. Replacing an existing directory still leaves a short window in
//! which the target is absent.

pub mod copy;
pub mod plan;

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::errors::{IntempError, Result};
use crate::fs::{EntryKind, FileSystem};
use crate::types::{ConflictAction, ErrorPolicy, OverwritePolicy};
use crate::workspace::create_unique_dir;

pub use plan::TransferMode;

/// Publisher knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOptions {
    pub overwrite: OverwritePolicy,
    /// Applies only when overwriting is forbidden.
    pub on_conflict: ConflictAction,
    pub on_error: ErrorPolicy,
    /// Copy even when a rename would work.
    pub force_copy: bool,
    /// Leave the workspace entries in place (copy instead of move).
    pub keep_sources: bool,
}

/// One successfully transferred entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub name: String,
    pub target: PathBuf,
    pub mode: TransferMode,
}

/// What a publish did, entry by entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub transferred: Vec<TransferRecord>,
    /// Entries left in the workspace because their name was taken.
    pub skipped: Vec<String>,
    /// Entries whose transfer failed (only filled with `ErrorPolicy::Continue`).
    pub failed: Vec<String>,
}

impl PublishReport {
    pub fn transferred_names(&self) -> Vec<&str> {
        self.transferred.iter().map(|r| r.name.as_str()).collect()
    }
}

struct Entry {
    name: OsString,
    source: PathBuf,
    target: PathBuf,
    target_exists: bool,
}

impl Entry {
    fn display_name(&self) -> String {
        self.name.to_string_lossy().into_owned()
    }
}

/// Transfer every top-level entry of `workspace_dir` into `destination_dir`.
pub fn publish(
    fs: &dyn FileSystem,
    workspace_dir: &Path,
    destination_dir: &Path,
    options: &PublishOptions,
) -> Result<PublishReport> {
    fs.create_dir_all(destination_dir).map_err(|source| {
        IntempError::io(
            format!("creating destination {}", destination_dir.display()),
            source,
        )
    })?;

    let entries = collect_entries(fs, workspace_dir, destination_dir)?;
    let mut report = PublishReport::default();

    let mut pending = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.target_exists && options.overwrite == OverwritePolicy::Forbid {
            match options.on_conflict {
                ConflictAction::Abort => {
                    return Err(IntempError::DestinationConflict {
                        name: entry.display_name(),
                        target: entry.target,
                    });
                }
                ConflictAction::Skip => {
                    warn!(
                        entry = %entry.display_name(),
                        target = %entry.target.display(),
                        "destination entry exists; skipping"
                    );
                    report.skipped.push(entry.display_name());
                    continue;
                }
            }
        }
        pending.push(entry);
    }

    let same_fs = plan::same_filesystem(fs, workspace_dir, destination_dir)?;

    for entry in pending {
        let mode = TransferMode::choose(same_fs, options);
        match transfer(fs, &entry, mode, options.overwrite) {
            Ok(mode) => {
                info!(
                    entry = %entry.display_name(),
                    destination = %destination_dir.display(),
                    ?mode,
                    "published entry"
                );
                report.transferred.push(TransferRecord {
                    name: entry.display_name(),
                    target: entry.target,
                    mode,
                });
            }
            Err(err) => match options.on_error {
                ErrorPolicy::Abort => return Err(err),
                ErrorPolicy::Continue => {
                    error!(entry = %entry.display_name(), error = %err, "failed to publish entry");
                    report.failed.push(entry.display_name());
                }
            },
        }
    }

    if !report.failed.is_empty() {
        return Err(IntempError::IncompletePublish {
            failed: report.failed,
        });
    }
    Ok(report)
}

fn collect_entries(
    fs: &dyn FileSystem,
    workspace_dir: &Path,
    destination_dir: &Path,
) -> Result<Vec<Entry>> {
    let sources = fs.read_dir(workspace_dir).map_err(|source| {
        IntempError::io(format!("listing workspace {}", workspace_dir.display()), source)
    })?;

    let mut entries = Vec::with_capacity(sources.len());
    for source in sources {
        let Some(name) = source.file_name().map(|n| n.to_os_string()) else {
            continue;
        };
        let target = destination_dir.join(&name);
        let target_exists = fs.exists(&target);
        entries.push(Entry {
            name,
            source,
            target,
            target_exists,
        });
    }
    Ok(entries)
}

fn transfer(
    fs: &dyn FileSystem,
    entry: &Entry,
    mode: TransferMode,
    overwrite: OverwritePolicy,
) -> Result<TransferMode> {
    // Something may have appeared since the pre-flight check.
    if overwrite == OverwritePolicy::Forbid && fs.exists(&entry.target) {
        return Err(IntempError::DestinationConflict {
            name: entry.display_name(),
            target: entry.target.clone(),
        });
    }

    match mode {
        TransferMode::Rename => match rename_into_place(fs, &entry.source, &entry.target) {
            Ok(()) => Ok(TransferMode::Rename),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                warn!(
                    entry = %entry.display_name(),
                    "rename crosses filesystems; falling back to copy"
                );
                copy_into_place(fs, entry, TransferMode::CopyThenDelete)
            }
            Err(source) => Err(IntempError::io(
                format!(
                    "renaming {} to {}",
                    entry.source.display(),
                    entry.target.display()
                ),
                source,
            )),
        },
        TransferMode::CopyThenDelete | TransferMode::Copy => copy_into_place(fs, entry, mode),
    }
}

/// Rename `from` to `to`, replacing whatever is at `to`.
///
/// Non-directories are replaced atomically by `rename(2)`. A directory on
/// either side has to be cleared out of the way first.
fn rename_into_place(fs: &dyn FileSystem, from: &Path, to: &Path) -> io::Result<()> {
    let source_is_dir = fs.entry_kind(from)? == Some(EntryKind::Dir);
    let target_kind = fs.entry_kind(to)?;
    if target_kind == Some(EntryKind::Dir) || (source_is_dir && target_kind.is_some()) {
        debug!(target = %to.display(), "removing existing entry before rename");
        copy::remove_entry(fs, to)?;
    }
    fs.rename(from, to)
}

/// Prefix of the private directory a copy is staged in.
const STAGING_PREFIX: &str = ".intemp-stage.";

fn copy_into_place(
    fs: &dyn FileSystem,
    entry: &Entry,
    mode: TransferMode,
) -> Result<TransferMode> {
    let destination_dir = entry.target.parent().unwrap_or_else(|| Path::new("."));
    let stage_dir = create_unique_dir(fs, destination_dir, STAGING_PREFIX).map_err(|source| {
        IntempError::io(
            format!("creating staging directory in {}", destination_dir.display()),
            source,
        )
    })?;

    let staged = stage_dir.join(&entry.name);
    let placed = copy::copy_entry(fs, &entry.source, &staged)
        .map_err(|source| {
            IntempError::io(
                format!("copying {} to {}", entry.source.display(), staged.display()),
                source,
            )
        })
        .and_then(|()| {
            rename_into_place(fs, &staged, &entry.target).map_err(|source| {
                IntempError::io(format!("moving copy into {}", entry.target.display()), source)
            })
        });

    // Only ever removes the directory created above.
    if let Err(e) = fs.remove_dir_all(&stage_dir) {
        warn!(staging = %stage_dir.display(), error = %e, "failed to remove staging directory");
    }
    placed?;

    if mode.removes_source() {
        copy::remove_entry(fs, &entry.source).map_err(|source| {
            IntempError::io(
                format!("removing published source {}", entry.source.display()),
                source,
            )
        })?;
    }
    Ok(mode)
}
