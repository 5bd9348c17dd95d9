// src/publish/copy.rs

//! Recursive copy and removal of a single entry. Symlinks are recreated, not
//! followed.

use std::io;
use std::path::Path;

use crate::fs::{EntryKind, FileSystem};

pub fn copy_entry(fs: &dyn FileSystem, from: &Path, to: &Path) -> io::Result<()> {
    let kind = fs.entry_kind(from)?.ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, format!("{from:?} vanished"))
    })?;

    match kind {
        EntryKind::File => fs.copy_file(from, to),
        EntryKind::Symlink => {
            let target = fs.read_link(from)?;
            fs.symlink(&target, to)
        }
        EntryKind::Dir => {
            fs.create_dir(to)?;
            for child in fs.read_dir(from)? {
                if let Some(name) = child.file_name() {
                    copy_entry(fs, &child, &to.join(name))?;
                }
            }
            Ok(())
        }
    }
}

/// Remove a file, symlink or whole directory tree.
pub fn remove_entry(fs: &dyn FileSystem, path: &Path) -> io::Result<()> {
    match fs.entry_kind(path)? {
        Some(EntryKind::Dir) => fs.remove_dir_all(path),
        Some(_) => fs.remove_file(path),
        None => Ok(()),
    }
}
