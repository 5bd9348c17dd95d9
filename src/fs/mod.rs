// src/fs/mod.rs

//! Filesystem abstraction used by the workspace manager and the publisher.
//!
//! Methods return plain `std::io::Result` because callers branch on the
//! error kind (`AlreadyExists` while generating workspace names,
//! `CrossesDevices` when a rename cannot stay on one filesystem).

use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub mod mock;

/// Kind of a directory entry, as seen without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
}

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    /// Kind of the entry at `path`, or `None` if nothing is there.
    /// Dangling symlinks count as present.
    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>>;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    fn create_dir(&self, path: &Path) -> io::Result<()>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Identifier of the filesystem holding `path`, if the platform exposes one.
    fn device_id(&self, path: &Path) -> io::Result<Option<u64>>;

    fn exists(&self, path: &Path) -> bool {
        matches!(self.entry_kind(path), Ok(Some(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entry_kind(path), Ok(Some(EntryKind::Dir)))
    }
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        match fs::symlink_metadata(path) {
            Ok(meta) => {
                let ft = meta.file_type();
                let kind = if ft.is_symlink() {
                    EntryKind::Symlink
                } else if ft.is_dir() {
                    EntryKind::Dir
                } else {
                    EntryKind::File
                };
                Ok(Some(kind))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            entries.push(entry.path());
        }
        entries.sort();
        Ok(entries)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    #[cfg(unix)]
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(not(unix))]
    fn symlink(&self, _target: &Path, link: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("cannot recreate symlink {link:?} on this platform"),
        ))
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    #[cfg(unix)]
    fn device_id(&self, path: &Path) -> io::Result<Option<u64>> {
        use std::os::unix::fs::MetadataExt;
        Ok(Some(fs::metadata(path)?.dev()))
    }

    #[cfg(not(unix))]
    fn device_id(&self, path: &Path) -> io::Result<Option<u64>> {
        fs::metadata(path)?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_fs_reports_entry_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"a").unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        let fs = RealFileSystem;
        assert_eq!(fs.entry_kind(&file).unwrap(), Some(EntryKind::File));
        assert_eq!(fs.entry_kind(&sub).unwrap(), Some(EntryKind::Dir));
        assert_eq!(fs.entry_kind(&dir.path().join("missing")).unwrap(), None);
        assert_eq!(fs.read_dir(dir.path()).unwrap(), vec![file, sub]);
    }

    #[cfg(unix)]
    #[test]
    fn real_fs_sees_dangling_symlink_as_present() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("dangling");
        std::os::unix::fs::symlink(dir.path().join("nowhere"), &link).unwrap();

        let fs = RealFileSystem;
        assert!(fs.exists(&link));
        assert_eq!(fs.entry_kind(&link).unwrap(), Some(EntryKind::Symlink));
    }

    #[cfg(unix)]
    #[test]
    fn same_directory_has_same_device() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        let fs = RealFileSystem;
        assert_eq!(
            fs.device_id(dir.path()).unwrap(),
            fs.device_id(&sub).unwrap()
        );
    }
}
