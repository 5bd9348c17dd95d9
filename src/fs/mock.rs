// src/fs/mock.rs

//! In-memory filesystem with simulated mount points.
//!
//! Every path lives on the device of its longest mounted prefix, and renames
//! between devices fail with `CrossesDevices` just like `rename(2)` does.
//! Paths are expected to be absolute.

use super::{EntryKind, FileSystem};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
    Symlink(PathBuf),
}

impl MockEntry {
    fn kind(&self) -> EntryKind {
        match self {
            MockEntry::File(_) => EntryKind::File,
            MockEntry::Dir => EntryKind::Dir,
            MockEntry::Symlink(_) => EntryKind::Symlink,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<PathBuf, MockEntry>,
    mounts: Vec<(PathBuf, u64)>,
    failing: HashSet<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct MockFileSystem {
    state: Arc<Mutex<State>>,
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{path:?} does not exist"))
}

impl MockFileSystem {
    /// Empty filesystem containing only `/`, which lives on device 1.
    pub fn new() -> Self {
        let mut state = State::default();
        state.entries.insert(PathBuf::from("/"), MockEntry::Dir);
        state.mounts.push((PathBuf::from("/"), 1));
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock only happens inside a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create `path` as a directory living on its own device.
    pub fn mount(&self, path: impl AsRef<Path>, device: u64) {
        let path = path.as_ref();
        self.add_dir(path);
        self.lock().mounts.push((path.to_path_buf(), device));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.lock();
        ensure_dirs(&mut state, path.as_ref());
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        let mut state = self.lock();
        if let Some(parent) = path.parent() {
            ensure_dirs(&mut state, parent);
        }
        state
            .entries
            .insert(path.to_path_buf(), MockEntry::File(content.into()));
    }

    pub fn add_symlink(&self, link: impl AsRef<Path>, target: impl AsRef<Path>) {
        let link = link.as_ref();
        let mut state = self.lock();
        if let Some(parent) = link.parent() {
            ensure_dirs(&mut state, parent);
        }
        state.entries.insert(
            link.to_path_buf(),
            MockEntry::Symlink(target.as_ref().to_path_buf()),
        );
    }

    /// Make every rename or copy whose source is `path` fail.
    pub fn fail_transfers_from(&self, path: impl AsRef<Path>) {
        self.lock().failing.insert(path.as_ref().to_path_buf());
    }

    pub fn read_file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().entries.get(path.as_ref()) {
            Some(MockEntry::File(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    pub fn entry(&self, path: impl AsRef<Path>) -> Option<MockEntry> {
        self.lock().entries.get(path.as_ref()).cloned()
    }

    /// Sorted names of the direct children of `dir`.
    pub fn child_names(&self, dir: impl AsRef<Path>) -> Vec<String> {
        let state = self.lock();
        children_of(&state, dir.as_ref())
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect()
    }
}

fn ensure_dirs(state: &mut State, path: &Path) {
    for ancestor in path.ancestors().collect::<Vec<_>>().into_iter().rev() {
        if ancestor.as_os_str().is_empty() {
            continue;
        }
        state
            .entries
            .entry(ancestor.to_path_buf())
            .or_insert(MockEntry::Dir);
    }
}

fn children_of(state: &State, dir: &Path) -> Vec<PathBuf> {
    state
        .entries
        .keys()
        .filter(|p| p.parent() == Some(dir))
        .cloned()
        .collect()
}

fn subtree_of(state: &State, root: &Path) -> Vec<PathBuf> {
    state
        .entries
        .keys()
        .filter(|p| p.starts_with(root))
        .cloned()
        .collect()
}

fn device_of(state: &State, path: &Path) -> u64 {
    state
        .mounts
        .iter()
        .filter(|(mount, _)| path.starts_with(mount))
        .max_by_key(|(mount, _)| mount.components().count())
        .map(|(_, dev)| *dev)
        .unwrap_or(0)
}

fn require_parent_dir(state: &State, path: &Path) -> io::Result<()> {
    match path.parent().and_then(|p| state.entries.get(p)) {
        Some(MockEntry::Dir) => Ok(()),
        Some(_) => Err(io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("parent of {path:?} is not a directory"),
        )),
        None => Err(not_found(path)),
    }
}

fn injected_failure(state: &State, path: &Path) -> io::Result<()> {
    if state.failing.contains(path) {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("injected failure for {path:?}"),
        ));
    }
    Ok(())
}

impl FileSystem for MockFileSystem {
    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        Ok(self.lock().entries.get(path).map(MockEntry::kind))
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::Dir) => Ok(children_of(&state, path)),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{path:?} is not a directory"),
            )),
            None => Err(not_found(path)),
        }
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.entries.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{path:?} already exists"),
            ));
        }
        require_parent_dir(&state, path)?;
        state.entries.insert(path.to_path_buf(), MockEntry::Dir);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if let Some(existing) = state.entries.get(path) {
            if *existing != MockEntry::Dir {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{path:?} exists and is not a directory"),
                ));
            }
        }
        ensure_dirs(&mut state, path);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.lock();
        injected_failure(&state, from)?;
        let source = state.entries.get(from).cloned().ok_or_else(|| not_found(from))?;
        require_parent_dir(&state, to)?;

        if device_of(&state, from) != device_of(&state, to) {
            return Err(io::Error::new(
                io::ErrorKind::CrossesDevices,
                format!("cannot rename {from:?} to {to:?} across devices"),
            ));
        }

        match (state.entries.get(to), &source) {
            (None, _) => {}
            (Some(MockEntry::Dir), MockEntry::Dir) => {
                if !children_of(&state, to).is_empty() {
                    return Err(io::Error::new(
                        io::ErrorKind::DirectoryNotEmpty,
                        format!("{to:?} is not empty"),
                    ));
                }
            }
            (Some(MockEntry::Dir), _) => {
                return Err(io::Error::new(
                    io::ErrorKind::IsADirectory,
                    format!("{to:?} is a directory"),
                ));
            }
            (Some(_), MockEntry::Dir) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("{to:?} is not a directory"),
                ));
            }
            (Some(_), _) => {}
        }

        for old in subtree_of(&state, to) {
            state.entries.remove(&old);
        }
        for old in subtree_of(&state, from) {
            if let Some(entry) = state.entries.remove(&old) {
                let rel = old.strip_prefix(from).map(Path::to_path_buf).unwrap_or_default();
                let new = if rel.as_os_str().is_empty() {
                    to.to_path_buf()
                } else {
                    to.join(rel)
                };
                state.entries.insert(new, entry);
            }
        }
        Ok(())
    }

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.lock();
        injected_failure(&state, from)?;
        let bytes = match state.entries.get(from) {
            Some(MockEntry::File(bytes)) => bytes.clone(),
            Some(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{from:?} is not a regular file"),
                ));
            }
            None => return Err(not_found(from)),
        };
        require_parent_dir(&state, to)?;
        if let Some(MockEntry::Dir) = state.entries.get(to) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{to:?} is a directory"),
            ));
        }
        state.entries.insert(to.to_path_buf(), MockEntry::File(bytes));
        Ok(())
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        match self.lock().entries.get(path) {
            Some(MockEntry::Symlink(target)) => Ok(target.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{path:?} is not a symlink"),
            )),
            None => Err(not_found(path)),
        }
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.entries.contains_key(link) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{link:?} already exists"),
            ));
        }
        require_parent_dir(&state, link)?;
        state
            .entries
            .insert(link.to_path_buf(), MockEntry::Symlink(target.to_path_buf()));
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::Dir) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{path:?} is a directory"),
            )),
            Some(_) => {
                state.entries.remove(path);
                Ok(())
            }
            None => Err(not_found(path)),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if !state.entries.contains_key(path) {
            return Err(not_found(path));
        }
        for p in subtree_of(&state, path) {
            state.entries.remove(&p);
        }
        Ok(())
    }

    fn device_id(&self, path: &Path) -> io::Result<Option<u64>> {
        let state = self.lock();
        if !state.entries.contains_key(path) {
            return Err(not_found(path));
        }
        Ok(Some(device_of(&state, path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_moves_whole_subtree() {
        let fs = MockFileSystem::new();
        fs.add_file("/ws/out/a.txt", b"a".to_vec());
        fs.add_file("/ws/out/nested/b.txt", b"b".to_vec());
        fs.add_dir("/dest");

        fs.rename(Path::new("/ws/out"), Path::new("/dest/out")).unwrap();

        assert_eq!(fs.read_file("/dest/out/a.txt"), Some(b"a".to_vec()));
        assert_eq!(fs.read_file("/dest/out/nested/b.txt"), Some(b"b".to_vec()));
        assert!(!fs.exists(Path::new("/ws/out")));
        assert_eq!(fs.child_names("/ws"), Vec::<String>::new());
    }

    #[test]
    fn rename_across_mounts_fails_with_crosses_devices() {
        let fs = MockFileSystem::new();
        fs.add_file("/ws/a.txt", b"a".to_vec());
        fs.mount("/mnt/dest", 2);

        let err = fs
            .rename(Path::new("/ws/a.txt"), Path::new("/mnt/dest/a.txt"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::CrossesDevices);
        assert_eq!(fs.device_id(Path::new("/mnt/dest")).unwrap(), Some(2));
        assert_eq!(fs.device_id(Path::new("/ws")).unwrap(), Some(1));
    }

    #[test]
    fn rename_onto_non_empty_dir_is_rejected() {
        let fs = MockFileSystem::new();
        fs.add_file("/ws/d/new.txt", b"n".to_vec());
        fs.add_file("/dest/d/old.txt", b"o".to_vec());

        let err = fs
            .rename(Path::new("/ws/d"), Path::new("/dest/d"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::DirectoryNotEmpty);
        assert_eq!(fs.read_file("/dest/d/old.txt"), Some(b"o".to_vec()));
    }

    #[test]
    fn create_dir_reports_already_exists() {
        let fs = MockFileSystem::new();
        fs.add_dir("/tmp/x");
        let err = fs.create_dir(Path::new("/tmp/x")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        let err = fs.create_dir(Path::new("/nope/y")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
