use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use intemp::errors::{IntempError, Result};
use intemp::exec::{ChildStatus, CommandSpec, ProcessRunner};

/// A fake process runner that:
/// - records every working directory it was asked to run in
/// - writes the scripted files (relative to that directory) to real disk
/// - reports the scripted status, or a spawn failure.
pub struct FakeRunner {
    files: Vec<(PathBuf, Vec<u8>)>,
    status: Option<ChildStatus>,
    runs: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeRunner {
    /// A child that exits with `status`.
    pub fn exiting(status: ChildStatus) -> Self {
        Self {
            files: Vec::new(),
            status: Some(status),
            runs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A command that cannot be launched.
    pub fn unspawnable() -> Self {
        Self {
            files: Vec::new(),
            status: None,
            runs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Have the child write `content` to `relative` inside its workspace.
    pub fn writes(mut self, relative: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.files.push((relative.into(), content.into()));
        self
    }

    /// Shared log of the directories the runner was invoked in.
    pub fn runs(&self) -> Arc<Mutex<Vec<PathBuf>>> {
        Arc::clone(&self.runs)
    }
}

impl ProcessRunner for FakeRunner {
    fn run<'a>(
        &'a self,
        command: &'a CommandSpec,
        cwd: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<ChildStatus>> + Send + 'a>> {
        Box::pin(async move {
            let Some(status) = self.status else {
                return Err(IntempError::Spawn {
                    program: command.program.clone(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            };

            self.runs.lock().unwrap().push(cwd.to_path_buf());

            for (relative, content) in &self.files {
                let path = cwd.join(relative);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| IntempError::io("fake mkdir", e))?;
                }
                std::fs::write(&path, content).map_err(|e| IntempError::io("fake write", e))?;
            }
            Ok(status)
        })
    }
}
