//! Temporary download directories for file-based tests.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

/// A throwaway provider cache directory.
pub struct FeedDir {
    dir: TempDir,
}

impl FeedDir {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `name` inside the directory (not created).
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `contents` to `name`.
    pub fn write(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        let path = self.file(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Create or update marker `name` with modification time `mtime`.
    pub fn touch(&self, name: &str, mtime: SystemTime) -> io::Result<PathBuf> {
        let path = self.file(name);
        let file = File::options().create(true).append(true).open(&path)?;
        file.set_modified(mtime)?;
        Ok(path)
    }
}

/// `UNIX_EPOCH + secs`, for deterministic marker times.
pub fn epoch_plus(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}
