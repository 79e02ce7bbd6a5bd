//! Run-level lock file.
//!
//! Two runs writing the same destination would race on the final rename, so
//! each run holds an exclusive advisory lock on a file next to the
//! destination. The operating system drops the lock when the holding process
//! exits for any reason, so a crashed run never blocks the next one.

use std::fs::{File, OpenOptions, TryLockError};
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};

/// Error type for acquiring the run lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// A live process holds the lock.
    #[error("lock file {0:?} is held by another run")]
    Held(PathBuf),

    /// The lock file could not be opened, locked or written.
    #[error("failed to lock {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An exclusive lock held for the lifetime of the value.
///
/// The lock file holds the owner's process id for operators. The file itself
/// is left in place on release: only the advisory lock on it matters, and
/// unlinking it would let a waiting run lock an orphaned inode.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    file: File,
}

impl RunLock {
    /// Lock the file at `path`, creating it if needed.
    ///
    /// Fails with [`LockError::Held`] without waiting when another process
    /// holds the lock. A file left behind by a dead process is taken over.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, LockError> {
        let path = path.into();

        let file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
        {
            Ok(file) => file,
            Err(source) => return Err(LockError::Io { path, source }),
        };

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => return Err(LockError::Held(path)),
            Err(TryLockError::Error(source)) => return Err(LockError::Io { path, source }),
        }

        let mut lock = Self { path, file };
        lock.record_owner().map_err(|source| LockError::Io {
            path: lock.path.clone(),
            source,
        })?;

        tracing::debug!(path = %lock.path.display(), "acquired run lock");
        Ok(lock)
    }

    /// Lock file path for a destination: `.<name>.lock` in the same directory.
    #[must_use]
    pub fn path_for(dest: &Path) -> PathBuf {
        let name = dest
            .file_name()
            .map_or_else(|| "blocklist".into(), |n| n.to_string_lossy().into_owned());
        dest.with_file_name(format!(".{name}.lock"))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // Replaces whatever pid a previous owner left behind.
    fn record_owner(&mut self) -> io::Result<()> {
        self.file.set_len(0)?;
        self.file.rewind()?;
        writeln!(self.file, "{}", std::process::id())?;
        self.file.flush()
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to release run lock");
        }
    }
}
