//! Atomic replacement of the generated configuration.
//!
//! Content is staged in a temporary file next to the destination and renamed
//! over it in one step. Until that rename the destination is never touched;
//! on any abort the staged file is deleted.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile, TempPath};

/// Error type for staging and promotion.
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    /// The staging file could not be created.
    #[error("failed to create staging file in {dir:?}: {source}")]
    Create {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing, flushing or syncing the staged content failed.
    #[error("failed to write staged content: {0}")]
    Write(#[source] io::Error),

    /// The staged file could not be renamed over the destination.
    #[error("failed to rename staged file to {path:?}: {source}")]
    Rename {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The writer was already finished or closed.
    #[error("staging file for {0:?} is already closed")]
    Closed(PathBuf),
}

enum Stage {
    Open(BufWriter<NamedTempFile>),
    Sealed(TempPath),
    Closed,
}

/// Writes a file through a staged temporary and promotes it atomically.
///
/// Writes go through a conventional fallible [`Write`] implementation. The
/// first failure is also remembered so that [`finish`](Self::finish) refuses
/// to promote content that was never fully written, even if the caller
/// ignored the error.
///
/// Dropping an unfinished writer deletes the staged file.
pub struct AtomicConfigWriter {
    dest: PathBuf,
    mode: u32,
    stage: Stage,
    error: Option<io::Error>,
    promoted: bool,
}

impl AtomicConfigWriter {
    /// Create the staging file for `dest`.
    ///
    /// The file is created in the destination's directory so the final rename
    /// stays on one filesystem. Its name ends in `.tmp` so it is never picked
    /// up by a `*.conf` include while it is being written. `mode` holds the
    /// permission bits applied before promotion (Unix only).
    pub fn create(dest: impl Into<PathBuf>, mode: u32) -> Result<Self, WriterError> {
        let dest = dest.into();
        let dir = staging_dir(&dest).to_path_buf();
        let name = dest
            .file_name()
            .map_or_else(|| "staged".into(), |n| n.to_string_lossy().into_owned());

        let file = Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(|source| WriterError::Create { dir, source })?;

        tracing::debug!(path = %file.path().display(), "created staging file");

        Ok(Self {
            dest,
            mode,
            stage: Stage::Open(BufWriter::new(file)),
            error: None,
            promoted: false,
        })
    }

    /// Final path of the file.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.dest
    }

    /// Path of the staged file while it exists.
    #[must_use]
    pub fn staged_path(&self) -> Option<&Path> {
        match &self.stage {
            Stage::Open(buf) => Some(buf.get_ref().path()),
            Stage::Sealed(path) => Some(&**path),
            Stage::Closed => None,
        }
    }

    #[must_use]
    pub const fn is_promoted(&self) -> bool {
        self.promoted
    }

    /// Flush, sync and close the staged file without promoting it.
    ///
    /// Returns the staged path so the content can be inspected in place, for
    /// example by a syntax checker. Calling it again is a no-op.
    pub fn seal(&mut self) -> Result<&Path, WriterError> {
        if let Some(err) = &self.error {
            return Err(WriterError::Write(io::Error::new(err.kind(), err.to_string())));
        }

        match std::mem::replace(&mut self.stage, Stage::Closed) {
            Stage::Open(buf) => {
                // On failure the temp file is dropped here, which deletes it.
                let file = buf
                    .into_inner()
                    .map_err(|err| WriterError::Write(err.into_error()))?;
                file.as_file().sync_all().map_err(WriterError::Write)?;
                set_mode(&file, self.mode).map_err(WriterError::Write)?;
                self.stage = Stage::Sealed(file.into_temp_path());
            }
            sealed @ Stage::Sealed(_) => self.stage = sealed,
            Stage::Closed => return Err(WriterError::Closed(self.dest.clone())),
        }

        match &self.stage {
            Stage::Sealed(path) => Ok(&**path),
            _ => Err(WriterError::Closed(self.dest.clone())),
        }
    }

    /// Promote the staged file to the destination.
    ///
    /// Fails without renaming if any earlier write failed. The writer is
    /// marked promoted only once the rename succeeded.
    pub fn finish(&mut self) -> Result<(), WriterError> {
        self.seal()?;

        let Stage::Sealed(path) = std::mem::replace(&mut self.stage, Stage::Closed) else {
            return Err(WriterError::Closed(self.dest.clone()));
        };

        // A failed persist hands the path back inside the error; dropping it
        // removes the staged file.
        path.persist(&self.dest)
            .map_err(|err| WriterError::Rename {
                path: self.dest.clone(),
                source: err.error,
            })?;
        self.promoted = true;

        tracing::debug!(path = %self.dest.display(), "promoted staged file");
        Ok(())
    }

    /// Release the staged file.
    ///
    /// Closes the handle if still open and deletes the staged file unless it
    /// was promoted. Safe to call any number of times.
    pub fn close(&mut self) {
        match std::mem::replace(&mut self.stage, Stage::Closed) {
            Stage::Open(buf) => {
                let (file, _) = buf.into_parts();
                if let Err(err) = file.close() {
                    tracing::warn!(error = %err, "failed to remove staging file");
                }
            }
            Stage::Sealed(path) => {
                if let Err(err) = path.close() {
                    tracing::warn!(error = %err, "failed to remove staging file");
                }
            }
            Stage::Closed => {}
        }
    }

    fn record(&mut self, err: io::Error) -> io::Error {
        if self.error.is_none() {
            self.error = Some(io::Error::new(err.kind(), err.to_string()));
        }
        err
    }

    fn poisoned(&self) -> Option<io::Error> {
        self.error
            .as_ref()
            .map(|err| io::Error::new(err.kind(), format!("earlier write failed: {err}")))
    }
}

impl Write for AtomicConfigWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(err) = self.poisoned() {
            return Err(err);
        }
        let result = match &mut self.stage {
            Stage::Open(out) => out.write(buf),
            _ => Err(io::Error::other("staging file is closed")),
        };
        result.map_err(|err| self.record(err))
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(err) = self.poisoned() {
            return Err(err);
        }
        let result = match &mut self.stage {
            Stage::Open(out) => out.flush(),
            _ => Ok(()),
        };
        result.map_err(|err| self.record(err))
    }
}

impl Drop for AtomicConfigWriter {
    fn drop(&mut self) {
        self.close();
    }
}

fn staging_dir(dest: &Path) -> &Path {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn set_mode(file: &NamedTempFile, mode: u32) -> io::Result<()> {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;

    file.as_file().set_permissions(Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &NamedTempFile, _mode: u32) -> io::Result<()> {
    Ok(())
}
