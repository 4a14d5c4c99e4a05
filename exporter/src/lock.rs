//! Advisory lock guarding the cache root.
//!
//! Downloads, template replacement, and the system mirror are all
//! read-modify-write operations on shared directories. A run holds an
//! exclusive `fs2` lock on `<cache>/.lock` for its whole lifetime so a
//! concurrent invocation fails fast instead of interleaving writes.

use crate::error::{ExportError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use std::fs::{File, OpenOptions};

/// Held exclusive lock on a cache root. Released on drop.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    path: Utf8PathBuf,
}

impl CacheLock {
    /// Acquire the lock at `path` without blocking.
    ///
    /// The parent directory must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::CacheBusy`] when another process holds the
    /// lock, or [`ExportError::Io`] if the lock file cannot be opened.
    pub fn acquire(path: &Utf8Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(ExportError::io("open lock file", path))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                log::debug!("acquired cache lock {path}");
                Ok(Self {
                    file,
                    path: path.to_owned(),
                })
            }
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                Err(ExportError::CacheBusy {
                    path: path.to_owned(),
                })
            }
            Err(err) => Err(ExportError::io("lock", path)(err)),
        }
    }

    /// Return the lock file path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            log::debug!("failed to release cache lock {}: {err}", self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_path() -> (tempfile::TempDir, Utf8PathBuf) {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(temp.path().join(".lock")).expect("UTF-8 path");
        (temp, path)
    }

    #[test]
    fn second_acquire_reports_busy_until_first_is_dropped() {
        let (_temp, path) = lock_path();

        let first = CacheLock::acquire(&path).expect("first lock");
        let err = CacheLock::acquire(&path).expect_err("second lock should fail");
        assert!(matches!(err, ExportError::CacheBusy { .. }));

        drop(first);
        let again = CacheLock::acquire(&path).expect("lock after release");
        assert_eq!(again.path(), path);
    }

    #[test]
    fn missing_parent_is_an_io_error() {
        let (_temp, path) = lock_path();
        let nested = path.join("missing").join(".lock");
        let err = CacheLock::acquire(&nested).expect_err("no parent directory");
        assert!(matches!(err, ExportError::Io { .. }));
    }
}
