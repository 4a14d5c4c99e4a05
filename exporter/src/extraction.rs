//! Archive extraction.
//!
//! Godot ships both the editor and the template bundle as zip archives. The
//! default extractor shells out to `unzip -oq`, matching what the release
//! tooling expects on CI images; [`BuiltinExtractor`] unpacks with the `zip`
//! crate for hosts without the utility. Neither cleans up after a failed
//! extraction: the next run overwrites whatever was left.

use crate::error::{ExportError, Result, detail_suffix};
use crate::process::{CommandRunner, CommandSpec};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};

/// Program used by [`UnzipExtractor`].
pub const UNZIP: &str = "unzip";

/// Unpacks an archive into a destination directory.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract `archive` into `destination`, creating it if needed and
    /// overwriting existing files.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be created or the archive
    /// cannot be unpacked.
    fn extract(&self, archive: &Utf8Path, destination: &Utf8Path) -> Result<()>;
}

/// Extracts through the external `unzip` utility.
pub struct UnzipExtractor<'a> {
    runner: &'a dyn CommandRunner,
    capture_output: bool,
}

impl<'a> UnzipExtractor<'a> {
    /// Create an extractor; `capture_output` hides the utility's output and
    /// attaches it to errors instead.
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, capture_output: bool) -> Self {
        Self {
            runner,
            capture_output,
        }
    }

    /// Build the command line for extracting `archive` into `destination`.
    #[must_use]
    pub fn command(&self, archive: &Utf8Path, destination: &Utf8Path) -> CommandSpec {
        CommandSpec::new(UNZIP)
            .arg("-oq")
            .arg(archive)
            .arg("-d")
            .arg(destination)
            .capture_output(self.capture_output)
    }
}

impl ArchiveExtractor for UnzipExtractor<'_> {
    fn extract(&self, archive: &Utf8Path, destination: &Utf8Path) -> Result<()> {
        fs::create_dir_all(destination)
            .map_err(ExportError::io("create directory", destination))?;

        let command = self.command(archive, destination);
        let outcome = self
            .runner
            .run(&command)
            .map_err(|source| ExportError::Launch {
                program: UNZIP.to_owned(),
                source,
            })?;

        if outcome.success() {
            Ok(())
        } else {
            Err(ExportError::ExtractionFailed {
                archive: archive.to_owned(),
                status: outcome.status,
                detail: detail_suffix(outcome.stderr.as_deref()),
            })
        }
    }
}

/// Extracts with the `zip` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinExtractor;

impl ArchiveExtractor for BuiltinExtractor {
    fn extract(&self, archive: &Utf8Path, destination: &Utf8Path) -> Result<()> {
        extract_zip(archive, destination)
    }
}

/// Unpack the zip at `archive` into `destination`.
///
/// Entries whose names would resolve outside `destination` are rejected.
/// Unix permission bits stored in the archive are restored.
///
/// # Errors
///
/// Returns [`ExportError::InvalidArchive`] for unreadable or unsafe
/// archives and [`ExportError::Io`] for filesystem failures.
pub fn extract_zip(archive: &Utf8Path, destination: &Utf8Path) -> Result<()> {
    let invalid = |reason: String| ExportError::InvalidArchive {
        archive: archive.to_owned(),
        reason,
    };

    fs::create_dir_all(destination).map_err(ExportError::io("create directory", destination))?;
    let file = File::open(archive).map_err(ExportError::io("open archive", archive))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|err| invalid(err.to_string()))?;

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|err| invalid(err.to_string()))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(invalid(format!(
                "entry \"{}\" escapes the destination",
                entry.name()
            )));
        };
        let relative = Utf8PathBuf::from_path_buf(relative).map_err(|path| {
            ExportError::NonUtf8Path {
                path: path.display().to_string(),
            }
        })?;
        let target = destination.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(ExportError::io("create directory", &target))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(ExportError::io("create directory", parent))?;
        }
        let mut out = File::create(&target).map_err(ExportError::io("create", &target))?;
        std::io::copy(&mut entry, &mut out).map_err(ExportError::io("write", &target))?;
        restore_mode(&target, entry.unix_mode())?;
    }
    Ok(())
}

#[cfg(unix)]
fn restore_mode(path: &Utf8Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let Some(mode) = mode else {
        return Ok(());
    };
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
        .map_err(ExportError::io("set permissions on", path))
}

#[cfg(not(unix))]
fn restore_mode(_path: &Utf8Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}
