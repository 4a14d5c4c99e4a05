//! On-disk cache layout.
//!
//! The cache root holds `cli/` (the extracted editor archive) and
//! `templates/<template-version>/` (the export template bundle). Both
//! survive across runs; only a stale template version directory is ever
//! replaced.

use crate::error::{ExportError, Result};
use crate::platform::PlatformProfile;
use crate::version::ToolchainVersion;
use camino::Utf8PathBuf;

/// File whose presence marks a template version directory as complete.
pub const TEMPLATE_SENTINEL: &str = "web_release.zip";

/// Top-level directory inside the template bundle archive.
pub const TEMPLATE_ARCHIVE_ROOT: &str = "templates";

const CLI_DIRNAME: &str = "cli";
const TEMPLATES_DIRNAME: &str = "templates";
const LOCK_FILENAME: &str = ".lock";

/// Paths inside the cache root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    root: Utf8PathBuf,
}

impl CacheLayout {
    /// Create a layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Return the directory holding the extracted editor archive.
    #[must_use]
    pub fn cli_dir(&self) -> Utf8PathBuf {
        self.root.join(CLI_DIRNAME)
    }

    /// Return the directory holding template version directories.
    #[must_use]
    pub fn templates_dir(&self) -> Utf8PathBuf {
        self.root.join(TEMPLATES_DIRNAME)
    }

    /// Return the advisory lock file guarding the cache.
    #[must_use]
    pub fn lock_file(&self) -> Utf8PathBuf {
        self.root.join(LOCK_FILENAME)
    }

    /// Return where the editor archive is downloaded to.
    #[must_use]
    pub fn binary_archive(&self, profile: &PlatformProfile) -> Utf8PathBuf {
        self.cli_dir().join(profile.archive())
    }

    /// Return where the editor binary lives after extraction.
    #[must_use]
    pub fn binary_path(&self, profile: &PlatformProfile) -> Utf8PathBuf {
        self.cli_dir().join(profile.binary())
    }

    /// Return the template version directory for `version`.
    #[must_use]
    pub fn template_version_dir(&self, version: &ToolchainVersion) -> Utf8PathBuf {
        self.templates_dir().join(version.template_version())
    }

    /// Return the sentinel file inside the template version directory.
    #[must_use]
    pub fn template_sentinel(&self, version: &ToolchainVersion) -> Utf8PathBuf {
        self.template_version_dir(version).join(TEMPLATE_SENTINEL)
    }

    /// Return where the template bundle is downloaded to.
    #[must_use]
    pub fn templates_archive(&self, version: &ToolchainVersion) -> Utf8PathBuf {
        self.templates_dir().join(version.templates_archive())
    }

    /// Return the directory the template bundle unpacks into.
    #[must_use]
    pub fn extracted_templates_dir(&self) -> Utf8PathBuf {
        self.templates_dir().join(TEMPLATE_ARCHIVE_ROOT)
    }

    /// Create the cache root and its subdirectories.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] if any directory cannot be created.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [self.root.clone(), self.cli_dir(), self.templates_dir()] {
            std::fs::create_dir_all(&dir).map_err(ExportError::io("create directory", dir))?;
        }
        Ok(())
    }
}
