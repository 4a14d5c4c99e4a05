//! Editor binary cache.
//!
//! The binary's presence on disk is the only readiness check: if it exists
//! it is used as-is, otherwise the release archive is fetched (or reused if
//! a previous run left it behind) and unpacked into `cli/`.

use crate::config::ExportConfig;
use crate::download::{Downloader, FetchOutcome};
use crate::error::{ExportError, Result};
use crate::extraction::ArchiveExtractor;
use crate::layout::CacheLayout;
use crate::output::Progress;
use crate::platform::PlatformProfile;
use camino::Utf8Path;
use camino::Utf8PathBuf;

/// Provisions the Godot editor binary.
pub struct ToolchainCache<'a> {
    config: &'a ExportConfig,
    layout: CacheLayout,
    downloader: &'a Downloader,
    extractor: &'a dyn ArchiveExtractor,
}

impl<'a> ToolchainCache<'a> {
    /// Create a cache for `config`.
    #[must_use]
    pub fn new(
        config: &'a ExportConfig,
        downloader: &'a Downloader,
        extractor: &'a dyn ArchiveExtractor,
    ) -> Self {
        Self {
            config,
            layout: config.layout(),
            downloader,
            extractor,
        }
    }

    /// Return the path of a ready editor binary, provisioning it if needed.
    ///
    /// # Errors
    ///
    /// Returns download, extraction, or permission errors; all are fatal.
    pub fn ensure_binary(
        &self,
        profile: &PlatformProfile,
        progress: &mut Progress<'_>,
    ) -> Result<Utf8PathBuf> {
        let binary = self.layout.binary_path(profile);
        if binary.exists() {
            log::debug!("editor binary present at {binary}");
            progress.step(format!("using cached Godot {}", self.config.version));
            return Ok(binary);
        }

        let archive = self.layout.binary_archive(profile);
        let url = self.config.asset_url(profile.archive());
        progress.step(format!("fetching Godot {} for {}", self.config.version, profile.os()));
        if let FetchOutcome::Downloaded { bytes, .. } =
            self.downloader.fetch(&url, archive.as_std_path())?
        {
            progress.step(format!("downloaded {} ({bytes} bytes)", profile.archive()));
        }

        self.extractor.extract(&archive, &self.layout.cli_dir())?;
        if !profile.is_windows() {
            make_executable(&binary)?;
        }
        Ok(binary)
    }
}

#[cfg(unix)]
fn make_executable(path: &Utf8Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(ExportError::io("mark executable", path))
}

#[cfg(not(unix))]
fn make_executable(_path: &Utf8Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "toolchain_tests.rs"]
mod tests;
