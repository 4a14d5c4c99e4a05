//! Export template cache and system mirror.
//!
//! A template version directory is ready when its sentinel file exists. The
//! bundle unpacks to a top-level `templates/` directory, which is renamed
//! into place only after extraction finishes, so an interrupted run never
//! leaves a ready-looking directory behind.
//!
//! Godot's headless export ignores `GODOT_TEMPLATES_DIR` in some releases
//! and only looks in the per-user data directory, so the ready directory is
//! also mirrored there. The mirror is always replaced wholesale.

use crate::config::ExportConfig;
use crate::dirs::{BaseDirs, system_template_dir};
use crate::download::{Downloader, FetchOutcome};
use crate::error::{ExportError, Result};
use crate::extraction::ArchiveExtractor;
use crate::layout::CacheLayout;
use crate::output::Progress;
use crate::platform::HostOs;
use crate::version::ToolchainVersion;
use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

/// Return true when the templates for `version` are ready in `layout`.
#[must_use]
pub fn templates_ready(layout: &CacheLayout, version: &ToolchainVersion) -> bool {
    layout.template_version_dir(version).is_dir() && layout.template_sentinel(version).is_file()
}

/// Provisions export templates into the cache.
pub struct TemplateCache<'a> {
    config: &'a ExportConfig,
    layout: CacheLayout,
    downloader: &'a Downloader,
    extractor: &'a dyn ArchiveExtractor,
    sync: Option<TemplateSync<'a>>,
}

impl<'a> TemplateCache<'a> {
    /// Create a cache for `config`. When `sync` is given, ready templates
    /// are mirrored to the system location on every call.
    #[must_use]
    pub fn new(
        config: &'a ExportConfig,
        downloader: &'a Downloader,
        extractor: &'a dyn ArchiveExtractor,
        sync: Option<TemplateSync<'a>>,
    ) -> Self {
        Self {
            config,
            layout: config.layout(),
            downloader,
            extractor,
            sync,
        }
    }

    /// Ensure templates are ready and return the templates root to pass to
    /// the editor.
    ///
    /// # Errors
    ///
    /// Returns download or extraction errors,
    /// [`ExportError::TemplatesMissing`] when the bundle lacks the sentinel,
    /// and I/O errors from replacing directories or mirroring.
    pub fn ensure_templates(&self, progress: &mut Progress<'_>) -> Result<Utf8PathBuf> {
        let version = &self.config.version;
        let version_dir = self.layout.template_version_dir(version);

        if templates_ready(&self.layout, version) {
            log::debug!("templates present at {version_dir}");
            progress.step(format!("using cached export templates {}", version.template_version()));
        } else {
            self.provision(version, &version_dir, progress)?;
        }

        if let Some(sync) = &self.sync {
            if let Some(target) = sync.sync_to_system(&version_dir, version)? {
                progress.step(format!("mirrored export templates to {target}"));
            }
        }
        Ok(self.layout.templates_dir())
    }

    fn provision(
        &self,
        version: &ToolchainVersion,
        version_dir: &Utf8Path,
        progress: &mut Progress<'_>,
    ) -> Result<()> {
        let archive_name = version.templates_archive();
        let archive = self.layout.templates_archive(version);
        let url = self.config.asset_url(&archive_name);
        progress.step(format!("fetching export templates {}", version.template_version()));
        if let FetchOutcome::Downloaded { bytes, .. } =
            self.downloader.fetch(&url, archive.as_std_path())?
        {
            progress.step(format!("downloaded {archive_name} ({bytes} bytes)"));
        }

        let templates_dir = self.layout.templates_dir();
        self.extractor.extract(&archive, &templates_dir)?;

        if version_dir.exists() {
            std::fs::remove_dir_all(version_dir)
                .map_err(ExportError::io("remove directory", version_dir))?;
        }
        let extracted = self.layout.extracted_templates_dir();
        if extracted.exists() {
            std::fs::rename(&extracted, version_dir)
                .map_err(ExportError::io("rename templates into", version_dir))?;
        }

        let sentinel = self.layout.template_sentinel(version);
        if sentinel.is_file() {
            Ok(())
        } else {
            Err(ExportError::TemplatesMissing { sentinel })
        }
    }
}

/// Mirrors a template version directory into the per-user Godot data
/// directory.
pub struct TemplateSync<'a> {
    dirs: &'a dyn BaseDirs,
    os: HostOs,
}

impl<'a> TemplateSync<'a> {
    /// Create a mirror for `os`, resolving locations through `dirs`.
    #[must_use]
    pub fn new(dirs: &'a dyn BaseDirs, os: HostOs) -> Self {
        Self { dirs, os }
    }

    /// Return where `version` is mirrored, or `None` when the user's data
    /// directory cannot be determined.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NonUtf8Path`] for a non-UTF-8 location.
    pub fn target_dir(&self, version: &ToolchainVersion) -> Result<Option<Utf8PathBuf>> {
        let base = system_template_dir(self.dirs, self.os)?;
        Ok(base.map(|base| base.join(version.template_version())))
    }

    /// Replace the mirror of `version` with a copy of `source`.
    ///
    /// Returns the mirror directory, or `None` (doing nothing) when no
    /// user data directory exists.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] if the mirror cannot be removed or
    /// written.
    pub fn sync_to_system(
        &self,
        source: &Utf8Path,
        version: &ToolchainVersion,
    ) -> Result<Option<Utf8PathBuf>> {
        let Some(base) = system_template_dir(self.dirs, self.os)? else {
            log::debug!("no user data directory; skipping template mirror");
            return Ok(None);
        };
        std::fs::create_dir_all(&base).map_err(ExportError::io("create directory", &base))?;

        let target = base.join(version.template_version());
        if target.exists() {
            std::fs::remove_dir_all(&target)
                .map_err(ExportError::io("remove directory", &target))?;
        }
        copy_tree(source, &target)?;
        Ok(Some(target))
    }
}

fn copy_tree(source: &Utf8Path, target: &Utf8Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|err| {
            let path = err
                .path()
                .and_then(Utf8Path::from_path)
                .map_or_else(|| source.to_owned(), Utf8Path::to_owned);
            ExportError::Io {
                operation: "read",
                path,
                source: err.into(),
            }
        })?;
        let path = Utf8Path::from_path(entry.path()).ok_or_else(|| ExportError::NonUtf8Path {
            path: entry.path().display().to_string(),
        })?;
        let Ok(relative) = path.strip_prefix(source) else {
            continue;
        };
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&destination)
                .map_err(ExportError::io("create directory", &destination))?;
        } else {
            std::fs::copy(path, &destination).map_err(ExportError::io("copy to", &destination))?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "templates_tests.rs"]
mod tests;
