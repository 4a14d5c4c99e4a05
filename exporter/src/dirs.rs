//! Directory resolution abstraction for platform-specific paths.
//!
//! Godot looks for export templates in a per-user location that differs by
//! operating system. The [`BaseDirs`] trait isolates the home and app-data
//! lookups so tests can place that location inside a scratch directory.

use crate::error::{ExportError, Result};
use crate::platform::HostOs;
use camino::Utf8PathBuf;
use std::path::PathBuf;

/// Source of the user's base directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// Return the user's home directory, if one can be determined.
    fn home_dir(&self) -> Option<PathBuf>;

    /// Return the Windows roaming application-data directory from
    /// `APPDATA`, if set.
    fn app_data_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by the real environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBaseDirs;

impl BaseDirs for SystemBaseDirs {
    fn home_dir(&self) -> Option<PathBuf> {
        directories_next::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
    }

    fn app_data_dir(&self) -> Option<PathBuf> {
        std::env::var_os("APPDATA")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }
}

/// Return the directory Godot scans for installed export templates.
///
/// - Windows: `%APPDATA%\Godot\export_templates`, falling back to
///   `<home>\AppData\Roaming\Godot\export_templates`.
/// - macOS: `<home>/Library/Application Support/Godot/export_templates`.
/// - Linux: `<home>/.local/share/godot/export_templates`.
///
/// Returns `Ok(None)` when no base directory can be determined.
///
/// # Errors
///
/// Returns [`ExportError::NonUtf8Path`] if the resolved directory is not
/// valid UTF-8.
pub fn system_template_dir(dirs: &dyn BaseDirs, os: HostOs) -> Result<Option<Utf8PathBuf>> {
    let resolved = match os {
        HostOs::Windows => dirs
            .app_data_dir()
            .or_else(|| {
                dirs.home_dir()
                    .map(|home| home.join("AppData").join("Roaming"))
            })
            .map(|app_data| app_data.join("Godot").join("export_templates")),
        HostOs::Macos => dirs.home_dir().map(|home| {
            home.join("Library")
                .join("Application Support")
                .join("Godot")
                .join("export_templates")
        }),
        HostOs::Linux => dirs.home_dir().map(|home| {
            home.join(".local")
                .join("share")
                .join("godot")
                .join("export_templates")
        }),
    };

    resolved
        .map(|path| {
            Utf8PathBuf::from_path_buf(path).map_err(|path| ExportError::NonUtf8Path {
                path: path.display().to_string(),
            })
        })
        .transpose()
}
