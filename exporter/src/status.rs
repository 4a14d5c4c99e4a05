//! Status command implementation.
//!
//! Reports what a run would find on disk (toolchain cache, template mirror,
//! and the last export) without touching the network or changing anything.

use crate::cli::StatusArgs;
use crate::config::{ExportConfig, RunFlags};
use crate::dirs::{BaseDirs, SystemBaseDirs};
use crate::error::{ExportError, Result};
use crate::patch::is_patched;
use crate::platform::{HostOs, PlatformProfile};
use crate::templates::{TemplateSync, templates_ready};
use camino::Utf8Path;
use serde::Serialize;
use std::io::Write;

/// A path and whether it is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathState {
    /// Location on disk.
    pub path: String,
    /// Whether the location exists (and, for templates, is ready).
    pub present: bool,
}

impl PathState {
    fn new(path: &Utf8Path, present: bool) -> Self {
        Self {
            path: path.to_string(),
            present,
        }
    }
}

/// State of the exported entry document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryState {
    /// Location on disk.
    pub path: String,
    /// Whether the document exists.
    pub present: bool,
    /// Whether the document carries the cross-origin patch.
    pub patched: bool,
}

/// Snapshot of the cache and output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Release tag, e.g. `4.2.2-stable`.
    pub release_tag: String,
    /// Template directory name, e.g. `4.2.2.stable`.
    pub template_version: String,
    /// Host OS, when Godot publishes an editor for it.
    pub host: Option<HostOs>,
    /// Project directory.
    pub project: PathState,
    /// Editor binary; absent for unsupported hosts.
    pub binary: Option<PathState>,
    /// Template version directory; present means ready.
    pub templates: PathState,
    /// System template mirror, when a user data directory exists.
    pub system_mirror: Option<PathState>,
    /// Exported entry document.
    pub entry: EntryState,
}

impl StatusReport {
    /// Inspect the filesystem for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NonUtf8Path`] if the system mirror location
    /// is not UTF-8.
    pub fn collect(config: &ExportConfig, dirs: &dyn BaseDirs) -> Result<Self> {
        let layout = config.layout();
        let version = &config.version;
        let profile = config
            .host
            .map(|host| PlatformProfile::for_os(host, version));

        let binary = profile.as_ref().map(|profile| {
            let path = layout.binary_path(profile);
            PathState::new(&path, path.is_file())
        });
        let system_mirror = match config.host {
            Some(host) => TemplateSync::new(dirs, host)
                .target_dir(version)?
                .map(|path| PathState::new(&path, path.is_dir())),
            None => None,
        };

        let entry_path = config.export_job().entry_path();
        let html = std::fs::read(&entry_path)
            .ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());

        Ok(Self {
            release_tag: version.release_tag().to_owned(),
            template_version: version.template_version().to_owned(),
            host: config.host,
            project: PathState::new(&config.project_dir, config.project_dir.is_dir()),
            binary,
            templates: PathState::new(
                &layout.template_version_dir(version),
                templates_ready(&layout, version),
            ),
            system_mirror,
            entry: EntryState {
                path: entry_path.to_string(),
                present: html.is_some(),
                patched: html.as_deref().is_some_and(is_patched),
            },
        })
    }
}

/// Reports status for `args` to `stdout`.
///
/// # Errors
///
/// Returns configuration errors, or [`ExportError::WriteFailed`] if
/// writing to stdout fails.
pub fn run_status(args: &StatusArgs, stdout: &mut dyn Write) -> Result<()> {
    let config = ExportConfig::resolve(&args.source, RunFlags::default())?;
    let report = StatusReport::collect(&config, &SystemBaseDirs)?;
    let output = if args.json {
        format_json(&report)
    } else {
        format_human(&report)
    };
    writeln!(stdout, "{output}").map_err(|source| ExportError::WriteFailed { source })
}

/// Renders `report` as pretty-printed JSON.
#[must_use]
pub fn format_json(report: &StatusReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_owned())
}

/// Renders `report` as aligned text.
#[must_use]
pub fn format_human(report: &StatusReport) -> String {
    fn marker(present: bool) -> &'static str {
        if present { "present" } else { "missing" }
    }

    let host = report.host.map_or("unsupported", HostOs::as_str);
    let binary = report.binary.as_ref().map_or_else(
        || "(no editor for this host)".to_owned(),
        |binary| format!("{} ({})", binary.path, marker(binary.present)),
    );
    let mirror = report.system_mirror.as_ref().map_or_else(
        || "(no user data directory)".to_owned(),
        |mirror| format!("{} ({})", mirror.path, marker(mirror.present)),
    );
    let templates = if report.templates.present {
        "ready"
    } else {
        "not ready"
    };
    let entry = match (report.entry.present, report.entry.patched) {
        (false, _) => "missing",
        (true, false) => "unpatched",
        (true, true) => "patched",
    };

    [
        format!("Godot {} on {host}", report.release_tag),
        format!(
            "  project    {} ({})",
            report.project.path,
            marker(report.project.present)
        ),
        format!("  binary     {binary}"),
        format!("  templates  {} ({templates})", report.templates.path),
        format!("  mirror     {mirror}"),
        format!("  entry      {} ({entry})", report.entry.path),
    ]
    .join("\n")
}
