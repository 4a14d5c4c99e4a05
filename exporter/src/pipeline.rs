//! Export pipeline orchestration.
//!
//! The pipeline is a linear state machine:
//!
//! ```text
//! start -> [skip checks] -> directories -> binary -> templates -> export -> patch -> done
//! ```
//!
//! Skip checks (missing project, unsupported host, explicit skip) end the
//! run successfully before anything touches the cache. Every later stage is
//! fatal on error; failures are wrapped in [`ExportError::Stage`] so the
//! single terminal message names the stage that broke. The cache lock is
//! taken in the directories stage and held until the run ends.

use crate::config::{ExportConfig, ExtractorKind};
use crate::dirs::BaseDirs;
use crate::download::Downloader;
use crate::error::{ExportError, Result};
use crate::export::run_export;
use crate::extraction::{ArchiveExtractor, BuiltinExtractor, UnzipExtractor};
use crate::lock::CacheLock;
use crate::output::{Progress, write_stderr_line};
use crate::patch::{PatchOutcome, patch_for_isolation};
use crate::platform::PlatformProfile;
use crate::process::CommandRunner;
use crate::templates::{TemplateCache, TemplateSync};
use crate::toolchain::ToolchainCache;
use camino::Utf8PathBuf;
use serde::Serialize;
use std::fmt;
use std::io::Write;

/// Pipeline stages that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Creating cache directories and taking the cache lock.
    Directories,
    /// Provisioning the editor binary.
    Binary,
    /// Provisioning export templates.
    Templates,
    /// Running the headless export.
    Export,
    /// Patching the entry document.
    Patch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Directories => "directories",
            Self::Binary => "binary",
            Self::Templates => "templates",
            Self::Export => "export",
            Self::Patch => "patch",
        })
    }
}

/// Why a run ended without exporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The project directory does not exist.
    MissingProject {
        /// Directory that was expected.
        path: Utf8PathBuf,
    },
    /// Godot publishes no editor for this host.
    UnsupportedPlatform {
        /// Host identifier.
        host: String,
    },
    /// `--skip` or `GODOT_SKIP_EXPORT=1`.
    Requested,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingProject { path } => {
                write!(f, "no project directory found at {path}, skipping export")
            }
            Self::UnsupportedPlatform { host } => {
                write!(f, "no Godot editor is published for {host}, skipping export")
            }
            Self::Requested => f.write_str("export skipped via GODOT_SKIP_EXPORT or --skip"),
        }
    }
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Nothing was exported.
    Skipped(SkipReason),
    /// The project was exported.
    Exported {
        /// Path of the entry document.
        entry: Utf8PathBuf,
        /// What the patch stage did.
        patch: PatchOutcome,
    },
}

/// Collaborators and configuration for one export run.
pub struct Pipeline<'a> {
    config: &'a ExportConfig,
    downloader: &'a Downloader,
    runner: &'a dyn CommandRunner,
    dirs: &'a dyn BaseDirs,
}

impl<'a> Pipeline<'a> {
    /// Assemble a pipeline.
    #[must_use]
    pub fn new(
        config: &'a ExportConfig,
        downloader: &'a Downloader,
        runner: &'a dyn CommandRunner,
        dirs: &'a dyn BaseDirs,
    ) -> Self {
        Self {
            config,
            downloader,
            runner,
            dirs,
        }
    }

    /// Return the reason this run would be skipped, checked in pipeline
    /// order, or the host profile to export with.
    ///
    /// # Errors
    ///
    /// Returns the skip reason as the error value.
    pub fn preflight(&self) -> std::result::Result<PlatformProfile, SkipReason> {
        preflight(self.config)
    }

    /// Run the pipeline to completion.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Stage`] wrapping the first fatal failure.
    pub fn run(&self, progress: &mut Progress<'_>) -> Result<PipelineOutcome> {
        let profile = match self.preflight() {
            Ok(profile) => profile,
            Err(reason) => {
                log::info!("{reason}");
                match reason {
                    SkipReason::Requested => progress.step(&reason),
                    _ => progress.warn(&reason),
                }
                return Ok(PipelineOutcome::Skipped(reason));
            }
        };

        let config = self.config;
        let layout = config.layout();
        let _lock = in_stage(Stage::Directories, || {
            layout.ensure_directories()?;
            CacheLock::acquire(&layout.lock_file())
        })?;

        let unzip = UnzipExtractor::new(self.runner, config.quiet);
        let extractor: &dyn ArchiveExtractor = match config.extractor {
            ExtractorKind::Unzip => &unzip,
            ExtractorKind::Builtin => &BuiltinExtractor,
        };

        let binary = in_stage(Stage::Binary, || {
            ToolchainCache::new(config, self.downloader, extractor).ensure_binary(&profile, progress)
        })?;

        let sync = config
            .system_sync
            .then(|| TemplateSync::new(self.dirs, profile.os()));
        let templates = in_stage(Stage::Templates, || {
            TemplateCache::new(config, self.downloader, extractor, sync).ensure_templates(progress)
        })?;

        let job = config.export_job();
        progress.step(format!(
            "exporting preset \"{}\" to {}",
            job.preset, job.output_dir
        ));
        in_stage(Stage::Export, || {
            run_export(self.runner, &binary, &templates, &job, config.quiet)
        })?;

        let entry = job.entry_path();
        let patch = in_stage(Stage::Patch, || {
            patch_for_isolation(&job.output_dir, &job.entry)
        })?;
        report_patch(patch, progress);
        progress.step(format!("export complete: {entry}"));

        Ok(PipelineOutcome::Exported { entry, patch })
    }

    /// Describe what [`Self::run`] would do without doing it.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::WriteFailed`] if `out` cannot be written, or
    /// [`ExportError::NonUtf8Path`] if the system mirror location is not
    /// UTF-8.
    pub fn describe(&self, out: &mut dyn Write) -> Result<()> {
        let config = self.config;
        let layout = config.layout();
        let mut lines = vec![
            format!("Godot version: {}", config.version),
            format!("Project directory: {}", config.project_dir),
            format!("Output directory: {}", config.output_dir),
            format!("Cache directory: {}", config.cache_dir),
            format!("Export preset: {}", config.preset),
        ];

        match self.preflight() {
            Err(reason) => lines.push(format!("Would skip: {reason}")),
            Ok(profile) => {
                let templates_root = layout.templates_dir();
                let binary = layout.binary_path(&profile);
                lines.push(format!("Host: {}", profile.os()));
                lines.push(format!("Editor download: {}", config.asset_url(profile.archive())));
                lines.push(format!(
                    "Templates download: {}",
                    config.asset_url(&config.version.templates_archive())
                ));
                if config.system_sync {
                    let mirror = TemplateSync::new(self.dirs, profile.os())
                        .target_dir(&config.version)?;
                    lines.push(format!(
                        "Template mirror: {}",
                        mirror.map_or_else(|| "(none)".to_owned(), |dir| dir.to_string())
                    ));
                }
                lines.push(format!(
                    "Export command: {}",
                    config.export_job().command(&binary, &templates_root)
                ));
            }
        }

        for line in lines {
            writeln!(out, "{line}").map_err(|source| ExportError::WriteFailed { source })?;
        }
        Ok(())
    }
}

fn preflight(config: &ExportConfig) -> std::result::Result<PlatformProfile, SkipReason> {
    if !config.project_dir.is_dir() {
        return Err(SkipReason::MissingProject {
            path: config.project_dir.clone(),
        });
    }
    let Some(profile) = config
        .host
        .map(|host| PlatformProfile::for_os(host, &config.version))
    else {
        return Err(SkipReason::UnsupportedPlatform {
            host: std::env::consts::OS.to_owned(),
        });
    };
    if config.skip {
        return Err(SkipReason::Requested);
    }
    Ok(profile)
}

fn in_stage<T>(stage: Stage, step: impl FnOnce() -> Result<T>) -> Result<T> {
    log::info!("stage {stage} started");
    step().map_err(|source| ExportError::Stage {
        stage,
        source: Box::new(source),
    })
}

fn report_patch(outcome: PatchOutcome, progress: &mut Progress<'_>) {
    match outcome {
        PatchOutcome::MissingEntry => {
            progress.warn("export HTML missing; skipping cross-origin patch");
        }
        PatchOutcome::SnippetNotFound => {
            progress.warn("unable to locate the missing feature check; entry document left unpatched");
        }
        PatchOutcome::AlreadyPatched => progress.step("entry document already patched"),
        PatchOutcome::Patched => progress.step("patched export to allow non-isolated browsers"),
    }
}

/// Print the terminal failure line for `err`.
pub fn report_failure(err: &ExportError, stderr: &mut dyn Write) {
    write_stderr_line(stderr, format!("{} export failed: {err}", crate::output::PREFIX));
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
