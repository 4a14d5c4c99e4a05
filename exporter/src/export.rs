//! Headless Web export.
//!
//! The output directory is owned by the exporter: it is wiped and recreated
//! before every run so stale files from earlier exports never ship. The
//! editor is then invoked headlessly with both template environment
//! variables pointing at the cache, and a non-zero exit aborts the run.

use crate::error::{ExportError, Result, detail_suffix};
use crate::process::{CommandRunner, CommandSpec};
use camino::{Utf8Path, Utf8PathBuf};

/// Environment variables that point the editor at the export templates.
pub const TEMPLATE_ENV_VARS: [&str; 2] = ["GODOT_TEMPLATES_DIR", "GODOT4_TEMPLATES_DIR"];

/// One export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    /// Godot project directory (contains `project.godot`).
    pub project_dir: Utf8PathBuf,
    /// Directory the export is written into.
    pub output_dir: Utf8PathBuf,
    /// Entry document file name inside `output_dir`.
    pub entry: String,
    /// Export preset name.
    pub preset: String,
}

impl ExportJob {
    /// Return the path of the entry document.
    #[must_use]
    pub fn entry_path(&self) -> Utf8PathBuf {
        self.output_dir.join(&self.entry)
    }

    /// Build the editor command line for this job.
    #[must_use]
    pub fn command(&self, binary: &Utf8Path, templates: &Utf8Path) -> CommandSpec {
        let mut command = CommandSpec::new(binary.as_std_path())
            .arg("--headless")
            .arg("--path")
            .arg(&self.project_dir)
            .arg("--export-release")
            .arg(&self.preset)
            .arg(self.entry_path());
        for name in TEMPLATE_ENV_VARS {
            command = command.env(name, templates);
        }
        command
    }
}

/// Wipe the output directory and run the export.
///
/// # Errors
///
/// Returns [`ExportError::Io`] if the output directory cannot be reset,
/// [`ExportError::Launch`] if the editor cannot be started, and
/// [`ExportError::ExportFailed`] if it exits unsuccessfully.
pub fn run_export(
    runner: &dyn CommandRunner,
    binary: &Utf8Path,
    templates: &Utf8Path,
    job: &ExportJob,
    capture_output: bool,
) -> Result<()> {
    reset_output_dir(&job.output_dir)?;

    let command = job.command(binary, templates).capture_output(capture_output);
    log::debug!("export command: {command}");
    let outcome = runner
        .run(&command)
        .map_err(|source| ExportError::Launch {
            program: binary.to_string(),
            source,
        })?;

    if outcome.success() {
        Ok(())
    } else {
        Err(ExportError::ExportFailed {
            preset: job.preset.clone(),
            status: outcome.status,
            detail: detail_suffix(outcome.stderr.as_deref()),
        })
    }
}

fn reset_output_dir(dir: &Utf8Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(ExportError::io("remove directory", dir))?;
    }
    std::fs::create_dir_all(dir).map_err(ExportError::io("create directory", dir))
}
