//! Error types for the Godot export pipeline.
//!
//! Every fatal condition surfaces as an [`ExportError`]. Variants carry the
//! operation, path or URL, and underlying status so that the single terminal
//! message printed by the binary is enough to diagnose a failed run.

use crate::download::DownloadError;
use crate::pipeline::Stage;
use camino::Utf8PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors that can abort an export run.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Fetching a release asset failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The archive utility exited unsuccessfully.
    #[error("extraction failed for {archive}: {status}{detail}")]
    ExtractionFailed {
        /// Archive that was being unpacked.
        archive: Utf8PathBuf,
        /// Exit status reported by the utility.
        status: ExitStatus,
        /// Captured diagnostics, prefixed with `": "` when present.
        detail: String,
    },

    /// The archive contents could not be unpacked by the built-in extractor.
    #[error("extraction failed for {archive}: {reason}")]
    InvalidArchive {
        /// Archive that was being unpacked.
        archive: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// The template bundle did not contain its sentinel after extraction.
    #[error("Godot export templates missing after extraction: {sentinel} not found")]
    TemplatesMissing {
        /// Sentinel file that was expected.
        sentinel: Utf8PathBuf,
    },

    /// The toolchain export process exited unsuccessfully.
    #[error("Godot export of preset \"{preset}\" failed: {status}{detail}")]
    ExportFailed {
        /// Export preset that was requested.
        preset: String,
        /// Exit status reported by the toolchain.
        status: ExitStatus,
        /// Captured diagnostics, prefixed with `": "` when present.
        detail: String,
    },

    /// An external program could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// Program that failed to start.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// A filesystem operation failed.
    #[error("failed to {operation} {path}: {source}")]
    Io {
        /// Short description of what was being attempted.
        operation: &'static str,
        /// Path the operation was applied to.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A path could not be represented as UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the rejected path.
        path: String,
    },

    /// Another invocation holds the cache lock.
    #[error("cache directory {path} is in use by another export; retry when it finishes")]
    CacheBusy {
        /// Lock file that could not be acquired.
        path: Utf8PathBuf,
    },

    /// The configuration file or flags were invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// A pipeline stage failed.
    #[error("{stage} failed: {source}")]
    Stage {
        /// Stage that was running.
        stage: Stage,
        /// Error raised by the stage.
        #[source]
        source: Box<ExportError>,
    },

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Builds a closure that wraps an [`std::io::Error`] with the operation
    /// and path it applied to, for use with `map_err`.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use godot_export::error::ExportError;
    ///
    /// let path = Utf8Path::new("/nonexistent/file");
    /// let err = std::fs::read(path)
    ///     .map_err(ExportError::io("read", path))
    ///     .expect_err("reading a missing file fails");
    /// assert!(err.to_string().starts_with("failed to read /nonexistent/file"));
    /// ```
    pub fn io(
        operation: &'static str,
        path: impl Into<Utf8PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io {
            operation,
            path,
            source,
        }
    }

    /// Returns the innermost error, skipping any stage wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Formats captured process diagnostics for inclusion in an error message.
pub(crate) fn detail_suffix(captured: Option<&[u8]>) -> String {
    let Some(bytes) = captured else {
        return String::new();
    };
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Result type alias using [`ExportError`].
pub type Result<T> = std::result::Result<T, ExportError>;
