//! User-facing progress output.
//!
//! Progress lines go to stderr with a `[godot]` prefix so they read the same
//! whether the exporter runs standalone or inside a larger build script.
//! Diagnostics meant for debugging go through `log` instead.

use std::io::Write;

/// Prefix applied to every progress line.
pub const PREFIX: &str = "[godot]";

/// Progress sink honouring `--quiet`.
pub struct Progress<'a> {
    out: &'a mut dyn Write,
    quiet: bool,
}

impl<'a> Progress<'a> {
    /// Wrap `out`; when `quiet` is set nothing is written.
    pub fn new(out: &'a mut dyn Write, quiet: bool) -> Self {
        Self { out, quiet }
    }

    /// Report the start or completion of a step.
    pub fn step(&mut self, message: impl std::fmt::Display) {
        if !self.quiet {
            write_stderr_line(self.out, format!("{PREFIX} {message}"));
        }
    }

    /// Report a non-fatal condition. Also logged at warn level.
    pub fn warn(&mut self, message: impl std::fmt::Display) {
        log::warn!("{message}");
        if !self.quiet {
            write_stderr_line(self.out, format!("{PREFIX} warning: {message}"));
        }
    }
}

/// Writes a line to `stderr`, ignoring failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}
