//! Cross-origin isolation fallback for the exported entry document.
//!
//! Godot's Web shell refuses to start when the browser reports
//! `SharedArrayBuffer` or cross-origin isolation as missing, which is the
//! case on any host that does not send COOP/COEP headers. The patch filters
//! those two features out of the startup check so the page falls back to a
//! single-threaded engine and logs a console warning instead.
//!
//! Patching is idempotent: a document already containing the filtering
//! variant is left byte-for-byte unchanged.

use crate::error::{ExportError, Result};
use camino::Utf8Path;
use regex::{NoExpand, Regex};
use std::sync::LazyLock;

/// Marker present only in a patched document.
pub const PATCH_MARKER: &str = "const missingAll = Engine.getMissingFeatures();";

static MISSING_FEATURES_CHECK: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\tconst missing = Engine\.getMissingFeatures\(\);\r?\n").ok()
});

const REPLACEMENT_LINES: [&str; 8] = [
    "\tconst missingAll = Engine.getMissingFeatures();",
    "\tconst missing = missingAll.filter((feature) => {",
    "\t\treturn !feature.startsWith('Cross Origin Isolation') && !feature.startsWith('SharedArrayBuffer');",
    "\t});",
    "\tif (missing.length !== missingAll.length) {",
    "\t\tconsole.warn('Running without SharedArrayBuffer or cross-origin isolation; falling back to single-threaded Godot.');",
    "\t}",
    "",
];

/// What [`patch_entry_document`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The entry document does not exist.
    MissingEntry,
    /// The document already carries the patch.
    AlreadyPatched,
    /// The startup feature check was not found.
    SnippetNotFound,
    /// The document was rewritten.
    Patched,
}

/// Rewrite the startup feature check in `html`.
///
/// Returns `None` when the document is already patched or the check cannot
/// be found; callers distinguish the two with [`is_patched`].
///
/// # Examples
///
/// ```
/// use godot_export::patch::{is_patched, patch_html};
///
/// let html = "<script>\n\tconst missing = Engine.getMissingFeatures();\n</script>\n";
/// let patched = patch_html(html).expect("check present");
/// assert!(is_patched(&patched));
/// assert!(patch_html(&patched).is_none());
/// ```
#[must_use]
pub fn patch_html(html: &str) -> Option<String> {
    if is_patched(html) {
        return None;
    }
    let check = MISSING_FEATURES_CHECK.as_ref()?;
    if !check.is_match(html) {
        return None;
    }
    let newline = if html.contains("\r\n") { "\r\n" } else { "\n" };
    let replacement = REPLACEMENT_LINES.join(newline);
    Some(check.replacen(html, 1, NoExpand(&replacement)).into_owned())
}

/// Return true when `html` already carries the patch.
#[must_use]
pub fn is_patched(html: &str) -> bool {
    html.contains(PATCH_MARKER)
}

/// Patch the entry document at `path` in place.
///
/// # Errors
///
/// Returns [`ExportError::Io`] if the document exists but cannot be read or
/// written.
///
/// Invalid UTF-8 is decoded lossily; a patched document is written back as
/// UTF-8.
pub fn patch_entry_document(path: &Utf8Path) -> Result<PatchOutcome> {
    if !path.exists() {
        return Ok(PatchOutcome::MissingEntry);
    }
    let bytes = std::fs::read(path).map_err(ExportError::io("read", path))?;
    let html = String::from_utf8_lossy(&bytes);
    if is_patched(&html) {
        return Ok(PatchOutcome::AlreadyPatched);
    }
    let Some(patched) = patch_html(&html) else {
        return Ok(PatchOutcome::SnippetNotFound);
    };
    std::fs::write(path, patched).map_err(ExportError::io("write", path))?;
    Ok(PatchOutcome::Patched)
}

/// Patch the entry document named `entry` inside `output_dir`.
///
/// # Errors
///
/// See [`patch_entry_document`].
pub fn patch_for_isolation(output_dir: &Utf8Path, entry: &str) -> Result<PatchOutcome> {
    patch_entry_document(&output_dir.join(entry))
}
