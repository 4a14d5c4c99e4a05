//! Godot toolchain version newtype.
//!
//! Godot publishes releases under a tag of the form `{version}-{flavour}`
//! (for example `4.2.2-stable` or `4.3-rc1`), while the export templates it
//! ships install into a directory named `{version}.{flavour}`. Both are
//! derived here once so every component agrees on the spelling.

use crate::error::{ExportError, Result};
use serde::Serialize;
use std::fmt;

/// Release flavour used when none is configured.
pub const DEFAULT_FLAVOUR: &str = "stable";

/// A validated Godot release version plus its flavour.
///
/// # Examples
///
/// ```
/// use godot_export::version::ToolchainVersion;
///
/// let version = ToolchainVersion::new("4.2.2", "stable").expect("valid version");
/// assert_eq!(version.release_tag(), "4.2.2-stable");
/// assert_eq!(version.template_version(), "4.2.2.stable");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ToolchainVersion {
    number: String,
    flavour: String,
    release_tag: String,
    template_version: String,
}

impl ToolchainVersion {
    /// Validate `number` and `flavour` and derive the release identifiers.
    ///
    /// `number` must be two or three dot-separated decimal components
    /// (`4.3`, `4.2.2`). `flavour` must be non-empty ASCII alphanumerics
    /// (`stable`, `rc1`, `beta3`).
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidConfig`] when either part is malformed.
    pub fn new(number: &str, flavour: &str) -> Result<Self> {
        validate_number(number)?;
        validate_flavour(flavour)?;
        Ok(Self::from_parts(number, flavour))
    }

    /// Build from constants that are known to be well formed.
    pub(crate) fn from_parts(number: &str, flavour: &str) -> Self {
        Self {
            number: number.to_owned(),
            flavour: flavour.to_owned(),
            release_tag: format!("{number}-{flavour}"),
            template_version: format!("{number}.{flavour}"),
        }
    }

    /// Return the numeric version, e.g. `4.2.2`.
    #[must_use]
    pub fn number(&self) -> &str {
        &self.number
    }

    /// Return the release flavour, e.g. `stable`.
    #[must_use]
    pub fn flavour(&self) -> &str {
        &self.flavour
    }

    /// Return the release tag used in download URLs and archive names.
    #[must_use]
    pub fn release_tag(&self) -> &str {
        &self.release_tag
    }

    /// Return the directory name the export templates install under.
    #[must_use]
    pub fn template_version(&self) -> &str {
        &self.template_version
    }

    /// Return the file name of the export template bundle.
    #[must_use]
    pub fn templates_archive(&self) -> String {
        format!("Godot_v{}_export_templates.tpz", self.release_tag)
    }
}

impl fmt::Display for ToolchainVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.release_tag)
    }
}

fn validate_number(number: &str) -> Result<()> {
    let components: Vec<&str> = number.split('.').collect();
    let well_formed = (2..=3).contains(&components.len())
        && components
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
    if well_formed {
        Ok(())
    } else {
        Err(ExportError::InvalidConfig {
            reason: format!("Godot version \"{number}\" must look like 4.3 or 4.2.2"),
        })
    }
}

fn validate_flavour(flavour: &str) -> Result<()> {
    if flavour.is_empty() {
        return Err(ExportError::InvalidConfig {
            reason: "release flavour must not be empty".to_owned(),
        });
    }
    if let Some(bad) = flavour.chars().find(|c| !c.is_ascii_alphanumeric()) {
        return Err(ExportError::InvalidConfig {
            reason: format!("invalid character '{bad}' in release flavour \"{flavour}\""),
        });
    }
    Ok(())
}
