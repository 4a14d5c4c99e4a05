//! Host platform resolution for Godot release archives.
//!
//! Godot publishes one editor archive per desktop OS. This module maps a host
//! identifier to the archive name and the binary's location inside the
//! extracted tree. Hosts without a published editor resolve to `None`, which
//! callers treat as "skip the export", not as an error.

use crate::version::ToolchainVersion;
use serde::Serialize;
use std::fmt;

/// Desktop operating systems that Godot ships editor binaries for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    /// Linux on `x86_64`.
    Linux,
    /// macOS (universal binary).
    Macos,
    /// Windows on `x86_64`.
    Windows,
}

impl HostOs {
    /// Parse a host identifier.
    ///
    /// Accepts Rust's `std::env::consts::OS` spellings as well as the
    /// `darwin`/`win32` aliases used by other build tooling.
    ///
    /// # Examples
    ///
    /// ```
    /// use godot_export::platform::HostOs;
    ///
    /// assert_eq!(HostOs::from_identifier("darwin"), Some(HostOs::Macos));
    /// assert_eq!(HostOs::from_identifier("freebsd"), None);
    /// ```
    #[must_use]
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier {
            "linux" => Some(Self::Linux),
            "macos" | "darwin" => Some(Self::Macos),
            "windows" | "win32" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Return the canonical identifier for this OS.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Windows => "windows",
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-OS description of the Godot editor release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformProfile {
    os: HostOs,
    archive: String,
    binary: String,
}

impl PlatformProfile {
    /// Build the profile for `os` at `version`.
    #[must_use]
    pub fn for_os(os: HostOs, version: &ToolchainVersion) -> Self {
        let tag = version.release_tag();
        let (archive, binary) = match os {
            HostOs::Linux => (
                format!("Godot_v{tag}_linux.x86_64.zip"),
                format!("Godot_v{tag}_linux.x86_64"),
            ),
            HostOs::Macos => (
                format!("Godot_v{tag}_macos.universal.zip"),
                "Godot.app/Contents/MacOS/Godot".to_owned(),
            ),
            HostOs::Windows => (
                format!("Godot_v{tag}_win64.exe.zip"),
                format!("Godot_v{tag}_win64.exe"),
            ),
        };
        Self {
            os,
            archive,
            binary,
        }
    }

    /// Return the operating system this profile targets.
    #[must_use]
    pub fn os(&self) -> HostOs {
        self.os
    }

    /// Return the release archive file name.
    #[must_use]
    pub fn archive(&self) -> &str {
        &self.archive
    }

    /// Return the binary path relative to the extraction directory.
    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Return true when the profile targets Windows.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == HostOs::Windows
    }
}

/// Resolve the release profile for a host identifier.
///
/// Returns `None` for hosts Godot does not publish an editor for.
///
/// # Examples
///
/// ```
/// use godot_export::platform::resolve_platform;
/// use godot_export::version::ToolchainVersion;
///
/// let version = ToolchainVersion::new("4.2.2", "stable").expect("valid version");
/// let profile = resolve_platform("linux", &version).expect("linux is supported");
/// assert_eq!(profile.archive(), "Godot_v4.2.2-stable_linux.x86_64.zip");
/// assert!(resolve_platform("haiku", &version).is_none());
/// ```
#[must_use]
pub fn resolve_platform(host: &str, version: &ToolchainVersion) -> Option<PlatformProfile> {
    HostOs::from_identifier(host).map(|os| PlatformProfile::for_os(os, version))
}
