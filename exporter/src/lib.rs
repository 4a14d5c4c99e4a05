//! Godot Web export pipeline.
//!
//! Provisions a pinned Godot editor and its export templates into a local
//! cache, runs a headless Web export of a project, and patches the exported
//! entry document so it starts on hosts without cross-origin isolation.
//! Used by the `godot-export` binary and usable programmatically with
//! injected transports and command runners.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Layered, immutable run configuration
//! - [`dirs`] - Per-user directory resolution for the template mirror
//! - [`download`] - Idempotent release downloads with bounded redirects
//! - [`error`] - Error types for the pipeline
//! - [`export`] - Headless Web export
//! - [`extraction`] - Archive extraction via `unzip` or the `zip` crate
//! - [`layout`] - On-disk cache layout
//! - [`lock`] - Advisory lock guarding the cache root
//! - [`output`] - User-facing progress lines
//! - [`patch`] - Cross-origin isolation fallback patch
//! - [`pipeline`] - Stage orchestration
//! - [`platform`] - Host platform resolution
//! - [`process`] - External command execution
//! - [`status`] - Cache and output status report
//! - [`templates`] - Export template cache and system mirror
//! - [`toolchain`] - Editor binary cache
//! - [`version`] - Toolchain version identifiers

pub mod cli;
pub mod config;
pub mod dirs;
pub mod download;
pub mod error;
pub mod export;
pub mod extraction;
pub mod layout;
pub mod lock;
pub mod output;
pub mod patch;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod status;
pub mod templates;
pub mod toolchain;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
