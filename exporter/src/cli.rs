//! CLI argument definitions for the Godot exporter.
//!
//! Kept apart from the entrypoint so behaviour tests can build arguments
//! with `Cli::try_parse_from` and drive the same code paths as the binary.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Provision a pinned Godot toolchain and export a project for the Web.
#[derive(Parser, Debug)]
#[command(name = "godot-export")]
#[command(version, about)]
#[command(long_about = concat!(
    "Provision a pinned Godot toolchain and export a project for the Web.\n\n",
    "The editor binary and export templates are downloaded once into a local ",
    "cache and reused on later runs. The exported entry document is patched so ",
    "the build still starts when the page is served without cross-origin ",
    "isolation headers.",
))]
#[command(after_help = concat!(
    "ENVIRONMENT:\n",
    "  GODOT_SKIP_EXPORT=1           Skip the export entirely\n",
    "  https_proxy / HTTPS_PROXY     Proxy used for downloads\n",
    "  RUST_LOG                      Override the log filter\n\n",
    "EXAMPLES:\n",
    "  Export ./godot to ./build/web:\n",
    "    $ godot-export\n\n",
    "  Use a release candidate toolchain:\n",
    "    $ godot-export --godot-version 4.3 --flavour rc1\n\n",
    "  Show what would be downloaded and run:\n",
    "    $ godot-export --dry-run\n\n",
    "  Inspect the cache as JSON:\n",
    "    $ godot-export status --json",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Export arguments (used when no subcommand is given).
    #[command(flatten)]
    pub export: ExportArgs,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Export the project (default when no subcommand given).
    Export(ExportArgs),

    /// Report cache and output state without changing anything.
    Status(StatusArgs),
}

/// Location and toolchain arguments shared by every subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Directory that relative paths resolve against [default: current directory].
    #[arg(long, value_name = "DIR")]
    pub root: Option<Utf8PathBuf>,

    /// Configuration file [default: <root>/godot-export.toml when present].
    #[arg(long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Godot project directory [default: godot].
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<Utf8PathBuf>,

    /// Export output directory; wiped on every export [default: build/web].
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<Utf8PathBuf>,

    /// Toolchain cache directory [default: .godot].
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Godot version number, e.g. 4.2.2 [default: 4.2.2].
    #[arg(long, value_name = "VERSION")]
    pub godot_version: Option<String>,

    /// Release flavour, e.g. stable, rc1, beta3 [default: stable].
    #[arg(long, value_name = "FLAVOUR")]
    pub flavour: Option<String>,

    /// Export preset name [default: Web].
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,
}

/// Arguments for the export command.
#[derive(Parser, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Shared location and toolchain arguments.
    #[command(flatten)]
    pub source: SourceArgs,

    /// Skip the export (same as GODOT_SKIP_EXPORT=1).
    #[arg(long)]
    pub skip: bool,

    /// Extract archives with the built-in zip reader instead of `unzip`.
    #[arg(long)]
    pub builtin_unzip: bool,

    /// Do not mirror templates into the user's Godot data directory.
    #[arg(long)]
    pub no_system_sync: bool,

    /// Show the resolved plan and exit without downloading or exporting.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress and tool output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

/// Arguments for the status command.
#[derive(Parser, Debug, Clone, Default)]
pub struct StatusArgs {
    /// Shared location and toolchain arguments.
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Return the export arguments in effect, honouring an explicit
    /// `export` subcommand.
    #[must_use]
    pub fn export_args(&self) -> &ExportArgs {
        match &self.command {
            Some(Command::Export(args)) => args,
            _ => &self.export,
        }
    }
}
