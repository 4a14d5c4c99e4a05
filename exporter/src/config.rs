//! Layered run configuration.
//!
//! Built-in defaults are overlaid by an optional `godot-export.toml`, then
//! by command-line flags, then by the environment. The result is an
//! immutable [`ExportConfig`] that every component borrows; nothing reads
//! configuration from globals after start-up.

use crate::cli::SourceArgs;
use crate::download::{DEFAULT_MAX_REDIRECTS, asset_url};
use crate::error::{ExportError, Result};
use crate::export::ExportJob;
use crate::layout::CacheLayout;
use crate::platform::HostOs;
use crate::version::{DEFAULT_FLAVOUR, ToolchainVersion};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Configuration file looked up in the root directory.
pub const CONFIG_FILENAME: &str = "godot-export.toml";

/// Environment variable that skips the export when set to `1`.
pub const SKIP_ENV: &str = "GODOT_SKIP_EXPORT";

/// Godot version provisioned when none is configured.
pub const DEFAULT_GODOT_VERSION: &str = "4.2.2";

/// Where Godot release assets are published.
pub const DEFAULT_RELEASE_BASE_URL: &str = "https://github.com/godotengine/godot/releases/download";

const DEFAULT_PROJECT_DIR: &str = "godot";
const DEFAULT_OUTPUT_DIR: &str = "build/web";
const DEFAULT_CACHE_DIR: &str = ".godot";
const DEFAULT_PRESET: &str = "Web";
const DEFAULT_ENTRY: &str = "index.html";
const MAX_REDIRECT_CEILING: u32 = 50;

/// Which extractor unpacks release archives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    /// The external `unzip` utility.
    #[default]
    Unzip,
    /// The built-in `zip` crate reader.
    Builtin,
}

/// Contents of `godot-export.toml`. Every key is optional.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Godot version number.
    pub godot_version: Option<String>,
    /// Release flavour.
    pub flavour: Option<String>,
    /// Project directory, relative to the root.
    pub project_dir: Option<String>,
    /// Output directory, relative to the root.
    pub output_dir: Option<String>,
    /// Cache directory, relative to the root.
    pub cache_dir: Option<String>,
    /// Export preset name.
    pub preset: Option<String>,
    /// Entry document file name inside the output directory.
    pub entry: Option<String>,
    /// Base URL for release downloads.
    pub release_base_url: Option<String>,
    /// Maximum redirects followed per download.
    pub max_redirects: Option<u32>,
    /// Archive extractor.
    pub extractor: Option<ExtractorKind>,
    /// Mirror templates into the user's Godot data directory.
    pub system_sync: Option<bool>,
}

impl FileConfig {
    /// Parse configuration from TOML text. `origin` names the source in
    /// error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidConfig`] for malformed TOML or unknown
    /// keys.
    pub fn parse(source: &str, origin: &Utf8Path) -> Result<Self> {
        toml::from_str(source).map_err(|err| ExportError::InvalidConfig {
            reason: format!("{origin}: {err}"),
        })
    }

    /// Read and parse `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] if the file cannot be read, or
    /// [`ExportError::InvalidConfig`] if it does not parse.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let source =
            std::fs::read_to_string(path).map_err(ExportError::io("read config file", path))?;
        Self::parse(&source, path)
    }
}

/// Run flags that only exist on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunFlags {
    /// `--skip` was passed.
    pub skip: bool,
    /// `--builtin-unzip` was passed.
    pub builtin_unzip: bool,
    /// `--no-system-sync` was passed.
    pub no_system_sync: bool,
    /// `--quiet` was passed.
    pub quiet: bool,
}

/// Fully resolved, immutable configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Directory relative paths were resolved against.
    pub root: Utf8PathBuf,
    /// Godot project directory.
    pub project_dir: Utf8PathBuf,
    /// Export output directory.
    pub output_dir: Utf8PathBuf,
    /// Toolchain cache root.
    pub cache_dir: Utf8PathBuf,
    /// Toolchain to provision.
    pub version: ToolchainVersion,
    /// Export preset name.
    pub preset: String,
    /// Entry document file name.
    pub entry: String,
    /// Base URL for release downloads.
    pub release_base_url: String,
    /// Maximum redirects followed per download.
    pub max_redirects: u32,
    /// Archive extractor.
    pub extractor: ExtractorKind,
    /// Mirror templates into the user's Godot data directory.
    pub system_sync: bool,
    /// Skip requested by flag or environment.
    pub skip: bool,
    /// Suppress progress and capture tool output.
    pub quiet: bool,
    /// Host operating system, if Godot publishes an editor for it.
    pub host: Option<HostOs>,
}

impl ExportConfig {
    /// Defaults for a project rooted at `root`, on the current host.
    #[must_use]
    pub fn with_defaults(root: impl Into<Utf8PathBuf>) -> Self {
        let root = root.into();
        Self {
            project_dir: root.join(DEFAULT_PROJECT_DIR),
            output_dir: root.join(DEFAULT_OUTPUT_DIR),
            cache_dir: root.join(DEFAULT_CACHE_DIR),
            root,
            version: default_version(),
            preset: DEFAULT_PRESET.to_owned(),
            entry: DEFAULT_ENTRY.to_owned(),
            release_base_url: DEFAULT_RELEASE_BASE_URL.to_owned(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            extractor: ExtractorKind::default(),
            system_sync: true,
            skip: false,
            quiet: false,
            host: HostOs::from_identifier(std::env::consts::OS),
        }
    }

    /// Resolve configuration from the current directory, config file,
    /// flags, and process environment.
    ///
    /// # Errors
    ///
    /// See [`Self::resolve_with`].
    pub fn resolve(args: &SourceArgs, flags: RunFlags) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(ExportError::io("read", "current directory"))?;
        let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|path| ExportError::NonUtf8Path {
            path: path.display().to_string(),
        })?;
        Self::resolve_with(args, flags, &cwd, |name| std::env::var(name).ok())
    }

    /// Resolve configuration against `cwd` with an injectable environment.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidConfig`] for an invalid version,
    /// preset, entry, URL, or redirect limit, and for a config file that
    /// does not parse. Returns [`ExportError::Io`] when an explicitly named
    /// config file cannot be read.
    pub fn resolve_with(
        args: &SourceArgs,
        flags: RunFlags,
        cwd: &Utf8Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let root = args
            .root
            .as_deref()
            .map_or_else(|| cwd.to_owned(), |root| absolutise(cwd, root));
        let file = load_file_config(args.config.as_deref(), &root, cwd)?;
        let mut config = Self::with_defaults(root);

        config.apply_file(&file)?;
        config.apply_args(args)?;

        config.skip = flags.skip || env(SKIP_ENV).as_deref() == Some("1");
        config.quiet = flags.quiet;
        if flags.builtin_unzip {
            config.extractor = ExtractorKind::Builtin;
        }
        if flags.no_system_sync {
            config.system_sync = false;
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: &FileConfig) -> Result<()> {
        if file.godot_version.is_some() || file.flavour.is_some() {
            self.version = ToolchainVersion::new(
                file.godot_version
                    .as_deref()
                    .unwrap_or(self.version.number()),
                file.flavour.as_deref().unwrap_or(self.version.flavour()),
            )?;
        }
        if let Some(dir) = &file.project_dir {
            self.project_dir = absolutise(&self.root, Utf8Path::new(dir));
        }
        if let Some(dir) = &file.output_dir {
            self.output_dir = absolutise(&self.root, Utf8Path::new(dir));
        }
        if let Some(dir) = &file.cache_dir {
            self.cache_dir = absolutise(&self.root, Utf8Path::new(dir));
        }
        if let Some(preset) = &file.preset {
            self.preset.clone_from(preset);
        }
        if let Some(entry) = &file.entry {
            self.entry.clone_from(entry);
        }
        if let Some(url) = &file.release_base_url {
            self.release_base_url.clone_from(url);
        }
        if let Some(limit) = file.max_redirects {
            self.max_redirects = limit;
        }
        if let Some(extractor) = file.extractor {
            self.extractor = extractor;
        }
        if let Some(sync) = file.system_sync {
            self.system_sync = sync;
        }
        Ok(())
    }

    fn apply_args(&mut self, args: &SourceArgs) -> Result<()> {
        if args.godot_version.is_some() || args.flavour.is_some() {
            self.version = ToolchainVersion::new(
                args.godot_version
                    .as_deref()
                    .unwrap_or(self.version.number()),
                args.flavour.as_deref().unwrap_or(self.version.flavour()),
            )?;
        }
        if let Some(dir) = &args.project_dir {
            self.project_dir = absolutise(&self.root, dir);
        }
        if let Some(dir) = &args.output_dir {
            self.output_dir = absolutise(&self.root, dir);
        }
        if let Some(dir) = &args.cache_dir {
            self.cache_dir = absolutise(&self.root, dir);
        }
        if let Some(preset) = &args.preset {
            self.preset.clone_from(preset);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(ExportError::InvalidConfig {
                reason: reason.to_owned(),
            })
        };
        if self.preset.trim().is_empty() {
            return invalid("export preset must not be empty");
        }
        if matches!(self.entry.as_str(), "" | "." | "..") || self.entry.contains(['/', '\\']) {
            return invalid("entry must be a plain file name");
        }
        self.validate_output_dir()?;
        if self.max_redirects == 0 || self.max_redirects > MAX_REDIRECT_CEILING {
            return Err(ExportError::InvalidConfig {
                reason: format!("max_redirects must be between 1 and {MAX_REDIRECT_CEILING}"),
            });
        }
        if let Err(err) = url::Url::parse(&self.release_base_url) {
            return Err(ExportError::InvalidConfig {
                reason: format!("release_base_url {}: {err}", self.release_base_url),
            });
        }
        Ok(())
    }

    /// The output directory is wiped on every export, so it must not be, or
    /// contain, the project, the cache, or the root.
    fn validate_output_dir(&self) -> Result<()> {
        let output = normalise(&self.output_dir);
        let protected = [
            ("project directory", &self.project_dir),
            ("cache directory", &self.cache_dir),
            ("root directory", &self.root),
        ];
        for (name, dir) in protected {
            if normalise(dir).starts_with(&output) {
                return Err(ExportError::InvalidConfig {
                    reason: format!(
                        "output_dir {} would remove the {name} {dir}",
                        self.output_dir
                    ),
                });
            }
        }
        Ok(())
    }

    /// Return the cache layout rooted at [`Self::cache_dir`].
    #[must_use]
    pub fn layout(&self) -> CacheLayout {
        CacheLayout::new(self.cache_dir.clone())
    }

    /// Return the export job described by this configuration.
    #[must_use]
    pub fn export_job(&self) -> ExportJob {
        ExportJob {
            project_dir: self.project_dir.clone(),
            output_dir: self.output_dir.clone(),
            entry: self.entry.clone(),
            preset: self.preset.clone(),
        }
    }

    /// Return the download URL for a release asset of the configured
    /// version.
    #[must_use]
    pub fn asset_url(&self, file: &str) -> String {
        asset_url(&self.release_base_url, self.version.release_tag(), file)
    }
}

fn default_version() -> ToolchainVersion {
    ToolchainVersion::from_parts(DEFAULT_GODOT_VERSION, DEFAULT_FLAVOUR)
}

fn absolutise(base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_owned()
    } else {
        base.join(path)
    }
}

/// Resolve `.` and `..` lexically so overlapping paths compare equal.
fn normalise(path: &Utf8Path) -> Utf8PathBuf {
    let mut normalised = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                normalised.pop();
            }
            other => normalised.push(other.as_str()),
        }
    }
    normalised
}

fn load_file_config(
    explicit: Option<&Utf8Path>,
    root: &Utf8Path,
    cwd: &Utf8Path,
) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return FileConfig::load(&absolutise(cwd, path));
    }
    let implicit = root.join(CONFIG_FILENAME);
    if implicit.is_file() {
        log::debug!("loading configuration from {implicit}");
        FileConfig::load(&implicit)
    } else {
        Ok(FileConfig::default())
    }
}
