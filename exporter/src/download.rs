//! Release asset download.
//!
//! [`Downloader::fetch`] is idempotent: an existing destination is returned
//! as-is without touching the network, which is what makes the on-disk cache
//! work. Redirects are followed by an explicit loop bounded by
//! `max_redirects`, and a body that fails mid-stream never leaves a partial
//! file behind. The HTTP layer is the [`HttpTransport`] trait so tests can
//! count requests and script responses.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Redirects followed before giving up.
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

/// Connection timeout for release downloads. The body itself is unbounded
/// because template bundles run to hundreds of megabytes.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variables consulted for a proxy, in order.
const PROXY_VARIABLES: [&str; 2] = ["https_proxy", "HTTPS_PROXY"];

/// Errors arising from download operations.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The server answered with a non-success, non-redirect status.
    #[error("download failed for {url}: status {status}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The redirect chain exceeded the configured limit.
    #[error("download failed for {url}: more than {limit} redirects")]
    TooManyRedirects {
        /// The URL the chain started from.
        url: String,
        /// Maximum number of redirects allowed.
        limit: u32,
    },

    /// A redirect pointed at a location that is not a valid URL.
    #[error("download failed for {url}: invalid redirect to \"{location}\": {reason}")]
    InvalidRedirect {
        /// The URL that issued the redirect.
        url: String,
        /// The raw `Location` header.
        location: String,
        /// Parse failure description.
        reason: String,
    },

    /// The request could not be completed.
    #[error("download failed for {url}: {reason}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The proxy URL taken from the environment is unusable.
    #[error("invalid proxy {proxy}: {reason}")]
    InvalidProxy {
        /// The proxy URL.
        proxy: String,
        /// Description of the problem.
        reason: String,
    },

    /// The response body failed while being written to disk.
    #[error("download of {url} interrupted: {source}")]
    Stream {
        /// The URL being streamed.
        url: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A local file or directory could not be prepared.
    #[error("I/O error preparing {}: {source}", path.display())]
    Io {
        /// Path that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// A response head plus a streaming body.
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Location` header, if present.
    pub location: Option<String>,
    /// Response body.
    pub body: Box<dyn Read>,
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Issues a single GET without following redirects.
pub trait HttpTransport {
    /// Request `url` and return the raw response.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Transport`] when no response was received.
    /// Non-success statuses are returned as responses, not errors.
    fn get(&self, url: &str) -> Result<HttpResponse, DownloadError>;
}

/// [`HttpTransport`] backed by `ureq`.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Build a transport, optionally tunnelling through `proxy`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidProxy`] if `proxy` cannot be parsed.
    pub fn new(proxy: Option<&str>) -> Result<Self, DownloadError> {
        let proxy = proxy
            .map(|uri| {
                ureq::Proxy::new(uri).map_err(|err| DownloadError::InvalidProxy {
                    proxy: uri.to_owned(),
                    reason: err.to_string(),
                })
            })
            .transpose()?;
        let config = ureq::Agent::config_builder()
            .timeout_connect(Some(CONNECT_TIMEOUT))
            .max_redirects(0)
            .http_status_as_error(false)
            .proxy(proxy)
            .build();
        Ok(Self {
            agent: ureq::Agent::new_with_config(config),
        })
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, DownloadError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|err| DownloadError::Transport {
                url: url.to_owned(),
                reason: err.to_string(),
            })?;
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get("location")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        Ok(HttpResponse {
            status,
            location,
            body: Box::new(response.into_body().into_reader()),
        })
    }
}

/// How a fetch was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The destination already existed; no request was made.
    Cached,
    /// The body was downloaded.
    Downloaded {
        /// URL the body was finally served from.
        url: String,
        /// Bytes written.
        bytes: u64,
    },
}

/// Idempotent downloader with bounded redirect following.
pub struct Downloader {
    transport: Box<dyn HttpTransport>,
    max_redirects: u32,
}

impl Downloader {
    /// Create a downloader over `transport`.
    #[must_use]
    pub fn new(transport: Box<dyn HttpTransport>, max_redirects: u32) -> Self {
        Self {
            transport,
            max_redirects,
        }
    }

    /// Create a `ureq`-backed downloader, using a proxy from the
    /// environment when one is set.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidProxy`] if the proxy URL is invalid.
    pub fn from_env(max_redirects: u32) -> Result<Self, DownloadError> {
        let proxy = proxy_from_env(|name| std::env::var(name).ok());
        if let Some(proxy) = proxy.as_deref() {
            log::debug!("downloading through proxy {proxy}");
        }
        let transport = UreqTransport::new(proxy.as_deref())?;
        Ok(Self::new(Box::new(transport), max_redirects))
    }

    /// Download `url` to `destination` unless `destination` already exists.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Status`] for a non-2xx final response,
    /// [`DownloadError::TooManyRedirects`] once the redirect limit is
    /// exceeded, [`DownloadError::Stream`] if the body fails mid-transfer
    /// (after removing the partial file), and other variants for transport
    /// or local I/O failures.
    pub fn fetch(&self, url: &str, destination: &Path) -> Result<FetchOutcome, DownloadError> {
        if destination.exists() {
            log::debug!("{} already present; skipping download", destination.display());
            return Ok(FetchOutcome::Cached);
        }

        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent).map_err(|source| DownloadError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut current = url.to_owned();
        let mut followed = 0;
        loop {
            log::info!("downloading {current}");
            let response = self.transport.get(&current)?;

            if let (true, Some(location)) = (is_redirect(response.status), &response.location) {
                if followed == self.max_redirects {
                    return Err(DownloadError::TooManyRedirects {
                        url: url.to_owned(),
                        limit: self.max_redirects,
                    });
                }
                followed += 1;
                let next = resolve_location(&current, location)?;
                log::debug!("{current} redirected ({}) to {next}", response.status);
                current = next;
                continue;
            }

            if !(200..300).contains(&response.status) {
                return Err(DownloadError::Status {
                    url: current,
                    status: response.status,
                });
            }

            let bytes = stream_to_file(response.body, destination, &current)?;
            return Ok(FetchOutcome::Downloaded {
                url: current,
                bytes,
            });
        }
    }
}

/// Build the URL of a release asset.
///
/// # Examples
///
/// ```
/// use godot_export::download::asset_url;
///
/// assert_eq!(
///     asset_url("https://example.test/download/", "4.2.2-stable", "a.zip"),
///     "https://example.test/download/4.2.2-stable/a.zip"
/// );
/// ```
#[must_use]
pub fn asset_url(base: &str, tag: &str, file: &str) -> String {
    format!("{}/{tag}/{file}", base.trim_end_matches('/'))
}

/// Pick a proxy URL from the environment, preferring `https_proxy` over
/// `HTTPS_PROXY`. Empty values are ignored.
///
/// # Examples
///
/// ```
/// use godot_export::download::proxy_from_env;
///
/// let proxy = proxy_from_env(|name| {
///     (name == "HTTPS_PROXY").then(|| "http://proxy:3128".to_owned())
/// });
/// assert_eq!(proxy.as_deref(), Some("http://proxy:3128"));
/// ```
pub fn proxy_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    PROXY_VARIABLES
        .iter()
        .find_map(|name| lookup(name).filter(|value| !value.is_empty()))
}

fn is_redirect(status: u16) -> bool {
    (300..400).contains(&status)
}

fn resolve_location(base: &str, location: &str) -> Result<String, DownloadError> {
    let invalid = |reason: String| DownloadError::InvalidRedirect {
        url: base.to_owned(),
        location: location.to_owned(),
        reason,
    };
    let base_url = Url::parse(base).map_err(|err| invalid(err.to_string()))?;
    base_url
        .join(location)
        .map(String::from)
        .map_err(|err| invalid(err.to_string()))
}

fn stream_to_file(
    mut body: Box<dyn Read>,
    destination: &Path,
    url: &str,
) -> Result<u64, DownloadError> {
    let mut file = File::create(destination).map_err(|source| DownloadError::Io {
        path: destination.to_path_buf(),
        source,
    })?;

    let copied = std::io::copy(&mut body, &mut file).and_then(|bytes| {
        file.sync_all()?;
        Ok(bytes)
    });

    match copied {
        Ok(bytes) => Ok(bytes),
        Err(source) => {
            drop(file);
            if let Err(err) = std::fs::remove_file(destination) {
                log::warn!(
                    "failed to remove partial download {}: {err}",
                    destination.display()
                );
            }
            Err(DownloadError::Stream {
                url: url.to_owned(),
                source,
            })
        }
    }
}
