//! Shared test utilities for the exporter crate.
//!
//! Exposed to integration tests through the `test-support` feature.

use crate::download::{DownloadError, HttpResponse, HttpTransport};
use crate::extraction::extract_zip;
use crate::process::{CommandOutcome, CommandRunner, CommandSpec};
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read, Write};
use std::process::ExitStatus;
use std::rc::Rc;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Canned response served by [`StubTransport`].
#[derive(Debug, Clone)]
pub enum StubResponse {
    /// Serve `status` with `body`.
    Body {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: Vec<u8>,
    },
    /// Redirect to `location`.
    Redirect {
        /// 3xx status code.
        status: u16,
        /// `Location` header value.
        location: String,
    },
    /// Serve 200 with a body that fails after yielding `prefix`.
    BrokenBody {
        /// Bytes delivered before the failure.
        prefix: Vec<u8>,
    },
}

impl StubResponse {
    /// A 200 response carrying `body`.
    pub fn ok(body: &[u8]) -> Self {
        Self::Body {
            status: 200,
            body: body.to_vec(),
        }
    }

    /// An empty response with `status`.
    pub fn status(status: u16) -> Self {
        Self::Body {
            status,
            body: Vec::new(),
        }
    }

    /// A redirect response.
    pub fn redirect(status: u16, location: &str) -> Self {
        Self::Redirect {
            status,
            location: location.to_owned(),
        }
    }

    /// A 200 response whose body errors after `prefix`.
    pub fn broken_body(prefix: &[u8]) -> Self {
        Self::BrokenBody {
            prefix: prefix.to_vec(),
        }
    }
}

#[derive(Debug, Default)]
struct TransportState {
    routes: HashMap<String, StubResponse>,
    requests: Vec<String>,
}

/// Routing [`HttpTransport`] that records every request.
///
/// Clones share state, so a test can hand one clone to a
/// [`crate::download::Downloader`] and inspect requests through another.
/// Unrouted URLs fail with [`DownloadError::Transport`].
#[derive(Debug, Clone, Default)]
pub struct StubTransport {
    state: Rc<RefCell<TransportState>>,
}

impl StubTransport {
    /// Creates a transport with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `response` for `url`.
    #[must_use]
    pub fn route(self, url: &str, response: StubResponse) -> Self {
        self.state
            .borrow_mut()
            .routes
            .insert(url.to_owned(), response);
        self
    }

    /// Returns how many requests were issued.
    pub fn request_count(&self) -> usize {
        self.state.borrow().requests.len()
    }

    /// Returns the requested URLs in order.
    pub fn requested_urls(&self) -> Vec<String> {
        self.state.borrow().requests.clone()
    }
}

impl HttpTransport for StubTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, DownloadError> {
        let mut state = self.state.borrow_mut();
        state.requests.push(url.to_owned());
        let response = state
            .routes
            .get(url)
            .cloned()
            .ok_or_else(|| DownloadError::Transport {
                url: url.to_owned(),
                reason: "no stub route".to_owned(),
            })?;
        Ok(match response {
            StubResponse::Body { status, body } => HttpResponse {
                status,
                location: None,
                body: Box::new(Cursor::new(body)),
            },
            StubResponse::Redirect { status, location } => HttpResponse {
                status,
                location: Some(location),
                body: Box::new(io::empty()),
            },
            StubResponse::BrokenBody { prefix } => HttpResponse {
                status: 200,
                location: None,
                body: Box::new(BrokenReader {
                    prefix: Cursor::new(prefix),
                }),
            },
        })
    }
}

struct BrokenReader {
    prefix: Cursor<Vec<u8>>,
}

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.prefix.read(buf)? {
            0 => Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )),
            read => Ok(read),
        }
    }
}

type Handler = Box<dyn Fn(&CommandSpec) -> io::Result<CommandOutcome>>;

/// [`CommandRunner`] that records commands and answers through a handler.
pub struct StubRunner {
    handler: Handler,
    calls: RefCell<Vec<CommandSpec>>,
}

impl StubRunner {
    /// Creates a runner answering every command with `handler`.
    pub fn new(handler: impl Fn(&CommandSpec) -> io::Result<CommandOutcome> + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Creates a runner answering every command with `code`.
    pub fn exiting(code: i32) -> Self {
        Self::new(move |_| Ok(outcome(code)))
    }

    /// Creates a runner that behaves like the real tools.
    ///
    /// `unzip -oq <archive> -d <dest>` unpacks the archive with the
    /// built-in extractor. Any other program is treated as the Godot editor:
    /// the final argument is the export target, which is written with
    /// `entry_html`.
    pub fn simulated(entry_html: &str) -> Self {
        let entry_html = entry_html.to_owned();
        Self::new(move |command| {
            let args: Vec<String> = command
                .get_args()
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect();
            if command.program() == std::path::Path::new("unzip") {
                let (Some(archive), Some(dest)) = (args.get(1), args.get(3)) else {
                    return Ok(outcome(10));
                };
                return match extract_zip(Utf8Path::new(archive), Utf8Path::new(dest)) {
                    Ok(()) => Ok(outcome(0)),
                    Err(_) => Ok(outcome(9)),
                };
            }
            if let Some(target) = args.last() {
                std::fs::write(target, &entry_html)?;
            }
            Ok(outcome(0))
        })
    }

    /// Returns the recorded commands.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Returns the programs of the recorded commands.
    pub fn programs(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|call| call.program().display().to_string())
            .collect()
    }
}

impl CommandRunner for StubRunner {
    fn run(&self, command: &CommandSpec) -> io::Result<CommandOutcome> {
        self.calls.borrow_mut().push(command.clone());
        (self.handler)(command)
    }
}

/// Creates a non-capturing outcome with `code`.
pub fn outcome(code: i32) -> CommandOutcome {
    CommandOutcome {
        status: exit_status(code),
        stdout: None,
        stderr: None,
    }
}

/// Builds a zip archive in memory. Names ending in `/` become directories.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use zip::write::SimpleFileOptions;

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().unix_permissions(0o644);
    for (name, contents) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, options)
                .expect("add zip directory");
        } else {
            writer.start_file(*name, options).expect("start zip entry");
            writer.write_all(contents).expect("write zip entry");
        }
    }
    writer.finish().expect("finish zip").into_inner()
}

/// Writes a zip archive to `path`.
pub fn write_zip(path: &Utf8Path, entries: &[(&str, &[u8])]) {
    let mut file = File::create(path).expect("create zip file");
    file.write_all(&zip_bytes(entries)).expect("write zip file");
}

/// Editor archive contents for `binary`.
pub fn editor_archive(binary: &str) -> Vec<u8> {
    zip_bytes(&[(binary, b"#!/bin/sh\n")])
}

/// Template bundle contents; `with_sentinel` controls whether
/// `web_release.zip` is present.
pub fn templates_archive(with_sentinel: bool) -> Vec<u8> {
    if with_sentinel {
        zip_bytes(&[
            ("templates/", b""),
            ("templates/web_release.zip", b"release"),
            ("templates/web_debug.zip", b"debug"),
            ("templates/version.txt", b"4.2.2.stable"),
        ])
    } else {
        zip_bytes(&[("templates/", b""), ("templates/version.txt", b"4.2.2.stable")])
    }
}

/// Converts a temp directory path to UTF-8.
pub fn utf8(path: &std::path::Path) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).expect("UTF-8 temp path")
}

/// [`crate::dirs::BaseDirs`] with fixed answers.
#[derive(Debug, Clone, Default)]
pub struct StubBaseDirs {
    /// Value returned by `home_dir`.
    pub home: Option<std::path::PathBuf>,
    /// Value returned by `app_data_dir`.
    pub app_data: Option<std::path::PathBuf>,
}

impl StubBaseDirs {
    /// Directories with only a home directory.
    pub fn with_home(home: &Utf8Path) -> Self {
        Self {
            home: Some(home.as_std_path().to_path_buf()),
            app_data: None,
        }
    }
}

impl crate::dirs::BaseDirs for StubBaseDirs {
    fn home_dir(&self) -> Option<std::path::PathBuf> {
        self.home.clone()
    }

    fn app_data_dir(&self) -> Option<std::path::PathBuf> {
        self.app_data.clone()
    }
}

/// Minimal entry document shaped like Godot's Web export shell.
pub const GODOT_SHELL_HTML: &str = concat!(
    "<!DOCTYPE html>\n",
    "<html>\n",
    "<body>\n",
    "<script>\n",
    "const engine = new Engine(GODOT_CONFIG);\n",
    "(function () {\n",
    "\tconst missing = Engine.getMissingFeatures();\n",
    "\tif (missing.length !== 0) {\n",
    "\t\tdisplayFailureNotice(missing);\n",
    "\t} else {\n",
    "\t\tengine.startGame();\n",
    "\t}\n",
    "}());\n",
    "</script>\n",
    "</body>\n",
    "</html>\n",
);
