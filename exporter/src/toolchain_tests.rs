//! Unit tests for editor binary provisioning.

use super::*;
use crate::download::Downloader;
use crate::extraction::{BuiltinExtractor, MockArchiveExtractor};
use crate::platform::HostOs;
use crate::test_utils::{StubResponse, StubTransport, editor_archive, utf8};
use rstest::{fixture, rstest};

struct Harness {
    _temp: tempfile::TempDir,
    config: ExportConfig,
}

#[fixture]
fn harness() -> Harness {
    let temp = tempfile::tempdir().expect("temp dir");
    let config = ExportConfig::with_defaults(utf8(temp.path()));
    Harness {
        _temp: temp,
        config,
    }
}

fn profile(config: &ExportConfig, os: HostOs) -> PlatformProfile {
    PlatformProfile::for_os(os, &config.version)
}

fn serve_archive(config: &ExportConfig, profile: &PlatformProfile) -> StubTransport {
    StubTransport::new().route(
        &config.asset_url(profile.archive()),
        StubResponse::ok(&editor_archive(profile.binary())),
    )
}

#[rstest]
fn existing_binary_makes_no_network_call(harness: Harness) {
    let profile = profile(&harness.config, HostOs::Linux);
    let layout = harness.config.layout();
    std::fs::create_dir_all(layout.cli_dir()).expect("mkdir");
    std::fs::write(layout.binary_path(&profile), b"binary").expect("seed");
    let transport = StubTransport::new();
    let downloader = Downloader::new(Box::new(transport.clone()), 10);
    let mut extractor = MockArchiveExtractor::new();
    extractor.expect_extract().never();
    let mut sink = Vec::new();

    let path = ToolchainCache::new(&harness.config, &downloader, &extractor)
        .ensure_binary(&profile, &mut Progress::new(&mut sink, false))
        .expect("binary ready");

    assert_eq!(path, layout.binary_path(&profile));
    assert_eq!(transport.request_count(), 0);
}

#[cfg(unix)]
#[rstest]
fn downloaded_binary_is_extracted_and_executable(harness: Harness) {
    use std::os::unix::fs::PermissionsExt;

    let profile = profile(&harness.config, HostOs::Linux);
    let transport = serve_archive(&harness.config, &profile);
    let downloader = Downloader::new(Box::new(transport.clone()), 10);
    let mut sink = Vec::new();

    let path = ToolchainCache::new(&harness.config, &downloader, &BuiltinExtractor)
        .ensure_binary(&profile, &mut Progress::new(&mut sink, false))
        .expect("binary ready");

    let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
    assert_eq!(transport.request_count(), 1);
    assert!(String::from_utf8_lossy(&sink).contains("downloaded Godot_v4.2.2-stable_linux.x86_64.zip"));
}

#[cfg(unix)]
#[rstest]
fn windows_profile_keeps_extracted_mode(harness: Harness) {
    use std::os::unix::fs::PermissionsExt;

    let profile = profile(&harness.config, HostOs::Windows);
    let transport = serve_archive(&harness.config, &profile);
    let downloader = Downloader::new(Box::new(transport), 10);
    let mut sink = Vec::new();

    let path = ToolchainCache::new(&harness.config, &downloader, &BuiltinExtractor)
        .ensure_binary(&profile, &mut Progress::new(&mut sink, true))
        .expect("binary ready");

    let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o644);
}

#[rstest]
fn leftover_archive_is_reextracted_without_download(harness: Harness) {
    let profile = profile(&harness.config, HostOs::Windows);
    let layout = harness.config.layout();
    std::fs::create_dir_all(layout.cli_dir()).expect("mkdir");
    std::fs::write(
        layout.binary_archive(&profile),
        editor_archive(profile.binary()),
    )
    .expect("seed archive");
    let transport = StubTransport::new();
    let downloader = Downloader::new(Box::new(transport.clone()), 10);
    let mut sink = Vec::new();

    let path = ToolchainCache::new(&harness.config, &downloader, &BuiltinExtractor)
        .ensure_binary(&profile, &mut Progress::new(&mut sink, true))
        .expect("binary ready");

    assert!(path.exists());
    assert_eq!(transport.request_count(), 0);
}

#[rstest]
fn extraction_failure_is_fatal(harness: Harness) {
    let profile = profile(&harness.config, HostOs::Linux);
    let transport = serve_archive(&harness.config, &profile);
    let downloader = Downloader::new(Box::new(transport), 10);
    let mut extractor = MockArchiveExtractor::new();
    extractor.expect_extract().times(1).returning(|archive, _| {
        Err(ExportError::InvalidArchive {
            archive: archive.to_owned(),
            reason: "truncated".to_owned(),
        })
    });
    let mut sink = Vec::new();

    let err = ToolchainCache::new(&harness.config, &downloader, &extractor)
        .ensure_binary(&profile, &mut Progress::new(&mut sink, true))
        .expect_err("extraction fails");

    assert!(matches!(err, ExportError::InvalidArchive { .. }));
}

#[rstest]
fn download_failure_is_fatal(harness: Harness) {
    let profile = profile(&harness.config, HostOs::Macos);
    let transport = StubTransport::new().route(
        &harness.config.asset_url(profile.archive()),
        StubResponse::status(404),
    );
    let downloader = Downloader::new(Box::new(transport), 10);
    let mut sink = Vec::new();

    let err = ToolchainCache::new(&harness.config, &downloader, &BuiltinExtractor)
        .ensure_binary(&profile, &mut Progress::new(&mut sink, true))
        .expect_err("download fails");

    assert!(err.to_string().contains("404"));
}
