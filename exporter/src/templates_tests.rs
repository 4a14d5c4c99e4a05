//! Unit tests for template provisioning and the system mirror.

use super::*;
use crate::dirs::MockBaseDirs;
use crate::extraction::BuiltinExtractor;
use crate::test_utils::{StubResponse, StubTransport, templates_archive, utf8};
use rstest::{fixture, rstest};

struct Harness {
    _temp: tempfile::TempDir,
    config: ExportConfig,
    home: Utf8PathBuf,
}

#[fixture]
fn harness() -> Harness {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = utf8(temp.path());
    let home = root.join("home");
    std::fs::create_dir_all(&home).expect("mkdir home");
    let config = ExportConfig::with_defaults(root.join("repo"));
    Harness {
        _temp: temp,
        config,
        home,
    }
}

impl Harness {
    fn templates_url(&self) -> String {
        self.config
            .asset_url(&self.config.version.templates_archive())
    }

    fn seed_ready_templates(&self) {
        let layout = self.config.layout();
        let dir = layout.template_version_dir(&self.config.version);
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(dir.join("web_release.zip"), b"release").expect("seed sentinel");
    }

    fn mirror_dir(&self) -> Utf8PathBuf {
        self.home.join(".local/share/godot/export_templates/4.2.2.stable")
    }
}

fn home_dirs(home: &Utf8Path) -> MockBaseDirs {
    let home = home.as_std_path().to_path_buf();
    let mut dirs = MockBaseDirs::new();
    dirs.expect_home_dir().returning(move || Some(home.clone()));
    dirs.expect_app_data_dir().returning(|| None);
    dirs
}

fn no_dirs() -> MockBaseDirs {
    let mut dirs = MockBaseDirs::new();
    dirs.expect_home_dir().returning(|| None);
    dirs.expect_app_data_dir().returning(|| None);
    dirs
}

#[rstest]
fn ready_templates_skip_download_but_refresh_mirror(harness: Harness) {
    harness.seed_ready_templates();
    std::fs::create_dir_all(harness.mirror_dir()).expect("mkdir mirror");
    std::fs::write(harness.mirror_dir().join("stale.txt"), b"old").expect("seed mirror");
    let transport = StubTransport::new();
    let downloader = Downloader::new(Box::new(transport.clone()), 10);
    let dirs = home_dirs(&harness.home);
    let sync = TemplateSync::new(&dirs, HostOs::Linux);
    let mut sink = Vec::new();

    let root = TemplateCache::new(&harness.config, &downloader, &BuiltinExtractor, Some(sync))
        .ensure_templates(&mut Progress::new(&mut sink, false))
        .expect("templates ready");

    assert_eq!(root, harness.config.layout().templates_dir());
    assert_eq!(transport.request_count(), 0);
    assert!(harness.mirror_dir().join("web_release.zip").is_file());
    assert!(
        !harness.mirror_dir().join("stale.txt").exists(),
        "mirror must be replaced, not merged"
    );
}

#[rstest]
fn fresh_cache_downloads_and_renames_bundle(harness: Harness) {
    let transport = StubTransport::new().route(
        &harness.templates_url(),
        StubResponse::ok(&templates_archive(true)),
    );
    let downloader = Downloader::new(Box::new(transport.clone()), 10);
    let mut sink = Vec::new();

    TemplateCache::new(&harness.config, &downloader, &BuiltinExtractor, None)
        .ensure_templates(&mut Progress::new(&mut sink, true))
        .expect("templates ready");

    let layout = harness.config.layout();
    assert!(templates_ready(&layout, &harness.config.version));
    assert!(layout.template_version_dir(&harness.config.version).join("web_debug.zip").is_file());
    assert!(!layout.extracted_templates_dir().exists());
    assert_eq!(transport.request_count(), 1);
}

#[rstest]
fn missing_sentinel_triggers_reprovision_and_replaces_stale_dir(harness: Harness) {
    let layout = harness.config.layout();
    let version_dir = layout.template_version_dir(&harness.config.version);
    std::fs::create_dir_all(&version_dir).expect("mkdir");
    std::fs::write(version_dir.join("partial.tmp"), b"junk").expect("seed");
    let transport = StubTransport::new().route(
        &harness.templates_url(),
        StubResponse::ok(&templates_archive(true)),
    );
    let downloader = Downloader::new(Box::new(transport.clone()), 10);
    let mut sink = Vec::new();

    TemplateCache::new(&harness.config, &downloader, &BuiltinExtractor, None)
        .ensure_templates(&mut Progress::new(&mut sink, true))
        .expect("templates ready");

    assert_eq!(transport.request_count(), 1);
    assert!(!version_dir.join("partial.tmp").exists());
    assert!(version_dir.join("web_release.zip").is_file());
}

#[rstest]
fn bundle_without_sentinel_is_fatal(harness: Harness) {
    let transport = StubTransport::new().route(
        &harness.templates_url(),
        StubResponse::ok(&templates_archive(false)),
    );
    let downloader = Downloader::new(Box::new(transport), 10);
    let mut sink = Vec::new();

    let err = TemplateCache::new(&harness.config, &downloader, &BuiltinExtractor, None)
        .ensure_templates(&mut Progress::new(&mut sink, true))
        .expect_err("sentinel missing");

    assert!(matches!(err, ExportError::TemplatesMissing { .. }));
    assert!(err.to_string().contains("templates missing after extraction"));
}

#[rstest]
fn sync_without_home_is_a_no_op(harness: Harness) {
    harness.seed_ready_templates();
    let dirs = no_dirs();
    let sync = TemplateSync::new(&dirs, HostOs::Linux);
    let source = harness
        .config
        .layout()
        .template_version_dir(&harness.config.version);

    let target = sync
        .sync_to_system(&source, &harness.config.version)
        .expect("no-op succeeds");

    assert!(target.is_none());
}

#[rstest]
fn windows_mirror_prefers_app_data(harness: Harness) {
    harness.seed_ready_templates();
    let app_data = harness.home.join("Roaming");
    let app_data_path = app_data.as_std_path().to_path_buf();
    let mut dirs = MockBaseDirs::new();
    dirs.expect_home_dir()
        .returning(|| Some(std::path::PathBuf::from("/unused")));
    dirs.expect_app_data_dir()
        .returning(move || Some(app_data_path.clone()));
    let sync = TemplateSync::new(&dirs, HostOs::Windows);
    let source = harness
        .config
        .layout()
        .template_version_dir(&harness.config.version);

    let target = sync
        .sync_to_system(&source, &harness.config.version)
        .expect("mirror succeeds")
        .expect("target resolved");

    assert_eq!(target, app_data.join("Godot/export_templates/4.2.2.stable"));
    assert!(target.join("web_release.zip").is_file());
}

#[rstest]
fn target_dir_matches_sync_destination(harness: Harness) {
    let dirs = home_dirs(&harness.home);
    let sync = TemplateSync::new(&dirs, HostOs::Linux);
    assert_eq!(
        sync.target_dir(&harness.config.version).expect("resolves"),
        Some(harness.mirror_dir())
    );
}
