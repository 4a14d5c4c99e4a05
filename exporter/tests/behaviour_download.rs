//! BDD tests for release asset downloads: caching, redirects, and cleanup.

use godot_export::download::{DownloadError, Downloader, FetchOutcome};
use godot_export::test_utils::{StubResponse, StubTransport};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::path::PathBuf;

const ASSET_URL: &str = "https://downloads.example.test/4.2.2-stable/asset.zip";
const ASSET_BODY: &[u8] = b"asset payload";

struct DownloadWorld {
    _temp_dir: tempfile::TempDir,
    destination: PathBuf,
    transport: StubTransport,
    max_redirects: u32,
    result: Option<Result<FetchOutcome, DownloadError>>,
}

#[fixture]
fn world() -> DownloadWorld {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let destination = temp_dir.path().join("asset.zip");
    DownloadWorld {
        _temp_dir: temp_dir,
        destination,
        transport: StubTransport::new(),
        max_redirects: 10,
        result: None,
    }
}

impl DownloadWorld {
    fn serve(&mut self, url: &str, response: StubResponse) {
        self.transport = self.transport.clone().route(url, response);
    }

    fn error(&self) -> &DownloadError {
        match self.result.as_ref().expect("fetch attempted") {
            Ok(outcome) => panic!("expected failure, got {outcome:?}"),
            Err(err) => err,
        }
    }
}

#[given("the destination already exists")]
fn given_destination_exists(world: &mut DownloadWorld) {
    std::fs::write(&world.destination, b"cached").expect("seed destination");
}

#[given("the asset is served after {count} redirects")]
fn given_redirect_chain(world: &mut DownloadWorld, count: String) {
    let hops: usize = count.parse().expect("numeric hop count");
    let mut current = ASSET_URL.to_owned();
    for hop in 1..=hops {
        let next = format!("https://mirror{hop}.example.test/asset.zip");
        world.serve(&current, StubResponse::redirect(302, &next));
        current = next;
    }
    world.serve(&current, StubResponse::ok(ASSET_BODY));
}

#[given("the asset redirects to itself")]
fn given_redirect_loop(world: &mut DownloadWorld) {
    world.serve(ASSET_URL, StubResponse::redirect(301, ASSET_URL));
}

#[given("the redirect limit is {limit}")]
fn given_redirect_limit(world: &mut DownloadWorld, limit: String) {
    world.max_redirects = limit.parse().expect("numeric limit");
}

#[given("the asset responds with status {status}")]
fn given_status(world: &mut DownloadWorld, status: String) {
    let status: u16 = status.parse().expect("numeric status");
    world.serve(ASSET_URL, StubResponse::status(status));
}

#[given("the asset body is cut off mid-transfer")]
fn given_broken_body(world: &mut DownloadWorld) {
    world.serve(ASSET_URL, StubResponse::broken_body(b"partial"));
}

#[when("the asset is fetched")]
fn when_fetched(world: &mut DownloadWorld) {
    let downloader = Downloader::new(Box::new(world.transport.clone()), world.max_redirects);
    world.result = Some(downloader.fetch(ASSET_URL, &world.destination));
}

#[then("the fetch is served from the cache")]
fn then_cached(world: &mut DownloadWorld) {
    let outcome = world.result.as_ref().expect("fetch attempted");
    assert!(matches!(outcome, Ok(FetchOutcome::Cached)));
}

#[then("the destination holds the asset body")]
fn then_body_written(world: &mut DownloadWorld) {
    let outcome = world.result.as_ref().expect("fetch attempted");
    assert!(matches!(outcome, Ok(FetchOutcome::Downloaded { .. })));
    assert_eq!(
        std::fs::read(&world.destination).expect("destination written"),
        ASSET_BODY
    );
}

#[then("{count} requests were made")]
fn then_request_count(world: &mut DownloadWorld, count: String) {
    let expected: usize = count.parse().expect("numeric count");
    assert_eq!(world.transport.request_count(), expected);
}

#[then("the fetch fails mentioning \"{text}\"")]
fn then_fails_with(world: &mut DownloadWorld, text: String) {
    let message = world.error().to_string();
    assert!(message.contains(&text), "unexpected error: {message}");
}

#[then("the destination does not exist")]
fn then_no_destination(world: &mut DownloadWorld) {
    assert!(!world.destination.exists());
}

#[scenario(
    path = "tests/features/download.feature",
    name = "Existing destination is reused without a request"
)]
fn scenario_cached_destination(world: DownloadWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/download.feature",
    name = "Redirect chain resolves to the asset"
)]
fn scenario_redirect_chain(world: DownloadWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/download.feature", name = "Redirect loop is rejected")]
fn scenario_redirect_loop(world: DownloadWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/download.feature",
    name = "Missing asset reports the status code"
)]
fn scenario_missing_asset(world: DownloadWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/download.feature",
    name = "Interrupted transfer removes the partial file"
)]
fn scenario_interrupted_transfer(world: DownloadWorld) {
    let _ = world;
}
