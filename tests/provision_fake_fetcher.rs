// tests/provision_fake_fetcher.rs

//! Provisioning wired through `Supervisor::with_backends` with the in-memory
//! filesystem and a fake fetcher.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use binvisor::config::Config;
use binvisor::fetch::Fetcher;
use binvisor::fs::mock::MockFileSystem;
use binvisor::fs::FileSystem;
use binvisor::integrity::Verdict;
use binvisor::supervisor::Supervisor;
use binvisor_test_utils::{digest_hex, init_tracing, ConfigBuilder, FakeFetcher};

const ARTIFACT: &[u8] = b"converter build 6.1";

fn wire(cfg: &Config, fs: &MockFileSystem, fetcher: &FakeFetcher) -> Supervisor {
    let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    let fetcher: Arc<dyn Fetcher> = Arc::new(fetcher.clone());
    Supervisor::with_backends(cfg, fs, fetcher)
}

fn config() -> Config {
    ConfigBuilder::new("https://cdn.example.com/bin/ffmpeg", ARTIFACT)
        .dir(Path::new("/opt/binvisor"))
        .build()
}

#[tokio::test]
async fn fetched_artifact_lands_at_configured_path() {
    init_tracing();
    let fs = MockFileSystem::new();
    let fetcher = FakeFetcher::serving(ARTIFACT);
    let supervisor = wire(&config(), &fs, &fetcher);

    supervisor.ensure_provisioned(None).await.unwrap();

    let entry = fs.entry(Path::new("/opt/binvisor/ffmpeg")).unwrap();
    assert_eq!(entry.content, ARTIFACT);
    assert!(entry.executable);
    assert_eq!(fetcher.requested(), vec!["https://cdn.example.com/bin/ffmpeg"]);
}

#[tokio::test]
async fn host_override_changes_requested_url() {
    init_tracing();
    let raw = ConfigBuilder::new("https://cdn.example.com/bin/ffmpeg", ARTIFACT)
        .dir(Path::new("/opt/binvisor"))
        .raw()
        .with_host_override(Some("mirror.internal"));
    let cfg = Config::try_from(raw).unwrap();
    let fs = MockFileSystem::new();
    let fetcher = FakeFetcher::serving(ARTIFACT);

    wire(&cfg, &fs, &fetcher)
        .ensure_provisioned(None)
        .await
        .unwrap();

    assert_eq!(fetcher.requested(), vec!["https://mirror.internal/bin/ffmpeg"]);
}

#[tokio::test]
async fn corrupted_artifact_is_replaced_and_becomes_valid() {
    init_tracing();
    let cfg = config();
    let fs = MockFileSystem::new();
    fs.add_file("/opt/binvisor/ffmpeg", b"half a binary".to_vec());
    let fetcher = FakeFetcher::serving(ARTIFACT);
    let supervisor = wire(&cfg, &fs, &fetcher);

    assert_eq!(
        supervisor
            .provisioner()
            .verify_local(supervisor.descriptor())
            .await
            .unwrap(),
        Verdict::Mismatch
    );

    supervisor.ensure_provisioned(None).await.unwrap();

    assert_eq!(fetcher.calls(), 1);
    assert!(
        supervisor
            .provisioner()
            .verify_local(supervisor.descriptor())
            .await
            .unwrap()
            .is_match()
    );
}

#[tokio::test]
async fn supervisors_sharing_state_fetch_once_under_contention() {
    init_tracing();
    let cfg = config();
    let fs = MockFileSystem::new();
    let fetcher = FakeFetcher::serving(ARTIFACT).with_delay(Duration::from_millis(200));
    let supervisor = wire(&cfg, &fs, &fetcher);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let s = supervisor.clone();
            tokio::spawn(async move { s.ensure_provisioned(None).await })
        })
        .collect();
    for h in handles {
        h.await.unwrap().unwrap();
    }

    assert_eq!(fetcher.calls(), 1);
    assert!(supervisor.provisioner().is_initialized());
}

#[tokio::test]
async fn failed_fetch_can_be_retried() {
    init_tracing();
    let cfg = config();
    let fs = MockFileSystem::new();
    let failing = FakeFetcher::not_found();

    assert!(wire(&cfg, &fs, &failing).ensure_provisioned(None).await.is_err());
    assert!(fs.entry(Path::new("/opt/binvisor/ffmpeg")).is_none());

    let working = FakeFetcher::serving(ARTIFACT);
    wire(&cfg, &fs, &working)
        .ensure_provisioned(None)
        .await
        .unwrap();
    assert_eq!(working.calls(), 1);
}

#[test]
fn builder_digest_is_hex_of_blake3() {
    assert_eq!(
        digest_hex(b"hello world"),
        "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
    );
}
