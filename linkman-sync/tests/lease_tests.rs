use async_trait::async_trait;
use linkman_sync::{
    LeasedMirror, MIRROR_LEASE, MirrorOutcome, MirrorPass, SqliteLease, SyncResult,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

const TTL: Duration = Duration::from_secs(600);

/// Two processes' handles on one data file.
fn open_pair(dir: &TempDir, first: &str, second: &str) -> (SqliteLease, SqliteLease) {
    let path = dir.path().join("linkman.db");
    let path = path.to_str().unwrap();
    (
        SqliteLease::open(path, first).unwrap(),
        SqliteLease::open(path, second).unwrap(),
    )
}

#[derive(Default)]
struct CountingPass {
    runs: AtomicUsize,
}

#[async_trait]
impl MirrorPass for CountingPass {
    async fn run_mirror(&self) -> SyncResult<MirrorOutcome> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(MirrorOutcome::Skipped)
    }
}

// ── SqliteLease ─────────────────────────────────────────────────

#[test]
fn lease_is_exclusive_between_holders() {
    let dir = TempDir::new().unwrap();
    let (daemon, manual) = open_pair(&dir, "daemon", "manual");

    assert!(daemon.try_acquire(MIRROR_LEASE, TTL).unwrap());
    assert!(!manual.try_acquire(MIRROR_LEASE, TTL).unwrap());
    assert!(daemon.try_acquire(MIRROR_LEASE, TTL).unwrap());
}

#[test]
fn released_lease_can_be_taken() {
    let dir = TempDir::new().unwrap();
    let (daemon, manual) = open_pair(&dir, "daemon", "manual");

    daemon.try_acquire(MIRROR_LEASE, TTL).unwrap();
    daemon.release(MIRROR_LEASE).unwrap();
    assert!(manual.try_acquire(MIRROR_LEASE, TTL).unwrap());
}

#[test]
fn only_the_holder_can_release() {
    let dir = TempDir::new().unwrap();
    let (daemon, manual) = open_pair(&dir, "daemon", "manual");

    daemon.try_acquire(MIRROR_LEASE, TTL).unwrap();
    manual.release(MIRROR_LEASE).unwrap();
    assert!(!manual.try_acquire(MIRROR_LEASE, TTL).unwrap());
}

#[test]
fn expired_lease_is_reclaimed() {
    let dir = TempDir::new().unwrap();
    let (crashed, manual) = open_pair(&dir, "crashed", "manual");

    assert!(crashed.try_acquire(MIRROR_LEASE, Duration::ZERO).unwrap());
    assert!(manual.try_acquire(MIRROR_LEASE, TTL).unwrap());
}

#[test]
fn leases_are_shared_through_the_data_file() {
    let dir = TempDir::new().unwrap();
    let (daemon, manual) = open_pair(&dir, "daemon", "manual");

    assert!(daemon.try_acquire(MIRROR_LEASE, TTL).unwrap());
    assert!(!manual.try_acquire(MIRROR_LEASE, TTL).unwrap());
}

// ── LeasedMirror ────────────────────────────────────────────────

#[tokio::test]
async fn leased_mirror_runs_and_releases() {
    let pass = Arc::new(CountingPass::default());
    let dir = TempDir::new().unwrap();
    let (lease, other) = open_pair(&dir, "daemon", "manual");
    let mirror = LeasedMirror::new(Arc::clone(&pass) as Arc<dyn MirrorPass>, lease);

    assert_eq!(mirror.run_mirror().await.unwrap(), MirrorOutcome::Skipped);
    assert_eq!(pass.runs.load(Ordering::SeqCst), 1);
    assert!(other.try_acquire(MIRROR_LEASE, TTL).unwrap());
}

#[tokio::test]
async fn leased_mirror_is_busy_while_another_process_mirrors() {
    let pass = Arc::new(CountingPass::default());
    let dir = TempDir::new().unwrap();
    let (lease, daemon) = open_pair(&dir, "manual", "daemon");
    daemon.try_acquire(MIRROR_LEASE, TTL).unwrap();

    let mirror = LeasedMirror::new(Arc::clone(&pass) as Arc<dyn MirrorPass>, lease);
    assert_eq!(mirror.run_mirror().await.unwrap(), MirrorOutcome::Busy);
    assert_eq!(pass.runs.load(Ordering::SeqCst), 0);
}
