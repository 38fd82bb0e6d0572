//! End-to-end lifecycle tests against a real watched directory.
//!
//! Real plugin libraries need a build step, so these tests exercise the
//! pipeline with artifacts that fail to load: the interesting properties are
//! that events flow watcher -> debouncer -> manager, that bad artifacts never
//! poison the host, and that shutdown is clean.

use std::path::Path;
use std::time::Duration;

use plugbay_core::{HostConfig, HostMode, LifecycleManager};
use tempfile::TempDir;

fn quick_config(dir: &Path) -> HostConfig {
    HostConfig {
        plugins_dir: dir.to_path_buf(),
        debounce: Duration::from_millis(30),
        load_retries: 2,
        load_retry_delay: Duration::from_millis(10),
        readable_budget: Duration::from_millis(50),
        readable_interval: Duration::from_millis(10),
        ..HostConfig::default()
    }
}

fn artifact_name(stem: &str) -> String {
    format!("{stem}.{}", std::env::consts::DLL_EXTENSION)
}

#[tokio::test(flavor = "multi_thread")]
async fn bad_artifact_dropped_into_watched_dir_does_not_poison_host() {
    let dir = TempDir::new().unwrap();
    let manager = LifecycleManager::new(quick_config(dir.path()), HostMode::Web);
    manager.start().await.unwrap();

    std::fs::write(dir.path().join(artifact_name("bad")), b"garbage bytes").unwrap();

    // Debounce plus retries, with slack for the watcher to deliver.
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(manager.loaded_plugins().await.unwrap().is_empty());
    assert!(manager.routes().endpoints().is_empty());

    manager.dispose().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn burst_of_changes_to_one_artifact_is_coalesced() {
    let dir = TempDir::new().unwrap();
    let manager = LifecycleManager::new(quick_config(dir.path()), HostMode::Web);
    manager.start().await.unwrap();

    let path = dir.path().join(artifact_name("busy"));
    for i in 0..50u8 {
        std::fs::write(&path, [i]).unwrap();
    }

    tokio::time::sleep(Duration::from_millis(500)).await;

    // All fifty writes collapsed into (at most a couple of) load attempts,
    // every one of which failed on the garbage artifact; the host stays
    // consistent either way.
    assert!(manager.loaded_plugins().await.unwrap().is_empty());
    manager.dispose().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn deleting_artifact_with_pending_reload_aborts_cleanly() {
    let dir = TempDir::new().unwrap();
    let manager = LifecycleManager::new(quick_config(dir.path()), HostMode::Web);
    manager.start().await.unwrap();

    let path = dir.path().join(artifact_name("flash"));
    std::fs::write(&path, b"short-lived").unwrap();
    std::fs::remove_file(&path).unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(manager.loaded_plugins().await.unwrap().is_empty());
    manager.dispose().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn existing_artifacts_are_scheduled_on_start() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(artifact_name("preexisting")), b"junk").unwrap();

    let manager = LifecycleManager::new(quick_config(dir.path()), HostMode::Web);
    manager.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;

    // The preexisting garbage artifact was picked up and rejected without
    // taking the host down.
    assert!(manager.loaded_plugins().await.unwrap().is_empty());
    manager.dispose().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn dispose_stops_event_processing() {
    let dir = TempDir::new().unwrap();
    let manager = LifecycleManager::new(quick_config(dir.path()), HostMode::Web);
    manager.start().await.unwrap();
    manager.dispose().await;

    // Events after dispose must not resurrect anything.
    std::fs::write(dir.path().join(artifact_name("late")), b"junk").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(matches!(
        manager.loaded_plugins().await,
        Err(plugbay_core::HostError::AlreadyDisposed)
    ));
}
