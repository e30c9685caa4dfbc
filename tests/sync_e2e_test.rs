//! End-to-end disk sync: two orchestrators over a fragmenting loopback,
//! each rooted at its own temp directory.

use std::time::Duration;

use pairsync::{
    spawn_engine, EngineConfig, EngineEvent, EngineEventReceiver, EngineHandle, LoopbackTransport,
    Role, SyncConfig, SyncOrchestrator, SyncStats,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;
use tokio::time::timeout;

async fn next_event(rx: &mut EngineEventReceiver, secs: u64) -> EngineEvent {
    timeout(Duration::from_secs(secs), rx.recv())
        .await
        .expect("timed out waiting for engine event")
        .expect("engine event channel closed")
}

async fn secured_pair() -> (
    (EngineHandle, EngineEventReceiver),
    (EngineHandle, EngineEventReceiver),
) {
    let ((client_transport, client_transport_events), (server_transport, server_transport_events)) =
        LoopbackTransport::pair_fragmented(1400);

    let (client, mut client_events) = spawn_engine(
        EngineConfig::new(Role::Client, "puller"),
        client_transport,
        client_transport_events,
    );
    let (server, mut server_events) = spawn_engine(
        EngineConfig::new(Role::Server, "source"),
        server_transport,
        server_transport_events,
    );

    client.start_connection();
    assert!(matches!(
        next_event(&mut client_events, 5).await,
        EngineEvent::SasGenerated(_)
    ));
    assert!(matches!(
        next_event(&mut server_events, 5).await,
        EngineEvent::SasGenerated(_)
    ));
    client.confirm_sas(true);
    server.confirm_sas(true);
    assert!(matches!(
        next_event(&mut client_events, 5).await,
        EngineEvent::SessionSecured
    ));
    assert!(matches!(
        next_event(&mut server_events, 5).await,
        EngineEvent::SessionSecured
    ));

    ((client, client_events), (server, server_events))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Secure a session and run one client pull with the server responding.
async fn run_pull(server_root: &TempDir, client_root: &TempDir) -> SyncStats {
    init_tracing();
    let ((client, client_events), (server, server_events)) = secured_pair().await;

    let mut responder = SyncOrchestrator::new(
        server,
        server_events,
        SyncConfig::new(server_root.path()),
    );
    tokio::spawn(async move {
        let _ = responder.serve().await;
    });

    let mut puller = SyncOrchestrator::new(
        client,
        client_events,
        SyncConfig::new(client_root.path()),
    );
    timeout(Duration::from_secs(30), puller.sync())
        .await
        .expect("sync did not finish in time")
        .expect("sync failed")
}

fn deterministic_payload(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

#[tokio::test]
async fn test_pull_copies_five_mib_payload_byte_equal() {
    let server_root = TempDir::new().unwrap();
    let client_root = TempDir::new().unwrap();

    let payload = deterministic_payload(1337, 5 * 1024 * 1024);
    std::fs::write(server_root.path().join("payload.bin"), &payload).unwrap();

    let stats = run_pull(&server_root, &client_root).await;
    assert_eq!(stats.files_downloaded, 1);
    assert_eq!(stats.bytes_downloaded, payload.len() as u64);

    let copied = std::fs::read(client_root.path().join("payload.bin")).unwrap();
    assert_eq!(copied, payload);
}

#[tokio::test]
async fn test_pull_creates_nested_directories_and_leaves_no_temp() {
    let server_root = TempDir::new().unwrap();
    let client_root = TempDir::new().unwrap();

    std::fs::create_dir_all(server_root.path().join("a/b")).unwrap();
    std::fs::write(server_root.path().join("a/b/deep.txt"), b"nested content").unwrap();
    std::fs::write(server_root.path().join("top.txt"), b"top content").unwrap();

    let stats = run_pull(&server_root, &client_root).await;
    assert_eq!(stats.files_downloaded, 2);

    assert_eq!(
        std::fs::read(client_root.path().join("a/b/deep.txt")).unwrap(),
        b"nested content"
    );
    assert_eq!(
        std::fs::read(client_root.path().join("top.txt")).unwrap(),
        b"top content"
    );

    // Atomic-write postcondition: no .tmp residue anywhere.
    for entry in walk(client_root.path()) {
        assert!(
            !entry.to_string_lossy().ends_with(".tmp"),
            "temp file left behind: {}",
            entry.display()
        );
    }
}

#[tokio::test]
async fn test_pull_overwrites_changed_file_and_deletes_stale() {
    let server_root = TempDir::new().unwrap();
    let client_root = TempDir::new().unwrap();

    std::fs::write(server_root.path().join("shared.txt"), b"server version").unwrap();
    std::fs::write(client_root.path().join("shared.txt"), b"old local copy, longer").unwrap();
    std::fs::write(client_root.path().join("stale.txt"), b"remote deleted me").unwrap();

    let stats = run_pull(&server_root, &client_root).await;
    assert_eq!(stats.files_downloaded, 1);
    assert_eq!(stats.files_deleted, 1);

    assert_eq!(
        std::fs::read(client_root.path().join("shared.txt")).unwrap(),
        b"server version"
    );
    assert!(!client_root.path().join("stale.txt").exists());
}

#[tokio::test]
async fn test_second_pull_skips_unchanged_files() {
    let server_root = TempDir::new().unwrap();
    let client_root = TempDir::new().unwrap();

    std::fs::write(server_root.path().join("same.txt"), b"identical").unwrap();

    // The first pull copies the file and restores its manifest mtime, so
    // the second pull's diff sees size and ticks as equal and does nothing.
    let first = run_pull(&server_root, &client_root).await;
    assert_eq!(first.files_downloaded, 1);

    let second = run_pull(&server_root, &client_root).await;
    assert_eq!(second.files_downloaded, 0, "unchanged file re-downloaded");
    assert_eq!(second.files_deleted, 0);
}

#[tokio::test]
async fn test_pull_of_empty_remote_deletes_everything_local() {
    let server_root = TempDir::new().unwrap();
    let client_root = TempDir::new().unwrap();

    std::fs::write(client_root.path().join("a.txt"), b"a").unwrap();
    std::fs::write(client_root.path().join("b.txt"), b"b").unwrap();

    let stats = run_pull(&server_root, &client_root).await;
    assert_eq!(stats.files_downloaded, 0);
    assert_eq!(stats.files_deleted, 2);
    assert!(!client_root.path().join("a.txt").exists());
    assert!(!client_root.path().join("b.txt").exists());
}

fn walk(root: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path.clone());
            }
            out.push(path);
        }
    }
    out
}
