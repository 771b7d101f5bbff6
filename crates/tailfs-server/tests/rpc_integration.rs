//! Integration tests driving the gRPC service through the typed client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use tailfs_client::{ClientError, TailClient};
use tailfs_core::{Fs, FsConfig};
use tailfs_server::TailfsService;

/// Start a service on an ephemeral port and return its address.
async fn start_server(backing: &TempDir) -> SocketAddr {
    // Bind to port 0 to reserve an address, then hand it to the server.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = FsConfig::new(backing.path().join("backing"));
    let fs = Arc::new(Fs::new(config).unwrap());
    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .timeout(Duration::from_secs(5))
            .add_service(TailfsService::new(fs).into_server())
            .serve(addr)
            .await
            .unwrap();
    });

    // Give the server time to start listening.
    tokio::time::sleep(Duration::from_millis(50)).await;
    addr
}

async fn connect(addr: SocketAddr) -> TailClient {
    TailClient::connect(format!("http://{addr}"))
        .await
        .expect("client connect failed")
}

#[tokio::test]
async fn test_create_write_get_list() {
    let backing = TempDir::new().unwrap();
    let addr = start_server(&backing).await;
    let mut client = connect(addr).await;

    client.create("/", "test.txt", 0o644).await.unwrap();
    client.mkdir("/", "testdir", 0o755).await.unwrap();

    let written = client
        .write("/test.txt", b"this message should be written to a file".to_vec(), 0)
        .await
        .unwrap();
    assert_eq!(written, 40);

    let data = client.get("/test.txt", 0, 250).await.unwrap();
    assert_eq!(data, b"this message should be written to a file");

    let entries = client.read_dir("/").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "test.txt");
    assert!(!entries[0].is_directory);
    assert_eq!(entries[0].size, 40);
    assert_eq!(entries[1].name, "testdir");
    assert!(entries[1].is_directory);
}

#[tokio::test]
async fn test_gap_write_and_read_to_end() {
    let backing = TempDir::new().unwrap();
    let addr = start_server(&backing).await;
    let mut client = connect(addr).await;

    client.create("/", "f", 0o644).await.unwrap();
    client.write("/f", b"hello".to_vec(), 0).await.unwrap();
    client.write("/f", b"x".to_vec(), 10).await.unwrap();

    // size 0 reads to the end from the offset.
    let data = client.get("/f", 5, 0).await.unwrap();
    assert_eq!(data, b"\0\0\0\0\0x");
}

#[tokio::test]
async fn test_remote_statuses_surface_as_errors() {
    let backing = TempDir::new().unwrap();
    let addr = start_server(&backing).await;
    let mut client = connect(addr).await;

    // Missing file.
    match client.get("/missing", 0, 1).await {
        Err(ClientError::Remote { code, message }) => {
            assert_eq!(code, -2); // -ENOENT
            assert!(!message.is_empty());
        }
        other => panic!("expected remote error, got {other:?}"),
    }

    // Duplicate mkdir.
    client.mkdir("/", "d", 0o755).await.unwrap();
    match client.mkdir("/", "d", 0o755).await {
        Err(ClientError::Remote { code, .. }) => assert_eq!(code, -17), // -EEXIST
        other => panic!("expected remote error, got {other:?}"),
    }

    // Rewriting committed bytes.
    client.create("/", "f", 0o644).await.unwrap();
    client.write("/f", b"hello".to_vec(), 0).await.unwrap();
    match client.write("/f", b"x".to_vec(), 2).await {
        Err(ClientError::Remote { code, .. }) => assert_eq!(code, -1), // -EPERM
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_read_at_eof_is_empty_success() {
    let backing = TempDir::new().unwrap();
    let addr = start_server(&backing).await;
    let mut client = connect(addr).await;

    client.create("/", "f", 0o644).await.unwrap();
    let data = client.get("/f", 100, 10).await.unwrap();
    assert!(data.is_empty());
}
