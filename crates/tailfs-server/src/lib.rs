//! gRPC service over the filesystem facade.
//!
//! Every rpc resolves to the same core operations the kernel mount uses.
//! Domain failures never become transport errors: each response carries a
//! status_code (0 on success, negative errno otherwise) and a message, so
//! a caller can always distinguish "the call failed" from "the network
//! failed". The core is synchronous, so each rpc runs it on a
//! blocking-capable worker thread.

use std::sync::Arc;

use tokio::task;
use tonic::{Request, Response, Status};
use tracing::debug;

use tailfs_core::{Fs, FsError};
use tailfs_proto::pb::file_system_service_server::FileSystemService;
pub use tailfs_proto::pb::file_system_service_server::FileSystemServiceServer;
use tailfs_proto::pb::{
    CreateRequest, CreateResponse, FileEntry, GetRequest, GetResponse, MkdirRequest,
    MkdirResponse, ReadDirectoryRequest, ReadDirectoryResponse, WriteRequest, WriteResponse,
};
use tailfs_proto::unix_seconds;

/// The remote adapter over one shared filesystem instance.
#[derive(Clone)]
pub struct TailfsService {
    fs: Arc<Fs>,
}

impl TailfsService {
    pub fn new(fs: Arc<Fs>) -> Self {
        Self { fs }
    }

    /// Wrap this service for `tonic::transport::Server::add_service`.
    pub fn into_server(self) -> FileSystemServiceServer<TailfsService> {
        FileSystemServiceServer::new(self)
    }
}

/// Negative errno plus human-readable message for a failed operation.
fn failure(e: &FsError) -> (i32, String) {
    (-e.errno(), e.to_string())
}

/// Join a parent directory path and a leaf name into one absolute path.
fn join_path(parent: &str, name: &str) -> String {
    format!("{}/{name}", parent.trim_end_matches('/'))
}

async fn run_blocking<T, F>(f: F) -> Result<T, Status>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| Status::internal(format!("filesystem worker failed: {e}")))
}

#[tonic::async_trait]
impl FileSystemService for TailfsService {
    async fn create(
        &self,
        request: Request<CreateRequest>,
    ) -> Result<Response<CreateResponse>, Status> {
        let req = request.into_inner();
        debug!(parent = %req.pathname, name = %req.filename, "rpc create");
        let fs = Arc::clone(&self.fs);
        let (status_code, error_message) = run_blocking(move || {
            let path = join_path(&req.pathname, &req.filename);
            match fs.create(&path, req.mode) {
                Ok(_) => (0, String::new()),
                Err(e) => failure(&e),
            }
        })
        .await?;
        Ok(Response::new(CreateResponse {
            status_code,
            error_message,
        }))
    }

    async fn mkdir(
        &self,
        request: Request<MkdirRequest>,
    ) -> Result<Response<MkdirResponse>, Status> {
        let req = request.into_inner();
        debug!(parent = %req.pathname, name = %req.dirname, "rpc mkdir");
        let fs = Arc::clone(&self.fs);
        let (status_code, error_message) = run_blocking(move || {
            let path = join_path(&req.pathname, &req.dirname);
            match fs.mkdir(&path, req.mode) {
                Ok(_) => (0, String::new()),
                Err(e) => failure(&e),
            }
        })
        .await?;
        Ok(Response::new(MkdirResponse {
            status_code,
            error_message,
        }))
    }

    async fn write(
        &self,
        request: Request<WriteRequest>,
    ) -> Result<Response<WriteResponse>, Status> {
        let req = request.into_inner();
        debug!(path = %req.pathname, offset = req.offset, len = req.data.len(), "rpc write");
        let fs = Arc::clone(&self.fs);
        let (status_code, error_message, bytes_written) = run_blocking(move || {
            match fs.write_path(&req.pathname, req.offset, &req.data) {
                Ok(written) => (0, String::new(), written),
                Err(e) => {
                    // A short write carries exactly the payload bytes that
                    // got committed before the fault.
                    let committed = match &e {
                        FsError::ShortWrite { committed, .. } => *committed,
                        _ => 0,
                    };
                    let (code, message) = failure(&e);
                    (code, message, committed)
                }
            }
        })
        .await?;
        Ok(Response::new(WriteResponse {
            status_code,
            error_message,
            bytes_written,
        }))
    }

    async fn get(&self, request: Request<GetRequest>) -> Result<Response<GetResponse>, Status> {
        let req = request.into_inner();
        debug!(path = %req.pathname, offset = req.offset, size = req.size, "rpc get");
        let fs = Arc::clone(&self.fs);
        let (status_code, error_message, data) = run_blocking(move || {
            // size 0 means read to end; the core clips to committed bytes.
            let len = if req.size == 0 {
                usize::MAX
            } else {
                req.size as usize
            };
            match fs.read_path(&req.pathname, req.offset, len) {
                Ok(data) => (0, String::new(), data),
                Err(e) => {
                    let (code, message) = failure(&e);
                    (code, message, Vec::new())
                }
            }
        })
        .await?;
        let bytes_read = data.len() as u64;
        Ok(Response::new(GetResponse {
            status_code,
            error_message,
            data,
            bytes_read,
        }))
    }

    async fn read_directory(
        &self,
        request: Request<ReadDirectoryRequest>,
    ) -> Result<Response<ReadDirectoryResponse>, Status> {
        let req = request.into_inner();
        debug!(path = %req.pathname, "rpc read_directory");
        let fs = Arc::clone(&self.fs);
        let (status_code, error_message, entries) =
            run_blocking(move || match fs.readdir(&req.pathname) {
                Ok(children) => {
                    let entries = children
                        .into_iter()
                        .map(|e| FileEntry {
                            name: e.name,
                            is_directory: e.kind.is_dir(),
                            size: e.size,
                            mtime: unix_seconds(e.mtime),
                        })
                        .collect();
                    (0, String::new(), entries)
                }
                Err(e) => {
                    let (code, message) = failure(&e);
                    (code, message, Vec::new())
                }
            })
            .await?;
        Ok(Response::new(ReadDirectoryResponse {
            status_code,
            error_message,
            entries,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tailfs_core::{FsConfig, Owner};
    use tempfile::TempDir;

    fn service() -> (TailfsService, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = FsConfig::new(dir.path().join("backing"));
        let fs = Arc::new(Fs::with_owner(config, Owner::new(1000, 1000)).unwrap());
        (TailfsService::new(fs), dir)
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", "a.txt"), "/a.txt");
        assert_eq!(join_path("/d", "f"), "/d/f");
        assert_eq!(join_path("/d/", "f"), "/d/f");
    }

    #[tokio::test]
    async fn test_create_write_get_round_trip() {
        let (svc, _dir) = service();

        let resp = svc
            .create(Request::new(CreateRequest {
                pathname: "/".into(),
                filename: "a.txt".into(),
                mode: 0o644,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(resp.status_code, 0);

        let resp = svc
            .write(Request::new(WriteRequest {
                pathname: "/a.txt".into(),
                data: b"hello".to_vec(),
                offset: 0,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(resp.status_code, 0);
        assert_eq!(resp.bytes_written, 5);

        let resp = svc
            .get(Request::new(GetRequest {
                pathname: "/a.txt".into(),
                offset: 0,
                size: 5,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(resp.status_code, 0);
        assert_eq!(resp.bytes_read, 5);
        assert_eq!(resp.data, b"hello".to_vec());
    }

    #[tokio::test]
    async fn test_get_size_zero_reads_to_end() {
        let (svc, _dir) = service();
        svc.create(Request::new(CreateRequest {
            pathname: "/".into(),
            filename: "f".into(),
            mode: 0o644,
        }))
        .await
        .unwrap();
        svc.write(Request::new(WriteRequest {
            pathname: "/f".into(),
            data: b"abcdef".to_vec(),
            offset: 0,
        }))
        .await
        .unwrap();

        let resp = svc
            .get(Request::new(GetRequest {
                pathname: "/f".into(),
                offset: 2,
                size: 0,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(resp.status_code, 0);
        assert_eq!(resp.data, b"cdef".to_vec());
    }

    #[tokio::test]
    async fn test_get_at_eof_is_status_zero_with_no_bytes() {
        let (svc, _dir) = service();
        svc.create(Request::new(CreateRequest {
            pathname: "/".into(),
            filename: "f".into(),
            mode: 0o644,
        }))
        .await
        .unwrap();

        let resp = svc
            .get(Request::new(GetRequest {
                pathname: "/f".into(),
                offset: 100,
                size: 10,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(resp.status_code, 0);
        assert_eq!(resp.bytes_read, 0);
    }

    #[tokio::test]
    async fn test_statuses_carry_negative_errno() {
        let (svc, _dir) = service();

        let resp = svc
            .get(Request::new(GetRequest {
                pathname: "/missing".into(),
                offset: 0,
                size: 1,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(resp.status_code, -libc::ENOENT);
        assert!(!resp.error_message.is_empty());

        svc.mkdir(Request::new(MkdirRequest {
            pathname: "/".into(),
            dirname: "d".into(),
            mode: 0o755,
        }))
        .await
        .unwrap();
        let resp = svc
            .mkdir(Request::new(MkdirRequest {
                pathname: "/".into(),
                dirname: "d".into(),
                mode: 0o755,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(resp.status_code, -libc::EEXIST);
    }

    #[tokio::test]
    async fn test_rewrite_is_eperm() {
        let (svc, _dir) = service();
        svc.create(Request::new(CreateRequest {
            pathname: "/".into(),
            filename: "f".into(),
            mode: 0o644,
        }))
        .await
        .unwrap();
        svc.write(Request::new(WriteRequest {
            pathname: "/f".into(),
            data: b"hello".to_vec(),
            offset: 0,
        }))
        .await
        .unwrap();

        let resp = svc
            .write(Request::new(WriteRequest {
                pathname: "/f".into(),
                data: b"x".to_vec(),
                offset: 3,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(resp.status_code, -libc::EPERM);
        assert_eq!(resp.bytes_written, 0);
    }

    #[tokio::test]
    async fn test_write_fault_reports_committed_bytes() {
        let (svc, dir) = service();
        svc.create(Request::new(CreateRequest {
            pathname: "/".into(),
            filename: "f".into(),
            mode: 0o644,
        }))
        .await
        .unwrap();
        // Root is inode 1, the file is inode 2. Removing its backing unit
        // makes the next append fault with nothing committed.
        std::fs::remove_file(dir.path().join("backing").join("inode_2")).unwrap();

        let resp = svc
            .write(Request::new(WriteRequest {
                pathname: "/f".into(),
                data: b"hello".to_vec(),
                offset: 0,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(resp.status_code, -libc::EIO);
        assert_eq!(resp.bytes_written, 0);
    }

    #[tokio::test]
    async fn test_read_directory_listing() {
        let (svc, _dir) = service();
        svc.mkdir(Request::new(MkdirRequest {
            pathname: "/".into(),
            dirname: "d".into(),
            mode: 0o755,
        }))
        .await
        .unwrap();
        svc.create(Request::new(CreateRequest {
            pathname: "/".into(),
            filename: "f".into(),
            mode: 0o644,
        }))
        .await
        .unwrap();

        let resp = svc
            .read_directory(Request::new(ReadDirectoryRequest {
                pathname: "/".into(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(resp.status_code, 0);
        assert_eq!(resp.entries.len(), 2);
        assert_eq!(resp.entries[0].name, "d");
        assert!(resp.entries[0].is_directory);
        assert_eq!(resp.entries[1].name, "f");
        assert!(!resp.entries[1].is_directory);
    }
}
