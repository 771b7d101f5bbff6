//! Typed client for the tailfs remote interface.
//!
//! Wraps the generated stub so callers get `Result`s instead of raw
//! status_code/error_message pairs: a non-zero remote status becomes
//! [`ClientError::Remote`] carrying the negative errno and the server's
//! message.

use std::time::Duration;

use thiserror::Error;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use tailfs_proto::pb::file_system_service_client::FileSystemServiceClient;
pub use tailfs_proto::pb::FileEntry;
use tailfs_proto::pb::{
    CreateRequest, GetRequest, MkdirRequest, ReadDirectoryRequest, WriteRequest,
};

/// Per-call deadline.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client-side failure: either the transport broke, or the server answered
/// with a non-zero status.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("rpc failed: {0}")]
    Rpc(#[from] tonic::Status),

    /// The server processed the call and reported a filesystem error.
    /// `code` is the negative errno from the response status.
    #[error("remote error {code}: {message}")]
    Remote { code: i32, message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

fn check(code: i32, message: String) -> ClientResult<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(ClientError::Remote { code, message })
    }
}

/// Connection to one tailfs server.
pub struct TailClient {
    inner: FileSystemServiceClient<Channel>,
}

impl TailClient {
    /// Connect to `endpoint` (e.g. `http://127.0.0.1:50051`).
    pub async fn connect(endpoint: impl Into<String>) -> ClientResult<Self> {
        let endpoint = Endpoint::from_shared(endpoint.into())?.timeout(DEFAULT_TIMEOUT);
        let channel = endpoint.connect().await?;
        Ok(Self {
            inner: FileSystemServiceClient::new(channel),
        })
    }

    /// Create a zero-length file named `name` under the directory `parent`.
    pub async fn create(&mut self, parent: &str, name: &str, mode: u32) -> ClientResult<()> {
        debug!(parent, name, "create");
        let resp = self
            .inner
            .create(CreateRequest {
                pathname: parent.to_owned(),
                filename: name.to_owned(),
                mode,
            })
            .await?
            .into_inner();
        check(resp.status_code, resp.error_message)
    }

    /// Create a directory named `name` under the directory `parent`.
    pub async fn mkdir(&mut self, parent: &str, name: &str, mode: u32) -> ClientResult<()> {
        debug!(parent, name, "mkdir");
        let resp = self
            .inner
            .mkdir(MkdirRequest {
                pathname: parent.to_owned(),
                dirname: name.to_owned(),
                mode,
            })
            .await?
            .into_inner();
        check(resp.status_code, resp.error_message)
    }

    /// Append `data` to the file at `path` starting at `offset`; returns
    /// the number of bytes written.
    pub async fn write(&mut self, path: &str, data: Vec<u8>, offset: u64) -> ClientResult<u64> {
        debug!(path, offset, len = data.len(), "write");
        let resp = self
            .inner
            .write(WriteRequest {
                pathname: path.to_owned(),
                data,
                offset,
            })
            .await?
            .into_inner();
        check(resp.status_code, resp.error_message)?;
        Ok(resp.bytes_written)
    }

    /// Read `size` bytes at `offset` from the file at `path`. A size of 0
    /// reads to the end; reading at or past end of file yields no bytes.
    pub async fn get(&mut self, path: &str, offset: u64, size: u64) -> ClientResult<Vec<u8>> {
        debug!(path, offset, size, "get");
        let resp = self
            .inner
            .get(GetRequest {
                pathname: path.to_owned(),
                offset,
                size,
            })
            .await?
            .into_inner();
        check(resp.status_code, resp.error_message)?;
        Ok(resp.data)
    }

    /// List the directory at `path` in insertion order.
    pub async fn read_dir(&mut self, path: &str) -> ClientResult<Vec<FileEntry>> {
        debug!(path, "read_dir");
        let resp = self
            .inner
            .read_directory(ReadDirectoryRequest {
                pathname: path.to_owned(),
            })
            .await?
            .into_inner();
        check(resp.status_code, resp.error_message)?;
        Ok(resp.entries)
    }
}
