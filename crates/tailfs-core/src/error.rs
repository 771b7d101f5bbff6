//! Filesystem error types.

use std::io;
use thiserror::Error;

/// Filesystem error type.
///
/// Every operation failure is one of these variants; adapters translate them
/// with [`FsError::errno`] (kernel mount) or status/message fields (remote).
#[derive(Debug, Error)]
pub enum FsError {
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Directory not empty.
    #[error("directory not empty: {0}")]
    NotEmpty(String),

    /// Write rejected: non-append open, or offset before end of file.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Inode table or directory child list is at capacity.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The root directory cannot be removed or moved.
    #[error("busy: {0}")]
    Busy(String),

    /// Name exceeds the configured limit.
    #[error("name too long: {0}")]
    NameTooLong(String),

    /// Invalid path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Backing store operation failed or came up short.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Append stopped before the full payload reached the backing unit.
    #[error("short write: {committed} payload bytes committed: {source}")]
    ShortWrite {
        /// Payload bytes committed before the fault, zero-fill excluded.
        committed: u64,
        source: io::Error,
    },
}

impl FsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create a NotEmpty error.
    pub fn not_empty(path: impl Into<String>) -> Self {
        Self::NotEmpty(path.into())
    }

    /// Create a PermissionDenied error.
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Create a ResourceExhausted error.
    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    /// Create a Busy error.
    pub fn busy(path: impl Into<String>) -> Self {
        Self::Busy(path.into())
    }

    /// Create a NameTooLong error.
    pub fn name_too_long(name: impl Into<String>) -> Self {
        Self::NameTooLong(name.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// The errno both adapters report for this error.
    ///
    /// The kernel mount replies with it directly; the remote service negates
    /// it into the response status field. One table so the two cannot drift.
    pub fn errno(&self) -> i32 {
        match self {
            Self::NotFound(_) => libc::ENOENT,
            Self::AlreadyExists(_) => libc::EEXIST,
            Self::NotADirectory(_) => libc::ENOTDIR,
            Self::IsADirectory(_) => libc::EISDIR,
            Self::NotEmpty(_) => libc::ENOTEMPTY,
            Self::PermissionDenied(_) => libc::EPERM,
            Self::ResourceExhausted(_) => libc::ENOSPC,
            Self::Busy(_) => libc::EBUSY,
            Self::NameTooLong(_) => libc::ENAMETOOLONG,
            Self::InvalidPath(_) => libc::EINVAL,
            Self::Io(_) | Self::ShortWrite { .. } => libc::EIO,
        }
    }
}

/// Convert FsError to std::io::Error for callers that speak io.
impl From<FsError> for io::Error {
    fn from(e: FsError) -> Self {
        match e {
            FsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            FsError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            FsError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            FsError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            FsError::NotEmpty(msg) => io::Error::new(io::ErrorKind::DirectoryNotEmpty, msg),
            FsError::PermissionDenied(msg) => {
                io::Error::new(io::ErrorKind::PermissionDenied, msg)
            }
            FsError::ResourceExhausted(msg) => {
                io::Error::new(io::ErrorKind::StorageFull, msg)
            }
            FsError::Busy(msg) => io::Error::new(io::ErrorKind::ResourceBusy, msg),
            FsError::NameTooLong(msg) => io::Error::new(io::ErrorKind::InvalidFilename, msg),
            FsError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            FsError::Io(e) => e,
            FsError::ShortWrite { source, .. } => source,
        }
    }
}

/// Filesystem result type.
pub type FsResult<T> = Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_is_stable_per_variant() {
        assert_eq!(FsError::not_found("/x").errno(), libc::ENOENT);
        assert_eq!(FsError::already_exists("/x").errno(), libc::EEXIST);
        assert_eq!(FsError::not_a_directory("/x").errno(), libc::ENOTDIR);
        assert_eq!(FsError::is_a_directory("/x").errno(), libc::EISDIR);
        assert_eq!(FsError::not_empty("/x").errno(), libc::ENOTEMPTY);
        assert_eq!(FsError::permission_denied("w").errno(), libc::EPERM);
        assert_eq!(FsError::resource_exhausted("full").errno(), libc::ENOSPC);
        assert_eq!(FsError::busy("/").errno(), libc::EBUSY);
        assert_eq!(FsError::name_too_long("n").errno(), libc::ENAMETOOLONG);
        assert_eq!(FsError::invalid_path("").errno(), libc::EINVAL);
        let io_err = FsError::Io(io::Error::other("disk"));
        assert_eq!(io_err.errno(), libc::EIO);
        let short = FsError::ShortWrite {
            committed: 3,
            source: io::Error::other("disk"),
        };
        assert_eq!(short.errno(), libc::EIO);
    }

    #[test]
    fn io_error_kind_round_trip() {
        let e: io::Error = FsError::not_found("/gone").into();
        assert_eq!(e.kind(), io::ErrorKind::NotFound);

        let e: io::Error = FsError::not_empty("/d").into();
        assert_eq!(e.kind(), io::ErrorKind::DirectoryNotEmpty);
    }
}
