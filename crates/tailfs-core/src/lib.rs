//! Append-only virtual filesystem core.
//!
//! One logical directory tree whose files may only be extended, never
//! overwritten or truncated, backed by one flat storage unit per regular
//! file. This crate is the whole engine: the inode table, path resolution,
//! directory entry bookkeeping, the append-only storage engine, and the
//! [`Fs`] facade both front ends (the FUSE mount and the gRPC service)
//! consume.
//!
//! The core is synchronous and thread-safe. Adapters stay thin: they
//! translate their transport's vocabulary into facade calls and map
//! [`FsError`] into their native error shape via one shared errno table.

pub mod config;
pub mod dir;
pub mod error;
pub mod fs;
pub mod inode;
pub mod paths;
pub mod store;
pub mod types;

pub use config::FsConfig;
pub use error::{FsError, FsResult};
pub use fs::Fs;
pub use types::{
    AccessMode, BLOCK_SIZE, DIR_SIZE, DirEntry, FileAttr, FileKind, InodeId, Owner, TimeSpec,
};
