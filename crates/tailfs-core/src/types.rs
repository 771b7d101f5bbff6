//! Core filesystem types.
//!
//! Inode-addressed: the kernel adapter hands these straight to the mount
//! layer, the remote adapter flattens them into response messages.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Nominal block size reported for every object.
pub const BLOCK_SIZE: u32 = 4096;

/// Nominal size reported for directories.
pub const DIR_SIZE: u64 = 4096;

/// Inode identifier.
///
/// Assigned once at allocation, ascending, never reused while the process
/// lives. The root is always id 1. Ids double as kernel inode numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InodeId(u64);

impl InodeId {
    /// The root directory.
    pub const ROOT: InodeId = InodeId(1);

    pub fn new(raw: u64) -> Self {
        InodeId(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl fmt::Display for InodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for InodeId {
    fn from(raw: u64) -> Self {
        InodeId(raw)
    }
}

/// File kind enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    /// Regular file backed by one flat storage unit.
    RegularFile,
    /// Directory holding (name, child id) entries.
    Directory,
}

impl FileKind {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileKind::RegularFile)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileKind::Directory)
    }
}

/// File attributes (metadata snapshot).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAttr {
    /// Inode id; also the kernel inode number and per-open handle.
    pub ino: InodeId,
    /// File kind.
    pub kind: FileKind,
    /// Size in bytes: committed bytes for files, nominal 4096 for directories.
    pub size: u64,
    /// Unix permission bits (e.g. 0o644), type bits excluded.
    pub perm: u32,
    /// Number of hard links: 2 for directories, 1 for files.
    pub nlink: u32,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
    /// Last access time.
    pub atime: SystemTime,
    /// Last modification time.
    pub mtime: SystemTime,
    /// Last status change time.
    pub ctime: SystemTime,
    /// Reported block size.
    pub blksize: u32,
    /// 512-byte blocks occupied, rounded up.
    pub blocks: u64,
}

impl FileAttr {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Directory entry as returned by readdir.
///
/// Carries enough metadata for a remote listing without a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name (not a full path).
    pub name: String,
    /// Child inode id.
    pub ino: InodeId,
    /// Child kind.
    pub kind: FileKind,
    /// Child size in bytes.
    pub size: u64,
    /// Child modification time.
    pub mtime: SystemTime,
}

/// Requested access for an open call.
///
/// There is no create/truncate/exclusive here: files only ever grow, and
/// creation is its own operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessMode {
    /// Read access requested.
    pub read: bool,
    /// Write access requested.
    pub write: bool,
    /// Append intent declared.
    pub append: bool,
}

impl Default for AccessMode {
    fn default() -> Self {
        Self {
            read: true,
            write: false,
            append: false,
        }
    }
}

impl AccessMode {
    /// Read-only access.
    pub fn read_only() -> Self {
        Self::default()
    }

    /// Write access with append intent.
    pub fn write_append() -> Self {
        Self {
            read: false,
            write: true,
            append: true,
        }
    }

    /// Read and write access with append intent.
    pub fn read_write_append() -> Self {
        Self {
            read: true,
            write: true,
            append: true,
        }
    }

    /// Write access without append intent. Opens with this are rejected.
    pub fn write_no_append() -> Self {
        Self {
            read: false,
            write: true,
            append: false,
        }
    }

    /// Returns true if any write capability is requested.
    pub fn wants_write(&self) -> bool {
        self.write
    }
}

/// One timestamp field of a set_times call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSpec {
    /// Set the field to the current time.
    Now,
    /// Leave the field unchanged.
    Omit,
    /// Set the field to an explicit time.
    Set(SystemTime),
}

impl TimeSpec {
    /// The value to store, or None to leave the field alone.
    pub fn resolve(self, now: SystemTime) -> Option<SystemTime> {
        match self {
            TimeSpec::Now => Some(now),
            TimeSpec::Omit => None,
            TimeSpec::Set(t) => Some(t),
        }
    }
}

/// Ownership assigned to newly created objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

impl Owner {
    pub fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    /// Ownership of the current process.
    pub fn process() -> Self {
        Self {
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
        }
    }
}
