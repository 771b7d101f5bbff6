//! Per-open handle table.
//!
//! The kernel addresses an open file by the fh we hand back from open and
//! create. Each entry remembers the resolved inode and the access the open
//! was granted, so read and write can check capability without re-parsing
//! flags.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tailfs_core::{AccessMode, InodeId};

/// What one open handle is allowed to do.
#[derive(Debug, Clone, Copy)]
pub struct OpenHandle {
    pub ino: InodeId,
    pub access: AccessMode,
}

/// Concurrent fh -> handle map.
#[derive(Debug, Default)]
pub struct HandleTable {
    handles: DashMap<u64, OpenHandle>,
    next_fh: AtomicU64,
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            handles: DashMap::new(),
            next_fh: AtomicU64::new(1),
        }
    }

    /// Register an open and return its fh.
    pub fn insert(&self, ino: InodeId, access: AccessMode) -> u64 {
        let fh = self.next_fh.fetch_add(1, Ordering::Relaxed);
        self.handles.insert(fh, OpenHandle { ino, access });
        fh
    }

    pub fn get(&self, fh: u64) -> Option<OpenHandle> {
        self.handles.get(&fh).map(|h| *h)
    }

    pub fn remove(&self, fh: u64) {
        self.handles.remove(&fh);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
