//! Flat backing storage, one unit per regular file.
//!
//! Units live at `<backing_root>/inode_<id>` and only ever grow. The store
//! is stateless; sizes and locking live with the inode table. On a fault
//! mid-append the caller learns exactly how many bytes reached the unit so
//! the recorded size can stay truthful.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::FsResult;
use crate::types::InodeId;

/// Zero-fill chunk size for sparse gaps.
const ZERO_CHUNK: usize = 4096;

/// Outcome of an append against one unit.
#[derive(Debug)]
pub struct AppendOutcome {
    /// Zero-fill plus payload bytes that reached the unit.
    pub committed: u64,
    /// The error that stopped the append, or None on full success.
    pub fault: Option<io::Error>,
}

impl AppendOutcome {
    fn fault(committed: u64, err: io::Error) -> Self {
        Self {
            committed,
            fault: Some(err),
        }
    }
}

/// Backing-unit storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct BackingStore {
    root: PathBuf,
}

impl BackingStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the backing root directory if it is missing.
    pub fn ensure_root(&self) -> FsResult<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Deterministic unit path for an inode id.
    pub fn locator(&self, id: InodeId) -> PathBuf {
        self.root.join(format!("inode_{id}"))
    }

    /// Create the unit for a fresh inode, truncating any stale unit a
    /// previous process left at the same locator.
    pub fn create_unit(&self, id: InodeId) -> FsResult<()> {
        File::create(self.locator(id))?;
        debug!(ino = id.as_u64(), "created backing unit");
        Ok(())
    }

    /// Remove a unit. Missing units are fine: directories never had one.
    pub fn remove_unit(&self, id: InodeId) -> FsResult<()> {
        match fs::remove_file(self.locator(id)) {
            Ok(()) => {
                debug!(ino = id.as_u64(), "removed backing unit");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read up to `len` bytes starting at `offset`. The caller clips `len`
    /// to the recorded size; the unit is never longer than that.
    pub fn read_at(&self, id: InodeId, offset: u64, len: usize) -> FsResult<Vec<u8>> {
        let mut file = File::open(self.locator(id))?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::with_capacity(len);
        file.take(len as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Append `gap` zero bytes then `data` to the end of the unit.
    ///
    /// Never returns early with an untracked byte: `committed` counts
    /// exactly what was written before any fault.
    pub fn append(&self, id: InodeId, gap: u64, data: &[u8]) -> AppendOutcome {
        let mut file = match OpenOptions::new().append(true).open(self.locator(id)) {
            Ok(f) => f,
            Err(e) => return AppendOutcome::fault(0, e),
        };

        let mut committed = 0u64;

        let zeros = [0u8; ZERO_CHUNK];
        let mut gap_left = gap;
        while gap_left > 0 {
            let chunk = gap_left.min(ZERO_CHUNK as u64) as usize;
            match file.write(&zeros[..chunk]) {
                Ok(0) => return AppendOutcome::fault(committed, short_write()),
                Ok(n) => {
                    committed += n as u64;
                    gap_left -= n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return AppendOutcome::fault(committed, e),
            }
        }

        let mut written = 0usize;
        while written < data.len() {
            match file.write(&data[written..]) {
                Ok(0) => return AppendOutcome::fault(committed, short_write()),
                Ok(n) => {
                    written += n;
                    committed += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return AppendOutcome::fault(committed, e),
            }
        }

        AppendOutcome {
            committed,
            fault: None,
        }
    }
}

fn short_write() -> io::Error {
    io::Error::new(io::ErrorKind::WriteZero, "short write to backing unit")
}
