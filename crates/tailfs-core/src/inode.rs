//! Inode records and the inode table.
//!
//! The table is an arena of slots indexed by id. Ids are issued ascending
//! starting at 1 (the root) and are never reused: a destroyed inode leaves
//! a hole, and the capacity limit counts ids issued, not live records.

use std::time::SystemTime;

use crate::config::FsConfig;
use crate::dir::Children;
use crate::error::{FsError, FsResult};
use crate::paths;
use crate::types::{BLOCK_SIZE, DIR_SIZE, FileAttr, FileKind, InodeId, Owner};

/// Identity and metadata for one filesystem object.
#[derive(Debug, Clone)]
pub struct Inode {
    pub id: InodeId,
    pub kind: FileKind,
    /// Permission bits only (0o777 mask applied at allocation).
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Committed bytes for files, nominal 4096 for directories.
    pub size: u64,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    /// Child entries; always empty for regular files.
    pub children: Children,
}

impl Inode {
    fn new(id: InodeId, kind: FileKind, mode: u32, owner: Owner, now: SystemTime) -> Self {
        let size = match kind {
            FileKind::Directory => DIR_SIZE,
            FileKind::RegularFile => 0,
        };
        Self {
            id,
            kind,
            mode: mode & 0o777,
            uid: owner.uid,
            gid: owner.gid,
            size,
            atime: now,
            mtime: now,
            ctime: now,
            children: Children::new(),
        }
    }

    /// Attribute snapshot in the shape both adapters report.
    pub fn attr(&self) -> FileAttr {
        FileAttr {
            ino: self.id,
            kind: self.kind,
            size: self.size,
            perm: self.mode,
            nlink: if self.kind.is_dir() { 2 } else { 1 },
            uid: self.uid,
            gid: self.gid,
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
            blksize: BLOCK_SIZE,
            blocks: (self.size + 511) / 512,
        }
    }

    /// Register `name -> child` and refresh this directory's mtime/ctime.
    pub fn add_child(
        &mut self,
        name: &str,
        child: InodeId,
        config: &FsConfig,
        now: SystemTime,
    ) -> FsResult<()> {
        if !self.kind.is_dir() {
            return Err(FsError::not_a_directory(format!("inode {}", self.id)));
        }
        paths::validate_name(name, config)?;
        self.children.add(name, child, config.max_children)?;
        self.mtime = now;
        self.ctime = now;
        Ok(())
    }

    /// Drop the entry matching both `name` and `child`, refresh mtime/ctime,
    /// and return the index it held.
    pub fn remove_child(&mut self, name: &str, child: InodeId, now: SystemTime) -> FsResult<usize> {
        if !self.kind.is_dir() {
            return Err(FsError::not_a_directory(format!("inode {}", self.id)));
        }
        let idx = self.children.remove(name, child)?;
        self.mtime = now;
        self.ctime = now;
        Ok(idx)
    }
}

/// Registry of every inode, the source of truth for the tree.
#[derive(Debug)]
pub struct InodeTable {
    /// Slot i holds the record for id i + 1, or None once destroyed.
    slots: Vec<Option<Inode>>,
    live: usize,
    max_inodes: usize,
}

impl InodeTable {
    pub fn new(max_inodes: usize) -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
            max_inodes,
        }
    }

    /// Issue the next id and install a fresh record for it.
    pub fn allocate(
        &mut self,
        kind: FileKind,
        mode: u32,
        owner: Owner,
        now: SystemTime,
    ) -> FsResult<InodeId> {
        if self.slots.len() >= self.max_inodes {
            return Err(FsError::resource_exhausted(format!(
                "inode table full ({} ids issued)",
                self.max_inodes
            )));
        }
        let id = InodeId::new(self.slots.len() as u64 + 1);
        self.slots.push(Some(Inode::new(id, kind, mode, owner, now)));
        self.live += 1;
        Ok(id)
    }

    fn slot(&self, id: InodeId) -> Option<&Inode> {
        if id.as_u64() == 0 {
            return None;
        }
        let idx = (id.as_u64() - 1) as usize;
        self.slots.get(idx)?.as_ref()
    }

    fn slot_mut(&mut self, id: InodeId) -> Option<&mut Inode> {
        if id.as_u64() == 0 {
            return None;
        }
        let idx = (id.as_u64() - 1) as usize;
        self.slots.get_mut(idx)?.as_mut()
    }

    pub fn get(&self, id: InodeId) -> FsResult<&Inode> {
        self.slot(id)
            .ok_or_else(|| FsError::not_found(format!("inode {id}")))
    }

    pub fn get_mut(&mut self, id: InodeId) -> FsResult<&mut Inode> {
        self.slot_mut(id)
            .ok_or_else(|| FsError::not_found(format!("inode {id}")))
    }

    pub fn contains(&self, id: InodeId) -> bool {
        self.slot(id).is_some()
    }

    /// Clear the record and return it; the id stays burned.
    pub fn destroy(&mut self, id: InodeId) -> FsResult<Inode> {
        if id.as_u64() == 0 {
            return Err(FsError::not_found(format!("inode {id}")));
        }
        let idx = (id.as_u64() - 1) as usize;
        let record = self
            .slots
            .get_mut(idx)
            .and_then(Option::take)
            .ok_or_else(|| FsError::not_found(format!("inode {id}")))?;
        self.live -= 1;
        Ok(record)
    }

    /// Live records.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Ids issued so far, including destroyed ones.
    pub fn issued(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> InodeTable {
        InodeTable::new(8)
    }

    fn owner() -> Owner {
        Owner::new(1000, 1000)
    }

    #[test]
    fn test_ids_ascend_from_one() {
        let mut t = table();
        let now = SystemTime::now();
        let a = t.allocate(FileKind::Directory, 0o755, owner(), now).unwrap();
        let b = t
            .allocate(FileKind::RegularFile, 0o644, owner(), now)
            .unwrap();
        assert_eq!(a, InodeId::ROOT);
        assert_eq!(b.as_u64(), 2);
        assert_eq!(t.live(), 2);
    }

    #[test]
    fn test_destroyed_ids_are_not_reused() {
        let mut t = table();
        let now = SystemTime::now();
        t.allocate(FileKind::Directory, 0o755, owner(), now).unwrap();
        let b = t
            .allocate(FileKind::RegularFile, 0o644, owner(), now)
            .unwrap();
        t.destroy(b).unwrap();

        let c = t
            .allocate(FileKind::RegularFile, 0o644, owner(), now)
            .unwrap();
        assert_eq!(c.as_u64(), 3);
        assert!(!t.contains(b));
        assert!(matches!(t.get(b), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_capacity_counts_issued_ids() {
        let mut t = InodeTable::new(2);
        let now = SystemTime::now();
        t.allocate(FileKind::Directory, 0o755, owner(), now).unwrap();
        let b = t
            .allocate(FileKind::RegularFile, 0o644, owner(), now)
            .unwrap();
        t.destroy(b).unwrap();

        // One live record, but both ids are burned.
        assert!(matches!(
            t.allocate(FileKind::RegularFile, 0o644, owner(), now),
            Err(FsError::ResourceExhausted(_))
        ));
    }

    #[test]
    fn test_get_unknown_ids() {
        let t = table();
        assert!(matches!(t.get(InodeId::new(0)), Err(FsError::NotFound(_))));
        assert!(matches!(t.get(InodeId::new(99)), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_mode_bits_masked() {
        let mut t = table();
        let now = SystemTime::now();
        let id = t
            .allocate(FileKind::RegularFile, 0o100644, owner(), now)
            .unwrap();
        assert_eq!(t.get(id).unwrap().mode, 0o644);
    }

    #[test]
    fn test_add_child_rejects_non_directory() {
        let mut t = table();
        let now = SystemTime::now();
        t.allocate(FileKind::Directory, 0o755, owner(), now).unwrap();
        let f = t
            .allocate(FileKind::RegularFile, 0o644, owner(), now)
            .unwrap();
        let cfg = FsConfig::new("/tmp/backing");
        let err = t
            .get_mut(f)
            .unwrap()
            .add_child("x", InodeId::new(9), &cfg, now);
        assert!(matches!(err, Err(FsError::NotADirectory(_))));
    }

    #[test]
    fn test_attr_shape() {
        let mut t = table();
        let now = SystemTime::now();
        let d = t.allocate(FileKind::Directory, 0o755, owner(), now).unwrap();
        let attr = t.get(d).unwrap().attr();
        assert_eq!(attr.nlink, 2);
        assert_eq!(attr.size, DIR_SIZE);
        assert_eq!(attr.blksize, BLOCK_SIZE);
        assert_eq!(attr.blocks, (DIR_SIZE + 511) / 512);
    }
}
