//! The filesystem facade.
//!
//! `Fs` owns the inode table behind one `RwLock` and exposes the fixed
//! operation set both adapters consume: path-addressed operations for the
//! remote service and id-addressed companions for the kernel mount, which
//! speaks inode numbers after the initial lookup. Both go through the same
//! internals, so semantics cannot drift between front ends.
//!
//! Locking: any operation that allocates or destroys an inode, mutates a
//! directory's child list, or appends to a file holds the write lock for its
//! whole duration. A `write` call's offset check, gap zero-fill, payload
//! append, and size update happen under one lock acquisition and are observed
//! as a single atomic unit. `open` and `read` also take the write lock: they
//! refresh atime, and `read` must clip against a size that matches committed
//! bytes. Pure metadata reads (resolve, getattr, readdir, lookup) take the
//! read lock.

use std::time::SystemTime;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::FsConfig;
use crate::error::{FsError, FsResult};
use crate::inode::InodeTable;
use crate::paths;
use crate::store::BackingStore;
use crate::types::{AccessMode, DirEntry, FileAttr, FileKind, InodeId, Owner, TimeSpec};

/// One append-only filesystem instance.
///
/// Construct once, share via `Arc`, and call from as many threads as needed.
/// Independent instances (separate backing roots) do not interact, which is
/// what isolated tests rely on.
pub struct Fs {
    config: FsConfig,
    store: BackingStore,
    owner: Owner,
    table: RwLock<InodeTable>,
}

impl Fs {
    /// Create a filesystem owned by the current process uid/gid.
    ///
    /// Creates the backing root directory if missing and installs the root
    /// inode (id 1, mode 0o755).
    pub fn new(config: FsConfig) -> FsResult<Self> {
        Self::with_owner(config, Owner::process())
    }

    /// Create a filesystem with an explicit owner for new objects.
    pub fn with_owner(config: FsConfig, owner: Owner) -> FsResult<Self> {
        let store = BackingStore::new(config.backing_root.clone());
        store.ensure_root()?;

        let mut table = InodeTable::new(config.max_inodes);
        let root = table.allocate(FileKind::Directory, 0o755, owner, SystemTime::now())?;
        debug_assert_eq!(root, InodeId::ROOT);

        debug!(backing_root = %store.root().display(), "filesystem initialized");
        Ok(Self {
            config,
            store,
            owner,
            table: RwLock::new(table),
        })
    }

    /// The configuration this instance was built with.
    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Resolution and metadata (read lock)
    // ------------------------------------------------------------------

    /// Resolve an absolute path to an inode id.
    pub fn resolve(&self, path: &str) -> FsResult<InodeId> {
        let table = self.table.read();
        self.resolve_in(&table, path)
    }

    /// Attributes for the object at `path`.
    pub fn getattr(&self, path: &str) -> FsResult<FileAttr> {
        let table = self.table.read();
        let id = self.resolve_in(&table, path)?;
        Ok(table.get(id)?.attr())
    }

    /// Attributes for an inode id.
    pub fn getattr_id(&self, ino: InodeId) -> FsResult<FileAttr> {
        Ok(self.table.read().get(ino)?.attr())
    }

    /// Attributes for `name` inside the directory `parent`.
    ///
    /// The kernel adapter's entry point: everything after the first lookup
    /// is addressed by inode number.
    pub fn lookup(&self, parent: InodeId, name: &str) -> FsResult<FileAttr> {
        let table = self.table.read();
        let dir = table.get(parent)?;
        if !dir.kind.is_dir() {
            return Err(FsError::not_a_directory(format!("inode {parent}")));
        }
        let child = dir
            .children
            .find(name)
            .ok_or_else(|| FsError::not_found(name))?;
        Ok(table.get(child)?.attr())
    }

    /// List the directory at `path` in insertion order.
    pub fn readdir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        let table = self.table.read();
        let id = self.resolve_in(&table, path)?;
        Self::readdir_in(&table, id)
    }

    /// List a directory by inode id in insertion order.
    pub fn readdir_id(&self, ino: InodeId) -> FsResult<Vec<DirEntry>> {
        let table = self.table.read();
        Self::readdir_in(&table, ino)
    }

    // ------------------------------------------------------------------
    // Open / read / write
    // ------------------------------------------------------------------

    /// Open the file at `path`, gating on append intent.
    pub fn open(&self, path: &str, access: AccessMode) -> FsResult<FileAttr> {
        let id = self.resolve(path)?;
        self.open_id(id, access)
    }

    /// Open a file by inode id.
    ///
    /// Any write capability without declared append intent is rejected
    /// before storage is touched: this filesystem only ever appends.
    pub fn open_id(&self, ino: InodeId, access: AccessMode) -> FsResult<FileAttr> {
        if access.wants_write() && !access.append {
            return Err(FsError::permission_denied(
                "write access requires append intent",
            ));
        }
        let mut table = self.table.write();
        let inode = table.get_mut(ino)?;
        if inode.kind.is_dir() {
            return Err(FsError::is_a_directory(format!("inode {ino}")));
        }
        inode.atime = SystemTime::now();
        debug!(ino = %ino, ?access, "open");
        Ok(inode.attr())
    }

    /// Read up to `len` bytes at `offset` from the file at `path`.
    pub fn read_path(&self, path: &str, offset: u64, len: usize) -> FsResult<Vec<u8>> {
        let id = self.resolve(path)?;
        self.read(id, offset, len)
    }

    /// Read up to `len` bytes at `offset`, clipped to the committed size.
    ///
    /// An offset at or past end of file yields zero bytes, not an error.
    pub fn read(&self, ino: InodeId, offset: u64, len: usize) -> FsResult<Vec<u8>> {
        let mut table = self.table.write();
        let inode = table.get_mut(ino)?;
        if inode.kind.is_dir() {
            return Err(FsError::is_a_directory(format!("inode {ino}")));
        }
        if offset >= inode.size {
            return Ok(Vec::new());
        }
        let want = len.min((inode.size - offset) as usize);
        let bytes = self.store.read_at(ino, offset, want)?;
        inode.atime = SystemTime::now();
        debug!(ino = %ino, offset, read = bytes.len(), "read");
        Ok(bytes)
    }

    /// Append `data` to the file at `path`, starting at `offset`.
    pub fn write_path(&self, path: &str, offset: u64, data: &[u8]) -> FsResult<u64> {
        let id = self.resolve(path)?;
        self.write(id, offset, data)
    }

    /// Append `data` at `offset`, zero-filling any gap past end of file.
    ///
    /// Offsets below the current size are rejected outright: committed bytes
    /// are immutable and nothing is written. On a fault mid-append the
    /// recorded size advances by exactly the bytes that reached the unit
    /// (gap zeros included), so it never lies about committed data, and the
    /// [`FsError::ShortWrite`] carries the payload bytes that landed; the
    /// caller re-queries size before retrying.
    pub fn write(&self, ino: InodeId, offset: u64, data: &[u8]) -> FsResult<u64> {
        let mut table = self.table.write();
        let inode = table.get_mut(ino)?;
        if inode.kind.is_dir() {
            return Err(FsError::is_a_directory(format!("inode {ino}")));
        }
        if offset < inode.size {
            return Err(FsError::permission_denied(format!(
                "offset {offset} is before end of file ({}); existing bytes are immutable",
                inode.size
            )));
        }

        let gap = offset - inode.size;
        let outcome = self.store.append(ino, gap, data);
        if outcome.committed > 0 {
            let now = SystemTime::now();
            inode.size += outcome.committed;
            inode.mtime = now;
            inode.ctime = now;
        }
        match outcome.fault {
            Some(fault) => {
                // Counted under the write lock, so a concurrent append
                // cannot inflate it.
                let committed = outcome.committed.saturating_sub(gap);
                warn!(ino = %ino, offset, committed, %fault, "short write");
                Err(FsError::ShortWrite {
                    committed,
                    source: fault,
                })
            }
            None => {
                debug!(ino = %ino, offset, gap, len = data.len(), size = inode.size, "write");
                Ok(data.len() as u64)
            }
        }
    }

    // ------------------------------------------------------------------
    // Structural mutation (write lock)
    // ------------------------------------------------------------------

    /// Create a zero-length file at `path`.
    pub fn create(&self, path: &str, mode: u32) -> FsResult<FileAttr> {
        // Validate the full path before the existence check: a path the
        // resolver refuses to address must never be creatable.
        paths::validate_path(path, &self.config)?;
        let mut table = self.table.write();
        if self.resolve_in(&table, path).is_ok() {
            return Err(FsError::already_exists(path));
        }
        let (parent_path, leaf) = paths::split_parent(path);
        // Per the operation contract, a parent that is missing or is not a
        // directory both report NotFound for create.
        let parent = self.resolve_in(&table, parent_path)?;
        if !table.get(parent)?.kind.is_dir() {
            return Err(FsError::not_found(parent_path));
        }
        self.create_in(&mut table, parent, leaf, mode)
    }

    /// Create a zero-length file named `name` inside the directory `parent`.
    pub fn create_at(&self, parent: InodeId, name: &str, mode: u32) -> FsResult<FileAttr> {
        let mut table = self.table.write();
        self.create_in(&mut table, parent, name, mode)
    }

    /// Create a directory at `path`.
    pub fn mkdir(&self, path: &str, mode: u32) -> FsResult<FileAttr> {
        paths::validate_path(path, &self.config)?;
        let mut table = self.table.write();
        if self.resolve_in(&table, path).is_ok() {
            return Err(FsError::already_exists(path));
        }
        let (parent_path, leaf) = paths::split_parent(path);
        let parent = self.resolve_in(&table, parent_path)?;
        self.mkdir_in(&mut table, parent, leaf, mode)
    }

    /// Create a directory named `name` inside the directory `parent`.
    pub fn mkdir_at(&self, parent: InodeId, name: &str, mode: u32) -> FsResult<FileAttr> {
        let mut table = self.table.write();
        self.mkdir_in(&mut table, parent, name, mode)
    }

    /// Remove the empty directory at `path`. The root cannot be removed.
    pub fn rmdir(&self, path: &str) -> FsResult<()> {
        let mut table = self.table.write();
        let id = self.resolve_in(&table, path)?;
        if id.is_root() {
            return Err(FsError::busy("/"));
        }
        let (parent_path, leaf) = paths::split_parent(path);
        let parent = self.resolve_in(&table, parent_path)?;
        self.rmdir_in(&mut table, parent, leaf)
    }

    /// Remove the empty directory named `name` inside `parent`.
    pub fn rmdir_at(&self, parent: InodeId, name: &str) -> FsResult<()> {
        let mut table = self.table.write();
        self.rmdir_in(&mut table, parent, name)
    }

    /// Remove the file at `path`, destroying its backing unit.
    pub fn unlink(&self, path: &str) -> FsResult<()> {
        let mut table = self.table.write();
        let id = self.resolve_in(&table, path)?;
        if id.is_root() {
            return Err(FsError::is_a_directory("/"));
        }
        let (parent_path, leaf) = paths::split_parent(path);
        let parent = self.resolve_in(&table, parent_path)?;
        self.unlink_in(&mut table, parent, leaf)
    }

    /// Remove the file named `name` inside `parent`.
    pub fn unlink_at(&self, parent: InodeId, name: &str) -> FsResult<()> {
        let mut table = self.table.write();
        self.unlink_in(&mut table, parent, name)
    }

    /// Move `from` to `to`. No implicit overwrite; the move is atomic.
    pub fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        paths::validate_path(to, &self.config)?;
        let mut table = self.table.write();
        let src = self.resolve_in(&table, from)?;
        if src.is_root() {
            return Err(FsError::busy("/"));
        }
        if self.resolve_in(&table, to).is_ok() {
            return Err(FsError::already_exists(to));
        }
        let (from_parent_path, from_leaf) = paths::split_parent(from);
        let (to_parent_path, to_leaf) = paths::split_parent(to);
        let from_parent = self.resolve_in(&table, from_parent_path)?;
        let to_parent = self.resolve_in(&table, to_parent_path)?;
        self.rename_in(&mut table, from_parent, from_leaf, to_parent, to_leaf)
    }

    /// Move `parent`/`name` to `newparent`/`newname` by inode id.
    pub fn rename_at(
        &self,
        parent: InodeId,
        name: &str,
        newparent: InodeId,
        newname: &str,
    ) -> FsResult<()> {
        let mut table = self.table.write();
        self.rename_in(&mut table, parent, name, newparent, newname)
    }

    /// Update access/modify times at `path`. ctime always refreshes to now.
    pub fn set_times(&self, path: &str, atime: TimeSpec, mtime: TimeSpec) -> FsResult<FileAttr> {
        let id = self.resolve(path)?;
        self.set_times_id(id, atime, mtime)
    }

    /// Update access/modify times by inode id.
    pub fn set_times_id(
        &self,
        ino: InodeId,
        atime: TimeSpec,
        mtime: TimeSpec,
    ) -> FsResult<FileAttr> {
        let mut table = self.table.write();
        let inode = table.get_mut(ino)?;
        let now = SystemTime::now();
        if let Some(t) = atime.resolve(now) {
            inode.atime = t;
        }
        if let Some(t) = mtime.resolve(now) {
            inode.mtime = t;
        }
        inode.ctime = now;
        Ok(inode.attr())
    }

    // ------------------------------------------------------------------
    // Internals (lock already held)
    // ------------------------------------------------------------------

    fn resolve_in(&self, table: &InodeTable, path: &str) -> FsResult<InodeId> {
        paths::validate_path(path, &self.config)?;
        let mut current = InodeId::ROOT;
        for segment in paths::segments(path) {
            let inode = table.get(current)?;
            if !inode.kind.is_dir() {
                return Err(FsError::not_a_directory(path));
            }
            current = inode
                .children
                .find(segment)
                .ok_or_else(|| FsError::not_found(path))?;
        }
        Ok(current)
    }

    fn readdir_in(table: &InodeTable, ino: InodeId) -> FsResult<Vec<DirEntry>> {
        let dir = table.get(ino)?;
        if !dir.kind.is_dir() {
            return Err(FsError::not_a_directory(format!("inode {ino}")));
        }
        let mut entries = Vec::with_capacity(dir.children.len());
        for child in dir.children.iter() {
            let inode = table.get(child.id)?;
            entries.push(DirEntry {
                name: child.name.clone(),
                ino: inode.id,
                kind: inode.kind,
                size: inode.size,
                mtime: inode.mtime,
            });
        }
        Ok(entries)
    }

    fn create_in(
        &self,
        table: &mut InodeTable,
        parent: InodeId,
        name: &str,
        mode: u32,
    ) -> FsResult<FileAttr> {
        let dir = table.get(parent)?;
        if !dir.kind.is_dir() {
            return Err(FsError::not_a_directory(format!("inode {parent}")));
        }
        paths::validate_name(name, &self.config)?;
        if dir.children.contains(name) {
            return Err(FsError::already_exists(name));
        }

        let now = SystemTime::now();
        let id = table.allocate(FileKind::RegularFile, mode, self.owner, now)?;
        if let Err(e) = self.store.create_unit(id) {
            table.destroy(id)?;
            return Err(e);
        }
        if let Err(e) = table.get_mut(parent)?.add_child(name, id, &self.config, now) {
            // Roll back so no unreachable inode or orphaned unit remains.
            if let Err(cleanup) = self.store.remove_unit(id) {
                warn!(ino = %id, %cleanup, "failed to remove unit during create rollback");
            }
            table.destroy(id)?;
            return Err(e);
        }
        debug!(ino = %id, parent = %parent, name, mode = format_args!("{mode:o}"), "create");
        Ok(table.get(id)?.attr())
    }

    fn mkdir_in(
        &self,
        table: &mut InodeTable,
        parent: InodeId,
        name: &str,
        mode: u32,
    ) -> FsResult<FileAttr> {
        let dir = table.get(parent)?;
        if !dir.kind.is_dir() {
            return Err(FsError::not_a_directory(format!("inode {parent}")));
        }
        paths::validate_name(name, &self.config)?;
        if dir.children.contains(name) {
            return Err(FsError::already_exists(name));
        }

        let now = SystemTime::now();
        let id = table.allocate(FileKind::Directory, mode, self.owner, now)?;
        if let Err(e) = table.get_mut(parent)?.add_child(name, id, &self.config, now) {
            table.destroy(id)?;
            return Err(e);
        }
        debug!(ino = %id, parent = %parent, name, mode = format_args!("{mode:o}"), "mkdir");
        Ok(table.get(id)?.attr())
    }

    fn rmdir_in(&self, table: &mut InodeTable, parent: InodeId, name: &str) -> FsResult<()> {
        let dir = table.get(parent)?;
        if !dir.kind.is_dir() {
            return Err(FsError::not_a_directory(format!("inode {parent}")));
        }
        let id = dir
            .children
            .find(name)
            .ok_or_else(|| FsError::not_found(name))?;
        let target = table.get(id)?;
        if !target.kind.is_dir() {
            return Err(FsError::not_a_directory(name));
        }
        if !target.children.is_empty() {
            return Err(FsError::not_empty(name));
        }

        let now = SystemTime::now();
        table.get_mut(parent)?.remove_child(name, id, now)?;
        table.destroy(id)?;
        debug!(ino = %id, parent = %parent, name, "rmdir");
        Ok(())
    }

    fn unlink_in(&self, table: &mut InodeTable, parent: InodeId, name: &str) -> FsResult<()> {
        let dir = table.get(parent)?;
        if !dir.kind.is_dir() {
            return Err(FsError::not_a_directory(format!("inode {parent}")));
        }
        let id = dir
            .children
            .find(name)
            .ok_or_else(|| FsError::not_found(name))?;
        if table.get(id)?.kind.is_dir() {
            return Err(FsError::is_a_directory(name));
        }

        let now = SystemTime::now();
        table.get_mut(parent)?.remove_child(name, id, now)?;
        table.destroy(id)?;
        self.store.remove_unit(id)?;
        debug!(ino = %id, parent = %parent, name, "unlink");
        Ok(())
    }

    /// The atomic move: validate the destination fully before unhooking the
    /// source, so a partial rename can never leave an inode unreachable.
    fn rename_in(
        &self,
        table: &mut InodeTable,
        parent: InodeId,
        name: &str,
        newparent: InodeId,
        newname: &str,
    ) -> FsResult<()> {
        let src_dir = table.get(parent)?;
        if !src_dir.kind.is_dir() {
            return Err(FsError::not_a_directory(format!("inode {parent}")));
        }
        let src = src_dir
            .children
            .find(name)
            .ok_or_else(|| FsError::not_found(name))?;

        let dest_dir = table.get(newparent)?;
        if !dest_dir.kind.is_dir() {
            return Err(FsError::not_a_directory(format!("inode {newparent}")));
        }
        paths::validate_name(newname, &self.config)?;
        if dest_dir.children.contains(newname) {
            return Err(FsError::already_exists(newname));
        }
        if parent != newparent && dest_dir.children.len() >= self.config.max_children {
            return Err(FsError::resource_exhausted(format!(
                "directory full ({} entries)",
                self.config.max_children
            )));
        }
        // Moving a directory under itself would detach it from the root.
        if table.get(src)?.kind.is_dir() && (src == newparent || Self::is_reachable_from(table, src, newparent)) {
            return Err(FsError::invalid_path(
                "cannot move a directory into its own subtree",
            ));
        }

        let now = SystemTime::now();
        let index = table.get_mut(parent)?.remove_child(name, src, now)?;
        if let Err(e) = table
            .get_mut(newparent)?
            .add_child(newname, src, &self.config, now)
        {
            // Validated above, so this is unexpected; restore the source
            // entry at its old position rather than orphan the inode.
            warn!(ino = %src, %e, "rename add step failed after validation, restoring source entry");
            table.get_mut(parent)?.children.insert(index, name, src);
            return Err(e);
        }

        let moved = table.get_mut(src)?;
        moved.atime = now;
        moved.mtime = now;
        debug!(ino = %src, from = name, to = newname, "rename");
        Ok(())
    }

    /// True if `target` sits anywhere in the subtree rooted at `root`.
    fn is_reachable_from(table: &InodeTable, root: InodeId, target: InodeId) -> bool {
        let Ok(inode) = table.get(root) else {
            return false;
        };
        for child in inode.children.iter() {
            if child.id == target || Self::is_reachable_from(table, child.id, target) {
                return true;
            }
        }
        false
    }
}
