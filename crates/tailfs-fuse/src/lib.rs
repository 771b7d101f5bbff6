//! Kernel mount adapter.
//!
//! `TailFuse` translates the fuser callback vocabulary into calls against
//! the core facade. It holds no filesystem state of its own beyond the
//! per-open handle table; every semantic decision lives in `tailfs-core`,
//! and errors come back through the shared errno table.

pub mod convert;
pub mod handles;

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use fuser::{
    Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow,
};
use tracing::{debug, info};

use tailfs_core::{Fs, InodeId, TimeSpec};

use convert::{access_from_flags, to_fuse_attr, to_fuse_kind};
use handles::HandleTable;

/// How long the kernel may cache entries and attributes.
const TTL: Duration = Duration::from_secs(1);

/// The fuser-facing adapter over one filesystem instance.
pub struct TailFuse {
    fs: Arc<Fs>,
    handles: HandleTable,
}

impl TailFuse {
    pub fn new(fs: Arc<Fs>) -> Self {
        Self {
            fs,
            handles: HandleTable::new(),
        }
    }
}

/// Entry names arrive as OsStr; anything non-UTF-8 has no counterpart in
/// the tree.
fn name_str(name: &OsStr) -> Option<&str> {
    name.to_str()
}

/// True if a setattr request touches something fixed at creation: mode,
/// ownership, or size.
fn setattr_rejected(
    mode: Option<u32>,
    uid: Option<u32>,
    gid: Option<u32>,
    size: Option<u64>,
) -> bool {
    mode.is_some() || uid.is_some() || gid.is_some() || size.is_some()
}

fn time_spec(t: Option<TimeOrNow>) -> TimeSpec {
    match t {
        None => TimeSpec::Omit,
        Some(TimeOrNow::Now) => TimeSpec::Now,
        Some(TimeOrNow::SpecificTime(at)) => TimeSpec::Set(at),
    }
}

impl Filesystem for TailFuse {
    fn init(&mut self, _req: &Request, _config: &mut KernelConfig) -> Result<(), libc::c_int> {
        info!("tailfs mounted");
        Ok(())
    }

    fn destroy(&mut self) {
        // Backing units stay on disk: file contents survive a restart,
        // only the in-memory inode table does not.
        info!("tailfs unmounted");
    }

    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(name) = name_str(name) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.lookup(InodeId::new(parent), name) {
            Ok(attr) => reply.entry(&TTL, &to_fuse_attr(&attr), 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match self.fs.getattr_id(InodeId::new(ino)) {
            Ok(attr) => reply.attr(&TTL, &to_fuse_attr(&attr)),
            Err(e) => reply.error(e.errno()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        _req: &Request,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        // Mode and ownership are fixed at creation, and truncation does not
        // exist in an append-only filesystem. Rejecting beats a disguised
        // no-op: chmod must not appear to succeed.
        if setattr_rejected(mode, uid, gid, size) {
            reply.error(libc::EPERM);
            return;
        }
        if atime.is_none() && mtime.is_none() {
            match self.fs.getattr_id(InodeId::new(ino)) {
                Ok(attr) => reply.attr(&TTL, &to_fuse_attr(&attr)),
                Err(e) => reply.error(e.errno()),
            }
            return;
        }
        match self
            .fs
            .set_times_id(InodeId::new(ino), time_spec(atime), time_spec(mtime))
        {
            Ok(attr) => reply.attr(&TTL, &to_fuse_attr(&attr)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn open(&mut self, _req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        let access = access_from_flags(flags);
        match self.fs.open_id(InodeId::new(ino), access) {
            Ok(attr) => {
                let fh = self.handles.insert(attr.ino, access);
                debug!(ino, fh, ?access, "open");
                reply.opened(fh, 0);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn release(
        &mut self,
        _req: &Request,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        self.handles.remove(fh);
        reply.ok();
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        if self.handles.get(fh).is_none() {
            reply.error(libc::EBADF);
            return;
        }
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }
        match self.fs.read(InodeId::new(ino), offset as u64, size as usize) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn write(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let Some(handle) = self.handles.get(fh) else {
            reply.error(libc::EBADF);
            return;
        };
        if !handle.access.wants_write() {
            reply.error(libc::EBADF);
            return;
        }
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }
        match self.fs.write(InodeId::new(ino), offset as u64, data) {
            Ok(written) => reply.written(written as u32),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn create(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        let Some(name) = name_str(name) else {
            reply.error(libc::EINVAL);
            return;
        };
        match self.fs.create_at(InodeId::new(parent), name, mode) {
            Ok(attr) => {
                // A fresh file is empty, so every write through this handle
                // is an append regardless of the caller's flags.
                let mut access = access_from_flags(flags);
                if access.wants_write() {
                    access.append = true;
                }
                let fh = self.handles.insert(attr.ino, access);
                reply.created(&TTL, &to_fuse_attr(&attr), 0, fh, 0);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let Some(name) = name_str(name) else {
            reply.error(libc::EINVAL);
            return;
        };
        match self.fs.mkdir_at(InodeId::new(parent), name, mode) {
            Ok(attr) => reply.entry(&TTL, &to_fuse_attr(&attr), 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rmdir(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(name) = name_str(name) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.rmdir_at(InodeId::new(parent), name) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn unlink(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(name) = name_str(name) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.unlink_at(InodeId::new(parent), name) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rename(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let (Some(name), Some(newname)) = (name_str(name), name_str(newname)) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self
            .fs
            .rename_at(InodeId::new(parent), name, InodeId::new(newparent), newname)
        {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let children = match self.fs.readdir_id(InodeId::new(ino)) {
            Ok(children) => children,
            Err(e) => {
                reply.error(e.errno());
                return;
            }
        };

        // Dot entries first, then the real children in insertion order. The
        // kernel resolves ".." itself, so its inode number here is nominal.
        let dots = [
            (ino, fuser::FileType::Directory, ".".to_owned()),
            (ino, fuser::FileType::Directory, "..".to_owned()),
        ];
        let entries = dots.into_iter().chain(
            children
                .into_iter()
                .map(|e| (e.ino.as_u64(), to_fuse_kind(e.kind), e.name)),
        );

        for (i, (entry_ino, kind, name)) in entries.enumerate().skip(offset as usize) {
            // The offset handed back is the index of the next entry.
            if reply.add(entry_ino, (i + 1) as i64, kind, &name) {
                break;
            }
        }
        reply.ok();
    }
}
