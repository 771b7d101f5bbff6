//! Conversions between core types and the fuser vocabulary.

use std::time::UNIX_EPOCH;

use tailfs_core::{AccessMode, FileAttr, FileKind};

/// Core attributes to the fuser reply shape.
pub fn to_fuse_attr(attr: &FileAttr) -> fuser::FileAttr {
    fuser::FileAttr {
        ino: attr.ino.as_u64(),
        size: attr.size,
        blocks: attr.blocks,
        atime: attr.atime,
        mtime: attr.mtime,
        ctime: attr.ctime,
        crtime: UNIX_EPOCH,
        kind: to_fuse_kind(attr.kind),
        perm: attr.perm as u16,
        nlink: attr.nlink,
        uid: attr.uid,
        gid: attr.gid,
        rdev: 0,
        blksize: attr.blksize,
        flags: 0,
    }
}

pub fn to_fuse_kind(kind: FileKind) -> fuser::FileType {
    match kind {
        FileKind::RegularFile => fuser::FileType::RegularFile,
        FileKind::Directory => fuser::FileType::Directory,
    }
}

/// Parse open(2) flags into the access the core understands.
///
/// Everything this filesystem cares about is the access mode and O_APPEND;
/// creation and truncation flags have no meaning here (create is its own
/// operation and truncation does not exist).
pub fn access_from_flags(flags: i32) -> AccessMode {
    let (read, write) = match flags & libc::O_ACCMODE {
        libc::O_WRONLY => (false, true),
        libc::O_RDWR => (true, true),
        _ => (true, false),
    };
    AccessMode {
        read,
        write,
        append: flags & libc::O_APPEND != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_from_flags() {
        let ro = access_from_flags(libc::O_RDONLY);
        assert!(ro.read && !ro.write);

        let wa = access_from_flags(libc::O_WRONLY | libc::O_APPEND);
        assert!(wa.write && wa.append && !wa.read);

        let rw = access_from_flags(libc::O_RDWR | libc::O_APPEND);
        assert!(rw.read && rw.write && rw.append);

        let bad = access_from_flags(libc::O_WRONLY);
        assert!(bad.write && !bad.append);
    }

    #[test]
    fn test_attr_conversion() {
        use std::time::SystemTime;
        use tailfs_core::InodeId;

        let now = SystemTime::now();
        let attr = FileAttr {
            ino: InodeId::new(7),
            kind: FileKind::RegularFile,
            size: 1024,
            perm: 0o644,
            nlink: 1,
            uid: 1000,
            gid: 1000,
            atime: now,
            mtime: now,
            ctime: now,
            blksize: 4096,
            blocks: 2,
        };
        let fuse = to_fuse_attr(&attr);
        assert_eq!(fuse.ino, 7);
        assert_eq!(fuse.perm, 0o644);
        assert_eq!(fuse.kind, fuser::FileType::RegularFile);
        assert_eq!(fuse.blocks, 2);
    }
}
