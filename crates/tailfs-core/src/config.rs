//! Filesystem configuration.

use std::path::PathBuf;

/// Default inode table capacity (ids issued over the process lifetime).
pub const DEFAULT_MAX_INODES: usize = 4096;

/// Default per-directory child capacity.
pub const DEFAULT_MAX_CHILDREN: usize = 1024;

/// Default path length limit in bytes.
pub const DEFAULT_MAX_PATH: usize = 256;

/// Default name length limit in bytes.
pub const DEFAULT_MAX_NAME: usize = 255;

/// Capacity limits and backing location for one filesystem instance.
///
/// Limits are policy: exceeding one is a reported error, never a truncation.
#[derive(Debug, Clone)]
pub struct FsConfig {
    /// Directory holding one flat backing file per regular inode.
    pub backing_root: PathBuf,
    /// Maximum inode ids issued over the instance lifetime.
    pub max_inodes: usize,
    /// Maximum entries in one directory.
    pub max_children: usize,
    /// Maximum path length in bytes.
    pub max_path: usize,
    /// Maximum name length in bytes.
    pub max_name: usize,
}

impl FsConfig {
    /// Configuration with default limits for the given backing root.
    pub fn new(backing_root: impl Into<PathBuf>) -> Self {
        Self {
            backing_root: backing_root.into(),
            max_inodes: DEFAULT_MAX_INODES,
            max_children: DEFAULT_MAX_CHILDREN,
            max_path: DEFAULT_MAX_PATH,
            max_name: DEFAULT_MAX_NAME,
        }
    }

    /// Override the inode table capacity.
    pub fn with_max_inodes(mut self, max: usize) -> Self {
        self.max_inodes = max;
        self
    }

    /// Override the per-directory child capacity.
    pub fn with_max_children(mut self, max: usize) -> Self {
        self.max_children = max;
        self
    }

    /// Override the path length limit.
    pub fn with_max_path(mut self, max: usize) -> Self {
        self.max_path = max;
        self
    }

    /// Override the name length limit.
    pub fn with_max_name(mut self, max: usize) -> Self {
        self.max_name = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = FsConfig::new("/tmp/backing");
        assert_eq!(cfg.max_inodes, 4096);
        assert_eq!(cfg.max_children, 1024);
        assert_eq!(cfg.max_path, 256);
        assert_eq!(cfg.max_name, 255);
        assert_eq!(cfg.backing_root, PathBuf::from("/tmp/backing"));
    }

    #[test]
    fn test_builder_overrides() {
        let cfg = FsConfig::new("/tmp/backing")
            .with_max_inodes(8)
            .with_max_children(2)
            .with_max_path(64)
            .with_max_name(16);
        assert_eq!(cfg.max_inodes, 8);
        assert_eq!(cfg.max_children, 2);
        assert_eq!(cfg.max_path, 64);
        assert_eq!(cfg.max_name, 16);
    }
}
